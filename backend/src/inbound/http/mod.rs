//! HTTP inbound adapter: probes and cookie-session helpers.

pub mod health;
pub mod session;
#[cfg(test)]
pub mod test_utils;
