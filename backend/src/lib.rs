//! Live trip aggregation backend for the collaborative trip board.
//!
//! The [`domain`] module turns four independently changing store collections
//! into one nested, sorted itinerary view and keeps it current. Outbound
//! adapters provide the store; inbound adapters stream the view to clients.

pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
