//! Inbound adapters (HTTP, WebSocket) that translate external requests into
//! trip feed calls while keeping framework details at the edge.
//!
//! Probes and session helpers live under [`http`]; the live trip stream is
//! served from [`ws`].

pub mod http;
pub mod ws;
