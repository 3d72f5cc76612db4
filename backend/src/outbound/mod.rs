//! Outbound adapters implementing domain ports.
//!
//! - **memory**: an in-process live document store used by the server, the
//!   command-line watcher and the integration tests.
//!
//! Adapters translate between the store's documents and domain types. They
//! contain no aggregation logic.

pub mod memory;
