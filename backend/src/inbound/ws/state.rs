//! Shared WebSocket adapter state.

use crate::domain::TripFeed;

use super::origins::AllowedOrigins;

/// Dependency bundle for the trip feed endpoint.
#[derive(Clone)]
pub struct WsState {
    pub feed: TripFeed,
    pub origins: AllowedOrigins,
}

impl WsState {
    /// Construct state from a feed factory and the origin allow-list.
    pub fn new(feed: TripFeed, origins: AllowedOrigins) -> Self {
        Self { feed, origins }
    }
}
