//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};

use tripboard::inbound::ws::origins::AllowedOrigins;
use tripboard::outbound::memory::InMemoryTripStore;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) origins: AllowedOrigins,
    pub(crate) store: InMemoryTripStore,
}

impl ServerConfig {
    /// Construct a server configuration with an empty store.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        origins: AllowedOrigins,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            origins,
            store: InMemoryTripStore::default(),
        }
    }

    /// Serve trips from `store`.
    #[must_use]
    pub fn with_store(mut self, store: InMemoryTripStore) -> Self {
        self.store = store;
        self
    }
}
