//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod trip_store;
mod trip_view_sink;

#[cfg(test)]
pub use trip_store::MockTripStore;
pub use trip_store::{LiveQuery, TripStore, TripStoreError};
#[cfg(test)]
pub use trip_view_sink::MockTripViewSink;
pub use trip_view_sink::TripViewSink;
