//! Port through which a live trip feed reports to its consumer.

use crate::domain::{DayWithSlots, Error, Trip};

/// Consumer callbacks for one live trip feed.
///
/// Calls arrive from the feed's session task, one at a time and never after
/// the feed has been stopped. Implementations should return quickly; any
/// slow work belongs on the consumer's side of a channel.
#[cfg_attr(test, mockall::automock)]
pub trait TripViewSink: Send + Sync {
    /// Latest trip document, or `None` once it has vanished.
    fn set_trip(&self, trip: Option<Trip>);

    /// Latest nested itinerary view.
    fn set_days(&self, days: Vec<DayWithSlots>);

    /// A user-facing failure.
    fn set_error(&self, error: &Error);

    /// Whether the feed is still waiting for its first complete view.
    fn set_loading(&self, loading: bool);
}
