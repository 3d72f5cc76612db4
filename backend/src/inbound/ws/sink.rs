//! View sink that queues frames for a socket.

use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::ports::TripViewSink;
use crate::domain::{DayWithSlots, Error, Trip};

use super::messages::FeedMessage;

/// Forwards every sink callback to the connection task as a [`FeedMessage`].
///
/// Sends after the connection has gone are dropped silently; the feed is
/// stopped by the connection task itself.
pub struct ChannelSink {
    frames: mpsc::UnboundedSender<FeedMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver the socket drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FeedMessage>) {
        let (frames, rx) = mpsc::unbounded_channel();
        (Self { frames }, rx)
    }

    fn push(&self, message: FeedMessage) {
        if self.frames.send(message).is_err() {
            trace!("socket gone; frame dropped");
        }
    }
}

impl TripViewSink for ChannelSink {
    fn set_trip(&self, trip: Option<Trip>) {
        self.push(FeedMessage::Trip { trip });
    }

    fn set_days(&self, days: Vec<DayWithSlots>) {
        self.push(FeedMessage::Days { days });
    }

    fn set_error(&self, error: &Error) {
        self.push(FeedMessage::Error {
            error: error.clone(),
        });
    }

    fn set_loading(&self, loading: bool) {
        self.push(FeedMessage::Loading { loading });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_arrive_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.set_loading(true);
        sink.set_days(Vec::new());
        sink.set_loading(false);

        assert!(matches!(rx.try_recv(), Ok(FeedMessage::Loading { loading: true })));
        assert!(matches!(rx.try_recv(), Ok(FeedMessage::Days { ref days }) if days.is_empty()));
        assert!(matches!(rx.try_recv(), Ok(FeedMessage::Loading { loading: false })));
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.set_error(&Error::not_found("gone"));
    }
}
