//! Live trip aggregation.
//!
//! A [`TripFeed`] turns the trip, day, slot and proposal live queries of a
//! [`TripStore`] into one nested, sorted view that is pushed to a
//! [`TripViewSink`] whenever any of them changes.
//!
//! Each started feed runs as a single session task that owns every cache and
//! is the only caller of the sink. Live queries forward their items into the
//! session's event queue; the session folds them into its caches and
//! re-derives the view. [`TripFeedHandle`] is the disposer: calling
//! [`TripFeedHandle::stop`] or dropping the handle cancels the session and
//! releases every subscription it opened.
//!
//! ```text
//! start ─► resolve slug ─► watch trip ─────────────────────────► set_trip
//!                       └► watch days ─► slot chunks (≤ 10 ids) ─┐
//!                                                   proposals ◄──┤ slot ids changed
//!                                                                ▼
//!                                              rebuild_view ─► set_days ─► repair
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::ports::{TripStore, TripViewSink};
use super::{ErrorCode, UserId};

mod events;
mod proposals;
mod repair;
pub mod resolver;
mod session;
mod slot_aggregator;
mod subscription;

pub use slot_aggregator::SlotFingerprint;

use events::SessionEvent;
use session::SessionLaunch;

/// Lifecycle of a single feed.
///
/// `Idle → Resolving → Active`, ending in `Failed` or `Cancelled`. Terminal
/// states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Created, session task not yet running.
    Idle,
    /// Looking the slug up.
    Resolving,
    /// Live queries are open and the view is maintained.
    Active,
    /// Resolution failed; the sink received the error.
    Failed(ErrorCode),
    /// Stopped by the consumer.
    Cancelled,
}

impl FeedState {
    /// Return `true` for `Failed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed(_) | Self::Cancelled)
    }
}

/// Publishes state transitions, refusing to leave a terminal state.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<watch::Sender<FeedState>>);

impl StateCell {
    fn new() -> (Self, watch::Receiver<FeedState>) {
        let (tx, rx) = watch::channel(FeedState::Idle);
        (Self(Arc::new(tx)), rx)
    }

    pub(crate) fn advance(&self, next: FeedState) {
        self.0.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Entry point for live trip views backed by one store.
#[derive(Clone)]
pub struct TripFeed {
    store: Arc<dyn TripStore>,
}

impl TripFeed {
    /// Create a feed factory over `store`.
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    /// Start following the trip named by `slug` on behalf of `caller`.
    ///
    /// Returns immediately; resolution and every later update happen on a
    /// spawned task that reports through `sink`. A missing `caller` fails the
    /// feed with an authorization error before anything is subscribed.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn start(
        &self,
        slug: &str,
        caller: Option<UserId>,
        sink: Arc<dyn TripViewSink>,
    ) -> TripFeedHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = StateCell::new();

        let launch = SessionLaunch {
            store: Arc::clone(&self.store),
            slug: slug.to_owned(),
            caller,
            sink,
            cancelled: Arc::clone(&cancelled),
            events: events_tx.clone(),
            inbox: events_rx,
            state,
        };
        let task = tokio::spawn(session::run(launch));

        TripFeedHandle {
            cancelled,
            events: events_tx,
            state: state_rx,
            task: Some(task),
        }
    }
}

/// Disposer for a started feed.
///
/// Dropping the handle stops the feed.
#[derive(Debug)]
pub struct TripFeedHandle {
    cancelled: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<FeedState>,
    task: Option<JoinHandle<()>>,
}

impl TripFeedHandle {
    /// Cancel the feed.
    ///
    /// No sink call starts once this returns. A call the session had already
    /// started may still finish, so a sink may call `stop` from inside one of
    /// its own callbacks. Idempotent, and safe before the slug has been
    /// resolved.
    pub fn stop(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("trip feed stop requested");
        if self.events.send(SessionEvent::Stop).is_err() {
            debug!("trip feed session already finished");
        }
    }

    /// Return `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate` and return it.
    ///
    /// Returns the last known state if the session ends first.
    pub async fn wait_for_state(&self, predicate: impl FnMut(&FeedState) -> bool) -> FeedState {
        let mut rx = self.state.clone();
        let waited = rx.wait_for(predicate).await.map(|state| *state);
        waited.unwrap_or_else(|_| *rx.borrow())
    }

    /// Wait until the session task has released every subscription.
    ///
    /// Completes after [`stop`](Self::stop) or a terminal resolution failure;
    /// waits indefinitely on a feed that is still active.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!(error = %err, "trip feed session task ended abnormally");
            }
        }
    }
}

impl Drop for TripFeedHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
