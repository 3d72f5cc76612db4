//! Forwarding of live query items into the session queue.

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::events::SessionEvent;
use crate::domain::ports::{LiveQuery, TripStoreError};

/// One open live query.
///
/// Owns the task that drains the query stream. Dropping the subscription
/// aborts that task, which drops the stream and closes the query.
#[derive(Debug)]
pub(crate) struct Subscription {
    label: &'static str,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Spawn a task that tags every item of `query` with `wrap` and pushes it
    /// into `events`.
    pub(crate) fn forward<T, F>(
        label: &'static str,
        mut query: LiveQuery<T>,
        events: UnboundedSender<SessionEvent>,
        wrap: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Fn(Result<T, TripStoreError>) -> SessionEvent + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(item) = query.next().await {
                if events.send(wrap(item)).is_err() {
                    return;
                }
            }
            debug!(query = label, "live query ended");
        });
        Self { label, task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(query = self.label, "unsubscribing live query");
        self.task.abort();
    }
}
