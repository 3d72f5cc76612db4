//! Subscription and read counters for the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store collections, as named in counters and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Trips,
    Days,
    Slots,
    Proposals,
}

impl Collection {
    const fn index(self) -> usize {
        match self {
            Self::Trips => 0,
            Self::Days => 1,
            Self::Slots => 2,
            Self::Proposals => 3,
        }
    }

    /// Collection name as used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trips => "trips",
            Self::Days => "days",
            Self::Slots => "slots",
            Self::Proposals => "proposals",
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct Counters {
    opened: [AtomicUsize; 4],
    active: [AtomicUsize; 4],
    point_reads: AtomicUsize,
}

impl Counters {
    pub(super) fn open(self: &Arc<Self>, collection: Collection) -> QueryGuard {
        self.opened[collection.index()].fetch_add(1, Ordering::Relaxed);
        self.active[collection.index()].fetch_add(1, Ordering::AcqRel);
        QueryGuard {
            counters: Arc::clone(self),
            collection,
        }
    }

    pub(super) fn record_point_read(&self) {
        self.point_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn opened(&self, collection: Collection) -> usize {
        self.opened[collection.index()].load(Ordering::Relaxed)
    }

    pub(super) fn active(&self, collection: Collection) -> usize {
        self.active[collection.index()].load(Ordering::Acquire)
    }

    pub(super) fn point_reads(&self) -> usize {
        self.point_reads.load(Ordering::Relaxed)
    }
}

/// Marks one live query as active until dropped.
pub(super) struct QueryGuard {
    counters: Arc<Counters>,
    collection: Collection,
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.counters.active[self.collection.index()].fetch_sub(1, Ordering::AcqRel);
    }
}
