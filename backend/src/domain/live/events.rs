//! Events delivered to a feed session.

use crate::domain::ports::TripStoreError;
use crate::domain::{Day, Proposal, ProposalId, Slot, Trip};

/// Work item for the session task.
///
/// Slot and proposal items carry the generation of the aggregator or watcher
/// that produced them, so items queued before a teardown can be recognised
/// and dropped.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Trip(Result<Option<Trip>, TripStoreError>),
    Days(Result<Vec<Day>, TripStoreError>),
    Slots {
        generation: u64,
        chunk: usize,
        result: Result<Vec<Slot>, TripStoreError>,
    },
    Proposals {
        generation: u64,
        result: Result<Vec<Proposal>, TripStoreError>,
    },
    /// Outcome of one repair batch. Misses are in neither list.
    Repaired {
        found: Vec<Proposal>,
        failed: Vec<ProposalId>,
    },
    Stop,
}
