//! In-memory live document store.
//!
//! Holds the four trip board collections behind a `tokio::sync::watch`
//! channel. Every write publishes a new version; every live query re-runs its
//! filter on each version and emits only when its own result set changed, so
//! consumers see the same "complete result set per change" behaviour as a
//! hosted document store. Write helpers enforce the slot lifecycle rules
//! clients of such a store would otherwise have to get right themselves.

mod counters;
mod dataset;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::membership::DayIdChunk;
use crate::domain::ports::{LiveQuery, TripStore, TripStoreError};
use crate::domain::{
    Day, DayId, Proposal, ProposalId, Slot, SlotId, SlotStatus, Trip, TripId, TripRecord,
    TripSlug, UserId,
};

pub use counters::Collection;
pub use dataset::{DatasetError, StoreDataset, load_dataset, save_dataset};

use counters::Counters;

/// Errors raised by the write helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("unknown trip {0}")]
    UnknownTrip(TripId),
    #[error("unknown day {0}")]
    UnknownDay(DayId),
    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),
    #[error("unknown proposal {0}")]
    UnknownProposal(ProposalId),
    #[error("proposal {proposal} does not belong to slot {slot}")]
    ForeignProposal { proposal: ProposalId, slot: SlotId },
    #[error("slug {0} is already used by another trip")]
    DuplicateSlug(TripSlug),
}

#[derive(Debug, Clone, Default)]
struct Collections {
    trips: BTreeMap<TripId, Trip>,
    days: BTreeMap<DayId, Day>,
    slots: BTreeMap<SlotId, Slot>,
    proposals: BTreeMap<ProposalId, Proposal>,
}

impl Collections {
    fn proposals_for_slot<'a>(&'a self, slot: &'a SlotId) -> impl Iterator<Item = &'a Proposal> {
        self.proposals.values().filter(move |p| &p.slot_id == slot)
    }

    /// Status a slot falls back to when it holds no lock.
    fn unlocked_status(&self, slot: &SlotId) -> SlotStatus {
        if self.proposals_for_slot(slot).next().is_some() {
            SlotStatus::Proposed
        } else {
            SlotStatus::Open
        }
    }

    fn remove_slot_cascade(&mut self, slot: &SlotId) {
        self.slots.remove(slot);
        self.proposals.retain(|_, p| &p.slot_id != slot);
    }
}

/// Live store over an in-process dataset.
///
/// Cloning shares the dataset.
#[derive(Clone)]
pub struct InMemoryTripStore {
    state: Arc<watch::Sender<Collections>>,
    counters: Arc<Counters>,
}

impl Default for InMemoryTripStore {
    fn default() -> Self {
        Self::from_dataset(StoreDataset::default())
    }
}

impl InMemoryTripStore {
    /// Build a store holding every document of `dataset`.
    ///
    /// Documents are loaded as-is, without lifecycle checks, so legacy or
    /// inconsistent data can be reproduced.
    pub fn from_dataset(dataset: StoreDataset) -> Self {
        let collections = Collections {
            trips: dataset
                .trips
                .into_iter()
                .map(|record| (record.id, record.trip))
                .collect(),
            days: dataset.days.into_iter().map(|d| (d.id.clone(), d)).collect(),
            slots: dataset.slots.into_iter().map(|s| (s.id.clone(), s)).collect(),
            proposals: dataset
                .proposals
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        };
        Self {
            state: Arc::new(watch::channel(collections).0),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Copy every document out as a dataset.
    #[must_use]
    pub fn snapshot(&self) -> StoreDataset {
        let collections = self.state.borrow();
        StoreDataset {
            trips: collections
                .trips
                .iter()
                .map(|(id, trip)| TripRecord {
                    id: id.clone(),
                    trip: trip.clone(),
                })
                .collect(),
            days: collections.days.values().cloned().collect(),
            slots: collections.slots.values().cloned().collect(),
            proposals: collections.proposals.values().cloned().collect(),
        }
    }

    /// Live queries ever opened on `collection`.
    #[must_use]
    pub fn queries_opened(&self, collection: Collection) -> usize {
        self.counters.opened(collection)
    }

    /// Live queries on `collection` whose stream is still alive.
    #[must_use]
    pub fn active_queries(&self, collection: Collection) -> usize {
        self.counters.active(collection)
    }

    /// Point reads served so far.
    #[must_use]
    pub fn point_reads(&self) -> usize {
        self.counters.point_reads()
    }

    /// Apply `change` and notify live queries when it reports a change.
    ///
    /// `change` must validate before mutating: an error leaves the dataset
    /// untouched.
    fn write(
        &self,
        change: impl FnOnce(&mut Collections) -> Result<bool, MutationError>,
    ) -> Result<(), MutationError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|collections| match change(collections) {
            Ok(changed) => changed,
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }

    /// Insert or replace a trip. Slugs stay unique.
    pub fn insert_trip(&self, record: TripRecord) -> Result<(), MutationError> {
        self.write(|c| {
            let clash = c
                .trips
                .iter()
                .any(|(id, trip)| id != &record.id && trip.slug == record.trip.slug);
            if clash {
                return Err(MutationError::DuplicateSlug(record.trip.slug));
            }
            c.trips.insert(record.id, record.trip);
            Ok(true)
        })
    }

    /// Insert or replace a day of an existing trip.
    pub fn upsert_day(&self, day: Day) -> Result<(), MutationError> {
        self.write(|c| {
            if !c.trips.contains_key(&day.trip_id) {
                return Err(MutationError::UnknownTrip(day.trip_id));
            }
            c.days.insert(day.id.clone(), day);
            Ok(true)
        })
    }

    /// Delete a day with its slots and their proposals.
    pub fn remove_day(&self, id: &DayId) -> Result<(), MutationError> {
        self.write(|c| {
            if c.days.remove(id).is_none() {
                return Err(MutationError::UnknownDay(id.clone()));
            }
            let slots: Vec<SlotId> = c
                .slots
                .values()
                .filter(|s| &s.day_id == id)
                .map(|s| s.id.clone())
                .collect();
            for slot in &slots {
                c.remove_slot_cascade(slot);
            }
            Ok(true)
        })
    }

    /// Insert or replace a slot of an existing day.
    pub fn upsert_slot(&self, slot: Slot) -> Result<(), MutationError> {
        self.write(|c| {
            if !c.days.contains_key(&slot.day_id) {
                return Err(MutationError::UnknownDay(slot.day_id));
            }
            c.slots.insert(slot.id.clone(), slot);
            Ok(true)
        })
    }

    /// Delete a slot with its proposals.
    pub fn remove_slot(&self, id: &SlotId) -> Result<(), MutationError> {
        self.write(|c| {
            if !c.slots.contains_key(id) {
                return Err(MutationError::UnknownSlot(id.clone()));
            }
            c.remove_slot_cascade(id);
            Ok(true)
        })
    }

    /// Add a proposal; an `open` slot becomes `proposed`.
    pub fn add_proposal(&self, proposal: Proposal) -> Result<(), MutationError> {
        self.write(|c| {
            let Some(slot) = c.slots.get_mut(&proposal.slot_id) else {
                return Err(MutationError::UnknownSlot(proposal.slot_id));
            };
            if slot.status == SlotStatus::Open {
                slot.status = SlotStatus::Proposed;
            }
            c.proposals.insert(proposal.id.clone(), proposal);
            Ok(true)
        })
    }

    /// Lock `slot` to one of its proposals.
    pub fn lock_proposal(&self, slot: &SlotId, proposal: &ProposalId) -> Result<(), MutationError> {
        self.write(|c| {
            let owner = c
                .proposals
                .get(proposal)
                .map(|p| p.slot_id.clone())
                .ok_or_else(|| MutationError::UnknownProposal(proposal.clone()))?;
            if &owner != slot {
                return Err(MutationError::ForeignProposal {
                    proposal: proposal.clone(),
                    slot: slot.clone(),
                });
            }
            let target = c
                .slots
                .get_mut(slot)
                .ok_or_else(|| MutationError::UnknownSlot(slot.clone()))?;
            target.status = SlotStatus::Locked;
            target.locked_proposal_id = Some(proposal.clone());
            Ok(true)
        })
    }

    /// Clear the lock of `slot`, falling back to `proposed` or `open`.
    pub fn unlock_slot(&self, slot: &SlotId) -> Result<(), MutationError> {
        self.write(|c| {
            let status = c.unlocked_status(slot);
            let target = c
                .slots
                .get_mut(slot)
                .ok_or_else(|| MutationError::UnknownSlot(slot.clone()))?;
            target.status = status;
            target.locked_proposal_id = None;
            Ok(true)
        })
    }

    /// Delete a proposal. Deleting the locked proposal clears the lock.
    pub fn delete_proposal(&self, id: &ProposalId) -> Result<(), MutationError> {
        self.write(|c| {
            let Some(removed) = c.proposals.remove(id) else {
                return Err(MutationError::UnknownProposal(id.clone()));
            };
            let status = c.unlocked_status(&removed.slot_id);
            if let Some(slot) = c.slots.get_mut(&removed.slot_id) {
                let was_locked_to_it = slot.locked_proposal_id.as_ref() == Some(id);
                if was_locked_to_it || slot.status != SlotStatus::Locked {
                    slot.status = status;
                    slot.locked_proposal_id = None;
                }
            }
            Ok(true)
        })
    }

    /// Add or remove `user`'s vote. Returns whether the vote is now present.
    pub fn toggle_vote(&self, id: &ProposalId, user: &UserId) -> Result<bool, MutationError> {
        let mut voted = false;
        self.write(|c| {
            let proposal = c
                .proposals
                .get_mut(id)
                .ok_or_else(|| MutationError::UnknownProposal(id.clone()))?;
            voted = proposal.toggle_vote(user.clone());
            Ok(true)
        })?;
        Ok(voted)
    }

    fn live<T, F>(&self, collection: Collection, select: F) -> LiveQuery<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&Collections) -> T + Send + 'static,
    {
        let guard = self.counters.open(collection);
        let rx = self.state.subscribe();
        debug!(collection = collection.as_str(), "live query opened");
        stream::unfold(
            (rx, select, None::<T>, guard),
            |(mut rx, select, last, guard)| async move {
                let mut pending_first = last.is_none();
                loop {
                    if !pending_first && rx.changed().await.is_err() {
                        return None;
                    }
                    pending_first = false;
                    let current = select(&*rx.borrow_and_update());
                    if last.as_ref() != Some(&current) {
                        return Some((Ok(current.clone()), (rx, select, Some(current), guard)));
                    }
                }
            },
        )
        .boxed()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn find_trip_by_slug(
        &self,
        slug: &TripSlug,
        caller: &UserId,
    ) -> Result<Option<TripRecord>, TripStoreError> {
        let collections = self.state.borrow();
        let Some((id, trip)) = collections.trips.iter().find(|(_, t)| &t.slug == slug) else {
            return Ok(None);
        };
        if !trip.grants_access(caller) {
            return Err(TripStoreError::permission_denied(format!(
                "{caller} is not a member of trip {id}"
            )));
        }
        Ok(Some(TripRecord {
            id: id.clone(),
            trip: trip.clone(),
        }))
    }

    async fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, TripStoreError> {
        self.counters.record_point_read();
        Ok(self.state.borrow().proposals.get(id).cloned())
    }

    fn watch_trip(&self, trip_id: &TripId) -> LiveQuery<Option<Trip>> {
        let trip_id = trip_id.clone();
        self.live(Collection::Trips, move |c| c.trips.get(&trip_id).cloned())
    }

    fn watch_days(&self, trip_id: &TripId) -> LiveQuery<Vec<Day>> {
        let trip_id = trip_id.clone();
        self.live(Collection::Days, move |c| {
            c.days
                .values()
                .filter(|d| d.trip_id == trip_id)
                .cloned()
                .collect()
        })
    }

    fn watch_slots(&self, chunk: &DayIdChunk) -> LiveQuery<Vec<Slot>> {
        let chunk = chunk.clone();
        self.live(Collection::Slots, move |c| {
            c.slots
                .values()
                .filter(|s| chunk.contains(&s.day_id))
                .cloned()
                .collect()
        })
    }

    fn watch_proposals(&self, trip_id: &TripId) -> LiveQuery<Vec<Proposal>> {
        let trip_id = trip_id.clone();
        self.live(Collection::Proposals, move |c| {
            c.proposals
                .values()
                .filter(|p| p.trip_id.as_ref() == Some(&trip_id))
                .cloned()
                .collect()
        })
    }
}
