//! Legacy repair: point reads for locked proposals the live query misses.
//!
//! Proposals written before trip-wide queries existed have no `trip_id`, so
//! the proposal live query never returns them. A slot locked to such a
//! proposal would show an unresolved lock; repair fetches it by id instead.
//! An id that was found or missing is not requested again in the session; a
//! failed read is forgotten so a later publish retries it.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tracing::debug;

use super::events::SessionEvent;
use super::proposals::ProposalCache;
use crate::domain::ports::TripStore;
use crate::domain::{ProposalId, Slot};

/// Lock targets referenced by `slots` that the cache does not hold.
pub(crate) fn orphaned_locks<'a>(
    slots: impl IntoIterator<Item = &'a Slot>,
    cache: &ProposalCache,
) -> BTreeSet<ProposalId> {
    slots
        .into_iter()
        .filter_map(Slot::locked_proposal_id)
        .filter(|id| !cache.contains(id))
        .cloned()
        .collect()
}

/// Per-session repair bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct LegacyRepair {
    requested: BTreeSet<ProposalId>,
    in_flight: Vec<AbortHandle>,
}

impl LegacyRepair {
    /// Issue point reads for orphaned locks not requested before.
    ///
    /// Results come back as one [`SessionEvent::Repaired`]. Returns the
    /// number of reads issued.
    pub(crate) fn schedule<'a>(
        &mut self,
        slots: impl IntoIterator<Item = &'a Slot>,
        cache: &ProposalCache,
        store: &Arc<dyn TripStore>,
        events: &UnboundedSender<SessionEvent>,
    ) -> usize {
        let missing: Vec<ProposalId> = orphaned_locks(slots, cache)
            .into_iter()
            .filter(|id| self.requested.insert(id.clone()))
            .collect();
        if missing.is_empty() {
            return 0;
        }

        let count = missing.len();
        debug!(count, "fetching orphaned locked proposals");
        let store = Arc::clone(store);
        let events = events.clone();
        let task = tokio::spawn(async move {
            let reads = missing.iter().map(|id| store.get_proposal(id));
            let results = join_all(reads).await;
            let mut found = Vec::new();
            let mut failed = Vec::new();
            for (id, result) in missing.into_iter().zip(results) {
                match result {
                    Ok(Some(proposal)) => found.push(proposal),
                    Ok(None) => debug!(proposal_id = %id, "orphaned lock target not found"),
                    Err(err) => {
                        debug!(proposal_id = %id, error = %err, "orphaned lock read failed");
                        failed.push(id);
                    }
                }
            }
            if found.is_empty() && failed.is_empty() {
                return;
            }
            if events.send(SessionEvent::Repaired { found, failed }).is_err() {
                debug!("session ended before repaired proposals arrived");
            }
        });

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(task.abort_handle());
        count
    }

    /// Allow `ids` to be requested again.
    pub(crate) fn forget<'a>(&mut self, ids: impl IntoIterator<Item = &'a ProposalId>) {
        for id in ids {
            self.requested.remove(id);
        }
    }

    /// Abort reads still in flight.
    pub(crate) fn cancel(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{MockTripStore, TripStoreError};
    use crate::domain::{DayId, Proposal, SlotId, SlotStatus, UserId};
    use rstest::rstest;
    use tokio::sync::mpsc;

    fn locked_slot(id: &str, proposal: &str) -> Slot {
        Slot {
            id: SlotId::new(id).expect("valid id"),
            day_id: DayId::new("d1").expect("valid id"),
            time_label: "Dinner".to_owned(),
            category: "food".to_owned(),
            sort_order: 0,
            status: SlotStatus::Locked,
            locked_proposal_id: Some(ProposalId::new(proposal).expect("valid id")),
        }
    }

    fn proposal(id: &str) -> Proposal {
        Proposal {
            id: ProposalId::new(id).expect("valid id"),
            slot_id: SlotId::new("s1").expect("valid id"),
            trip_id: None,
            title: "Fado night".to_owned(),
            note: None,
            link: None,
            proposer_id: UserId::new("u1").expect("valid id"),
            proposer_name: None,
            votes: Default::default(),
            schedule: None,
            booking: None,
            created_at: None,
        }
    }

    #[rstest]
    fn orphaned_locks_skip_cached_and_unlocked() {
        let mut cache = ProposalCache::default();
        cache.replace_live(vec![proposal("p1")]);
        let mut degraded = locked_slot("s3", "p3");
        degraded.status = SlotStatus::Proposed;
        let slots = [locked_slot("s1", "p1"), locked_slot("s2", "p2"), degraded];

        let ids: Vec<String> = orphaned_locks(&slots, &cache)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, ["p2"]);
    }

    #[rstest]
    #[tokio::test]
    async fn each_orphan_is_read_once_per_session() {
        let mut store = MockTripStore::new();
        store
            .expect_get_proposal()
            .withf(|id| id.as_str() == "p9")
            .times(1)
            .returning(|_| Ok(Some(proposal("p9"))));
        let store: Arc<dyn TripStore> = Arc::new(store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cache = ProposalCache::default();
        let slots = [locked_slot("s1", "p9")];
        let mut repair = LegacyRepair::default();

        assert_eq!(repair.schedule(&slots, &cache, &store, &tx), 1);
        assert_eq!(repair.schedule(&slots, &cache, &store, &tx), 0);

        match rx.recv().await {
            Some(SessionEvent::Repaired { found, failed }) => {
                let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
                assert_eq!(ids, ["p9"]);
                assert!(failed.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn misses_are_dropped_and_failures_reported() {
        let mut store = MockTripStore::new();
        store.expect_get_proposal().returning(|id| {
            if id.as_str() == "p1" {
                Ok(None)
            } else {
                Err(TripStoreError::connection("offline"))
            }
        });
        let store: Arc<dyn TripStore> = Arc::new(store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slots = [locked_slot("s1", "p1"), locked_slot("s2", "p2")];
        let cache = ProposalCache::default();
        let mut repair = LegacyRepair::default();

        assert_eq!(repair.schedule(&slots, &cache, &store, &tx), 2);
        let failed = match rx.recv().await {
            Some(SessionEvent::Repaired { found, failed }) => {
                assert!(found.is_empty());
                failed
            }
            other => panic!("unexpected event: {other:?}"),
        };
        let ids: Vec<&str> = failed.iter().map(ProposalId::as_str).collect();
        assert_eq!(ids, ["p2"]);

        repair.forget(&failed);
        assert_eq!(repair.schedule(&slots, &cache, &store, &tx), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn batch_of_misses_sends_nothing() {
        let mut store = MockTripStore::new();
        store.expect_get_proposal().returning(|_| Ok(None));
        let store: Arc<dyn TripStore> = Arc::new(store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slots = [locked_slot("s1", "p1")];
        let mut repair = LegacyRepair::default();

        assert_eq!(
            repair.schedule(&slots, &ProposalCache::default(), &store, &tx),
            1
        );
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
