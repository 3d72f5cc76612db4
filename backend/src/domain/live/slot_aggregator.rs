//! Chunked slot subscriptions and their merged result.
//!
//! The store caps membership filters at ten values, so a trip with more days
//! than that needs several slot queries. The aggregator opens one per
//! [`DayIdChunk`], keeps each chunk's latest result set in its own slice, and
//! exposes the union. [`SlotFingerprint`] summarises the merged slot-id set so
//! the session can tell whether the proposal query needs reopening.

use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::events::SessionEvent;
use super::subscription::Subscription;
use crate::domain::membership::{DayIdChunk, partition_day_ids};
use crate::domain::ports::TripStore;
use crate::domain::{DayId, Slot, SlotId};

/// Digest of a sorted slot-id set.
///
/// Two merges with the same slot identifiers produce the same fingerprint
/// whatever their status, order or chunk layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotFingerprint(String);

impl SlotFingerprint {
    /// Fingerprint the given identifiers. Duplicates count once.
    pub fn of<'a>(ids: impl IntoIterator<Item = &'a SlotId>) -> Self {
        let mut ids: Vec<&str> = ids.into_iter().map(SlotId::as_str).collect();
        ids.sort_unstable();
        ids.dedup();
        let digest = Sha256::digest(ids.join("\n").as_bytes());
        Self(hex::encode(digest))
    }

    /// Hex-encoded SHA-256 digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Fan-out of slot queries for one ordered day-id list.
pub(crate) struct SlotAggregator {
    generation: u64,
    chunks: Vec<DayIdChunk>,
    slices: Vec<Option<Vec<Slot>>>,
    subscriptions: Vec<Subscription>,
}

impl SlotAggregator {
    /// Partition `day_ids` and open one slot query per chunk.
    pub(crate) fn open(
        generation: u64,
        day_ids: &[DayId],
        store: &Arc<dyn TripStore>,
        events: &UnboundedSender<SessionEvent>,
    ) -> Self {
        let chunks = partition_day_ids(day_ids);
        let subscriptions = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                Subscription::forward(
                    "slots",
                    store.watch_slots(chunk),
                    events.clone(),
                    move |result| SessionEvent::Slots {
                        generation,
                        chunk: index,
                        result,
                    },
                )
            })
            .collect();
        debug!(
            generation,
            days = day_ids.len(),
            chunks = chunks.len(),
            "slot aggregator opened"
        );
        Self {
            generation,
            slices: vec![None; chunks.len()],
            chunks,
            subscriptions,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of chunk queries this aggregator opened.
    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Replace the slice of chunk `index`.
    ///
    /// Slots outside the chunk's days are ignored. Returns `false` for an
    /// unknown chunk index.
    pub(crate) fn apply(&mut self, index: usize, slots: Vec<Slot>) -> bool {
        let (Some(chunk), Some(slice)) = (self.chunks.get(index), self.slices.get_mut(index))
        else {
            return false;
        };
        let slots = slots
            .into_iter()
            .filter(|slot| chunk.contains(&slot.day_id))
            .collect();
        *slice = Some(slots);
        true
    }

    /// Record a failed emission of chunk `index`.
    ///
    /// The chunk keeps its last slice, or counts as reporting no slots if it
    /// never emitted, so one failing chunk cannot hold the others back.
    /// Returns `true` when this changed the chunk's slice.
    pub(crate) fn mark_failed(&mut self, index: usize) -> bool {
        let Some(slice) = self.slices.get_mut(index) else {
            return false;
        };
        if slice.is_some() {
            return false;
        }
        *slice = Some(Vec::new());
        true
    }

    /// Return `true` once every chunk has reported at least once.
    pub(crate) fn is_settled(&self) -> bool {
        self.slices.iter().all(Option::is_some)
    }

    /// Union of all slices keyed by slot id.
    pub(crate) fn merged(&self) -> BTreeMap<&SlotId, &Slot> {
        self.slices
            .iter()
            .flatten()
            .flatten()
            .map(|slot| (&slot.id, slot))
            .collect()
    }

    pub(crate) fn fingerprint(&self) -> SlotFingerprint {
        SlotFingerprint::of(self.merged().into_keys())
    }

    /// Close every chunk query and drop the slices.
    pub(crate) fn teardown(mut self) {
        debug!(
            generation = self.generation,
            chunks = self.subscriptions.len(),
            "slot aggregator torn down"
        );
        self.subscriptions.clear();
        self.slices.clear();
    }
}
