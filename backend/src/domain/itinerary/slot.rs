//! Slot documents and their lock state machine.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{DayId, ProposalId, SlotId};

/// Three-state slot status as stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// No proposals yet.
    #[default]
    Open,
    /// At least one proposal, none chosen.
    Proposed,
    /// One proposal chosen.
    Locked,
}

/// Normalised view of a slot's status and lock reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState<'a> {
    Open,
    Proposed,
    Locked(&'a ProposalId),
}

/// A time slot within a day.
///
/// ## Invariants (as written by well-behaved clients)
/// - `status == Locked` iff `locked_proposal_id` is set.
/// - `status == Open` implies no proposal references the slot.
///
/// Documents that break the first invariant are normalised by
/// [`Slot::lock_state`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub day_id: DayId,
    pub time_label: String,
    pub category: String,
    pub sort_order: i64,
    #[serde(default)]
    pub status: SlotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_proposal_id: Option<ProposalId>,
}

impl Slot {
    /// Interpret status and lock reference together.
    ///
    /// A `locked` status without a proposal id degrades to `Proposed`; a lock
    /// id on a slot that is not `locked` is ignored.
    #[must_use]
    pub fn lock_state(&self) -> LockState<'_> {
        match (self.status, self.locked_proposal_id.as_ref()) {
            (SlotStatus::Locked, Some(id)) => LockState::Locked(id),
            (SlotStatus::Locked | SlotStatus::Proposed, _) => LockState::Proposed,
            (SlotStatus::Open, _) => LockState::Open,
        }
    }

    /// Proposal this slot is locked to, if the lock is well formed.
    #[must_use]
    pub fn locked_proposal_id(&self) -> Option<&ProposalId> {
        match self.lock_state() {
            LockState::Locked(id) => Some(id),
            LockState::Open | LockState::Proposed => None,
        }
    }

    /// Order within a day: by `sort_order`, ties broken by identifier.
    #[must_use]
    pub fn day_order(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn slot() -> Slot {
        Slot {
            id: SlotId::new("s1").expect("valid id"),
            day_id: DayId::new("d1").expect("valid id"),
            time_label: "Morning".to_owned(),
            category: "activity".to_owned(),
            sort_order: 0,
            status: SlotStatus::Open,
            locked_proposal_id: None,
        }
    }

    fn proposal_id() -> ProposalId {
        ProposalId::new("p1").expect("valid id")
    }

    #[rstest]
    fn locked_slot_reports_its_proposal(mut slot: Slot) {
        slot.status = SlotStatus::Locked;
        slot.locked_proposal_id = Some(proposal_id());
        assert_eq!(slot.locked_proposal_id(), Some(&proposal_id()));
    }

    #[rstest]
    fn locked_without_id_degrades_to_proposed(mut slot: Slot) {
        slot.status = SlotStatus::Locked;
        assert_eq!(slot.lock_state(), LockState::Proposed);
        assert!(slot.locked_proposal_id().is_none());
    }

    #[rstest]
    #[case(SlotStatus::Open, LockState::Open)]
    #[case(SlotStatus::Proposed, LockState::Proposed)]
    fn stray_lock_ids_are_ignored(
        mut slot: Slot,
        #[case] status: SlotStatus,
        #[case] expected: LockState<'static>,
    ) {
        slot.status = status;
        slot.locked_proposal_id = Some(proposal_id());
        assert_eq!(slot.lock_state(), expected);
    }

    #[rstest]
    fn missing_status_defaults_to_open() {
        let slot: Slot = serde_json::from_value(json!({
            "id": "s1",
            "dayId": "d1",
            "timeLabel": "Lunch",
            "category": "food",
            "sortOrder": 2,
        }))
        .expect("valid slot");
        assert_eq!(slot.status, SlotStatus::Open);
    }
}
