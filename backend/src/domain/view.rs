//! Nested itinerary view handed to consumers.
//!
//! [`rebuild_view`] is the only place the four cached collections are joined.
//! It is a pure function of its inputs: the same documents in any input order
//! produce the same tree.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{Day, DayId, Proposal, Slot, SlotId};

/// A slot with its proposals attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotWithProposals {
    #[serde(flatten)]
    pub slot: Slot,
    /// Proposals for this slot, ordered by identifier.
    pub proposals: Vec<Proposal>,
    /// The proposal named by the slot's lock, when it is known.
    ///
    /// `None` on a locked slot means the lock is unresolved: the referenced
    /// proposal is neither in the live set nor recovered by repair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_proposal: Option<Proposal>,
}

impl SlotWithProposals {
    /// Return `true` when the slot claims a lock the view cannot resolve.
    #[must_use]
    pub fn has_unresolved_lock(&self) -> bool {
        self.slot.locked_proposal_id().is_some() && self.locked_proposal.is_none()
    }
}

/// A day with its ordered slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayWithSlots {
    #[serde(flatten)]
    pub day: Day,
    pub slots: Vec<SlotWithProposals>,
}

/// Join cached days, slots and proposals into the sorted nested tree.
///
/// - days by `day_number`, ties by id;
/// - slots of a day by `sort_order`, ties by id;
/// - proposals of a slot by id.
///
/// Slots whose day is absent and proposals whose slot is absent are left out.
/// Input iterators may repeat an identifier; the last occurrence wins.
pub fn rebuild_view<'a, D, S, P>(days: D, slots: S, proposals: P) -> Vec<DayWithSlots>
where
    D: IntoIterator<Item = &'a Day>,
    S: IntoIterator<Item = &'a Slot>,
    P: IntoIterator<Item = &'a Proposal>,
{
    let mut by_slot: HashMap<&SlotId, BTreeMap<&str, &Proposal>> = HashMap::new();
    for proposal in proposals {
        by_slot
            .entry(&proposal.slot_id)
            .or_default()
            .insert(proposal.id.as_str(), proposal);
    }

    let mut by_day: HashMap<&DayId, BTreeMap<&str, &Slot>> = HashMap::new();
    for slot in slots {
        by_day
            .entry(&slot.day_id)
            .or_default()
            .insert(slot.id.as_str(), slot);
    }

    let mut ordered_days: Vec<&Day> = days
        .into_iter()
        .map(|day| (day.id.as_str(), day))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect();
    ordered_days.sort_by(|a, b| a.itinerary_order(b));

    ordered_days
        .into_iter()
        .map(|day| {
            let mut day_slots: Vec<&Slot> = by_day
                .get(&day.id)
                .map(|slots| slots.values().copied().collect())
                .unwrap_or_default();
            day_slots.sort_by(|a, b| a.day_order(b));

            let slots = day_slots
                .into_iter()
                .map(|slot| attach_proposals(slot, by_slot.get(&slot.id)))
                .collect();
            DayWithSlots {
                day: day.clone(),
                slots,
            }
        })
        .collect()
}

fn attach_proposals(slot: &Slot, proposals: Option<&BTreeMap<&str, &Proposal>>) -> SlotWithProposals {
    let proposals: Vec<Proposal> = proposals
        .map(|map| map.values().map(|p| (*p).clone()).collect())
        .unwrap_or_default();
    let locked_proposal = slot
        .locked_proposal_id()
        .and_then(|id| proposals.iter().find(|p| &p.id == id))
        .cloned();
    SlotWithProposals {
        slot: slot.clone(),
        proposals,
        locked_proposal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProposalId, SlotStatus, TripId, UserId};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn day(id: &str, number: u32) -> Day {
        Day {
            id: DayId::new(id).expect("valid id"),
            trip_id: TripId::new("t1").expect("valid id"),
            day_number: number,
            city: "Lisbon".to_owned(),
            date: None,
            title: None,
            image_url: None,
        }
    }

    fn slot(id: &str, day: &str, sort_order: i64) -> Slot {
        Slot {
            id: SlotId::new(id).expect("valid id"),
            day_id: DayId::new(day).expect("valid id"),
            time_label: "Morning".to_owned(),
            category: "activity".to_owned(),
            sort_order,
            status: SlotStatus::Proposed,
            locked_proposal_id: None,
        }
    }

    fn proposal(id: &str, slot: &str) -> Proposal {
        Proposal {
            id: ProposalId::new(id).expect("valid id"),
            slot_id: SlotId::new(slot).expect("valid id"),
            trip_id: Some(TripId::new("t1").expect("valid id")),
            title: format!("Idea {id}"),
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

    struct Snapshot {
        days: Vec<Day>,
        slots: Vec<Slot>,
        proposals: Vec<Proposal>,
    }

    #[fixture]
    fn snapshot() -> Snapshot {
        Snapshot {
            days: vec![day("d-b", 2), day("d-a", 1), day("d-c", 2)],
            slots: vec![
                slot("s3", "d-a", 5),
                slot("s1", "d-a", 1),
                slot("s2", "d-a", 1),
                slot("s4", "d-b", 0),
                slot("s-orphan", "d-missing", 0),
            ],
            proposals: vec![
                proposal("p2", "s1"),
                proposal("p1", "s1"),
                proposal("p3", "s4"),
                proposal("p-orphan", "s-missing"),
            ],
        }
    }

    fn shape(view: &[DayWithSlots]) -> Vec<(String, Vec<(String, Vec<String>)>)> {
        view.iter()
            .map(|d| {
                (
                    d.day.id.to_string(),
                    d.slots
                        .iter()
                        .map(|s| {
                            (
                                s.slot.id.to_string(),
                                s.proposals.iter().map(|p| p.id.to_string()).collect(),
                            )
                        })
                        .collect(),
                )
            })
            .collect()
    }

    #[rstest]
    fn orders_days_slots_and_proposals(snapshot: Snapshot) {
        let view = rebuild_view(&snapshot.days, &snapshot.slots, &snapshot.proposals);
        let expected = vec![
            (
                "d-a".to_owned(),
                vec![
                    ("s1".to_owned(), vec!["p1".to_owned(), "p2".to_owned()]),
                    ("s2".to_owned(), vec![]),
                    ("s3".to_owned(), vec![]),
                ],
            ),
            (
                "d-b".to_owned(),
                vec![("s4".to_owned(), vec!["p3".to_owned()])],
            ),
            ("d-c".to_owned(), vec![]),
        ];
        assert_eq!(shape(&view), expected);
    }

    #[rstest]
    #[case::reversed(|v: &mut Vec<usize>| v.reverse())]
    #[case::rotated(|v: &mut Vec<usize>| v.rotate_left(2))]
    #[case::interleaved(|v: &mut Vec<usize>| v.sort_by_key(|i| (*i % 2, *i)))]
    fn input_order_does_not_change_the_view(
        snapshot: Snapshot,
        #[case] permute: fn(&mut Vec<usize>),
    ) {
        let baseline = rebuild_view(&snapshot.days, &snapshot.slots, &snapshot.proposals);

        let reorder = |len: usize| {
            let mut idx: Vec<usize> = (0..len).collect();
            permute(&mut idx);
            idx
        };
        let days: Vec<Day> = reorder(snapshot.days.len())
            .into_iter()
            .map(|i| snapshot.days[i].clone())
            .collect();
        let slots: Vec<Slot> = reorder(snapshot.slots.len())
            .into_iter()
            .map(|i| snapshot.slots[i].clone())
            .collect();
        let proposals: Vec<Proposal> = reorder(snapshot.proposals.len())
            .into_iter()
            .map(|i| snapshot.proposals[i].clone())
            .collect();

        assert_eq!(rebuild_view(&days, &slots, &proposals), baseline);
    }

    #[rstest]
    fn resolves_lock_against_cached_proposals() {
        let mut locked = slot("s1", "d-a", 0);
        locked.status = SlotStatus::Locked;
        locked.locked_proposal_id = Some(ProposalId::new("p2").expect("valid id"));
        let days = [day("d-a", 1)];

        let resolved = rebuild_view(&days, [&locked], &[proposal("p2", "s1")]);
        let entry = &resolved[0].slots[0];
        assert_eq!(
            entry.locked_proposal.as_ref().map(|p| p.id.as_str()),
            Some("p2")
        );
        assert!(!entry.has_unresolved_lock());

        let unresolved = rebuild_view(&days, [&locked], &[proposal("p1", "s1")]);
        assert!(unresolved[0].slots[0].has_unresolved_lock());
    }

    #[rstest]
    fn empty_inputs_give_empty_view() {
        let view = rebuild_view(&[] as &[Day], &[] as &[Slot], &[] as &[Proposal]);
        assert!(view.is_empty());
    }

    #[rstest]
    fn serialises_flattened_camel_case() {
        let days = [day("d-a", 1)];
        let slots = [slot("s1", "d-a", 0)];
        let view = rebuild_view(&days, &slots, &[] as &[Proposal]);
        let value = serde_json::to_value(&view).expect("serialisable view");
        assert_eq!(
            value,
            json!([{
                "id": "d-a",
                "tripId": "t1",
                "dayNumber": 1,
                "city": "Lisbon",
                "slots": [{
                    "id": "s1",
                    "dayId": "d-a",
                    "timeLabel": "Morning",
                    "category": "activity",
                    "sortOrder": 0,
                    "status": "proposed",
                    "proposals": [],
                }],
            }])
        );
    }
}
