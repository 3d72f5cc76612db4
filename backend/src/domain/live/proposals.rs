//! Proposal cache: the live result set plus proposals recovered by repair.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Proposal, ProposalId};

/// Proposals known to a feed session.
///
/// Live emissions replace `live` wholesale. Proposals fetched by legacy
/// repair are kept in `repaired` so the next live emission does not evict
/// them; when both hold the same id the live copy wins. A repaired proposal
/// only stays while some slot is still locked to it.
#[derive(Debug, Default)]
pub(crate) struct ProposalCache {
    live: BTreeMap<ProposalId, Proposal>,
    repaired: BTreeMap<ProposalId, Proposal>,
}

impl ProposalCache {
    pub(crate) fn replace_live(&mut self, proposals: Vec<Proposal>) {
        self.live = proposals.into_iter().map(|p| (p.id.clone(), p)).collect();
    }

    /// Merge repaired proposals not already in the live set.
    ///
    /// Returns the number of proposals that changed the cache.
    pub(crate) fn absorb_repaired(&mut self, proposals: Vec<Proposal>) -> usize {
        let mut absorbed = 0;
        for proposal in proposals {
            if self.live.contains_key(&proposal.id) {
                continue;
            }
            if self.repaired.get(&proposal.id) != Some(&proposal) {
                self.repaired.insert(proposal.id.clone(), proposal);
                absorbed += 1;
            }
        }
        absorbed
    }

    /// Drop repaired proposals whose id is not in `locked`.
    ///
    /// Returns the dropped identifiers.
    pub(crate) fn retain_repaired(&mut self, locked: &BTreeSet<ProposalId>) -> Vec<ProposalId> {
        let stale: Vec<ProposalId> = self
            .repaired
            .keys()
            .filter(|id| !locked.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.repaired.remove(id);
        }
        stale
    }

    pub(crate) fn contains(&self, id: &ProposalId) -> bool {
        self.live.contains_key(id) || self.repaired.contains_key(id)
    }

    /// Every cached proposal once, live copies first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.live.values().chain(
            self.repaired
                .values()
                .filter(|p| !self.live.contains_key(&p.id)),
        )
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{SlotId, UserId};
    use rstest::rstest;

    fn proposal(id: &str, title: &str) -> Proposal {
        Proposal {
            id: ProposalId::new(id).expect("valid id"),
            slot_id: SlotId::new("s1").expect("valid id"),
            trip_id: None,
            title: title.to_owned(),
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
    fn repaired_entries_survive_live_replacement() {
        let mut cache = ProposalCache::default();
        assert_eq!(cache.absorb_repaired(vec![proposal("p1", "legacy")]), 1);
        cache.replace_live(vec![proposal("p2", "fresh")]);

        assert!(cache.contains(&ProposalId::new("p1").expect("valid id")));
        assert_eq!(cache.len(), 2);
    }

    #[rstest]
    fn live_copy_wins_over_repaired() {
        let mut cache = ProposalCache::default();
        cache.absorb_repaired(vec![proposal("p1", "legacy")]);
        cache.replace_live(vec![proposal("p1", "migrated")]);

        let titles: Vec<&str> = cache.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["migrated"]);
    }

    #[rstest]
    fn unlocked_repaired_entries_are_dropped() {
        let mut cache = ProposalCache::default();
        cache.absorb_repaired(vec![proposal("p1", "legacy"), proposal("p2", "legacy")]);
        cache.replace_live(vec![proposal("p3", "live")]);
        let locked = BTreeSet::from([ProposalId::new("p2").expect("valid id")]);

        let dropped = cache.retain_repaired(&locked);
        assert_eq!(dropped, [ProposalId::new("p1").expect("valid id")]);
        let ids: Vec<&str> = cache.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p3", "p2"]);
    }

    #[rstest]
    fn absorbing_known_proposals_is_a_no_op() {
        let mut cache = ProposalCache::default();
        cache.replace_live(vec![proposal("p1", "live")]);
        assert_eq!(cache.absorb_repaired(vec![proposal("p1", "stale")]), 0);
        assert_eq!(cache.absorb_repaired(vec![proposal("p2", "legacy")]), 1);
        assert_eq!(cache.absorb_repaired(vec![proposal("p2", "legacy")]), 0);
    }
}
