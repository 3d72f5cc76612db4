//! Proposal documents.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::serde_defaults::null_as_default;
use crate::domain::{ProposalId, SlotId, TripId, UserId};

/// Optional scheduling hints attached to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Optional booking metadata attached to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An activity proposed for a slot.
///
/// `trip_id` is absent on proposals written before trip-wide queries existed;
/// those are only reachable by point read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub slot_id: SlotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub proposer_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposer_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub votes: BTreeSet<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ProposalSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Number of distinct voters.
    #[must_use]
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Return `true` when `user` has voted for this proposal.
    #[must_use]
    pub fn has_vote_from(&self, user: &UserId) -> bool {
        self.votes.contains(user)
    }

    /// Add the vote if absent, remove it otherwise. Returns the new state.
    pub fn toggle_vote(&mut self, user: UserId) -> bool {
        if self.votes.remove(&user) {
            false
        } else {
            self.votes.insert(user);
            true
        }
    }
}
