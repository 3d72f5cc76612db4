//! Trip documents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::serde_defaults::null_as_default;
use super::{TripId, TripSlug, UserId};

/// Inclusive calendar range of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Trip document as stored in the `trips` collection.
///
/// Array fields written as `null` or omitted by older clients decode as empty
/// collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub slug: TripSlug,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destinations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// AI-generated one-liner describing the trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    /// AI-generated mood tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub vibe_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub member_ids: Vec<UserId>,
}

impl Trip {
    /// Return `true` when `caller` may read this trip.
    ///
    /// Trips without an owner or member list predate access control and stay
    /// readable by any signed-in user.
    #[must_use]
    pub fn grants_access(&self, caller: &UserId) -> bool {
        match &self.owner_id {
            None if self.member_ids.is_empty() => true,
            owner => owner.as_ref() == Some(caller) || self.member_ids.contains(caller),
        }
    }
}

/// A trip together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub id: TripId,
    #[serde(flatten)]
    pub trip: Trip,
}
