//! Day documents.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DayId, TripId};

/// One day of a trip.
///
/// `day_number` (1-based) is the authoritative sequence; `date` is
/// informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: DayId,
    pub trip_id: TripId,
    pub day_number: u32,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Day {
    /// Itinerary order: by day number, ties broken by identifier.
    #[must_use]
    pub fn itinerary_order(&self, other: &Self) -> Ordering {
        self.day_number
            .cmp(&other.day_number)
            .then_with(|| self.id.cmp(&other.id))
    }
}
