//! Slug resolution and the user-facing failure messages of a feed.

use tracing::{info, warn};

use crate::domain::ports::{TripStore, TripStoreError};
use crate::domain::{Error, TripRecord, TripSlug, UserId};

/// Shown when the slug matches no trip.
pub const TRIP_NOT_FOUND_MESSAGE: &str =
    "Trip not found. Check the link or ask the organiser to share it again.";
/// Shown when the feed was started without a signed-in identity.
pub const SIGN_IN_REQUIRED_MESSAGE: &str =
    "Sign in to view this trip, then ask the organiser for access.";
/// Shown when the store refuses the caller.
pub const ACCESS_DENIED_MESSAGE: &str =
    "You don't have access to this trip yet. Ask the organiser to add you.";
/// Shown for every transport or query failure.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load trip. Please try again.";

/// Look up the trip named by `slug` on behalf of `caller`.
///
/// A slug that can never be stored is reported as not found without a store
/// round trip.
pub async fn resolve_trip(
    store: &dyn TripStore,
    slug: &str,
    caller: Option<&UserId>,
) -> Result<TripRecord, Error> {
    let Some(caller) = caller else {
        return Err(Error::unauthorized(SIGN_IN_REQUIRED_MESSAGE));
    };
    let Ok(slug) = TripSlug::new(slug) else {
        info!(slug, "rejected malformed trip slug");
        return Err(Error::not_found(TRIP_NOT_FOUND_MESSAGE));
    };

    match store.find_trip_by_slug(&slug, caller).await {
        Ok(Some(record)) => {
            info!(slug = %slug, trip_id = %record.id, "trip resolved");
            Ok(record)
        }
        Ok(None) => {
            info!(slug = %slug, "no trip matches slug");
            Err(Error::not_found(TRIP_NOT_FOUND_MESSAGE))
        }
        Err(err) => {
            warn!(slug = %slug, error = %err, "trip resolution failed");
            Err(map_resolution_error(&err))
        }
    }
}

/// Translate a store failure during resolution into a user-facing error.
pub fn map_resolution_error(err: &TripStoreError) -> Error {
    match err {
        TripStoreError::PermissionDenied { .. } => Error::forbidden(ACCESS_DENIED_MESSAGE),
        TripStoreError::Connection { .. } => Error::service_unavailable(LOAD_FAILED_MESSAGE),
        TripStoreError::Query { .. } => Error::internal(LOAD_FAILED_MESSAGE),
    }
}

/// Error reported when the trip or day live query fails after resolution.
pub fn stream_failure() -> Error {
    Error::service_unavailable(LOAD_FAILED_MESSAGE)
}
