//! Port for the live document store backing a trip board.
//!
//! Reads come in two shapes: one-shot lookups (`find_trip_by_slug`,
//! `get_proposal`) and live queries. A live query is a stream whose first item
//! is the current result set and whose later items are complete replacement
//! result sets. Dropping the stream closes the query.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::membership::DayIdChunk;
use crate::domain::{Day, Proposal, ProposalId, Slot, Trip, TripId, TripRecord, TripSlug, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by trip store adapters.
    pub enum TripStoreError {
        /// The store could not be reached.
        Connection { message: String } => "trip store connection failed: {message}",
        /// The store refused the read for the calling identity.
        PermissionDenied { message: String } => "trip store denied access: {message}",
        /// The read reached the store but failed.
        Query { message: String } => "trip store query failed: {message}",
    }
}

/// Live result stream; every item is a full result set.
pub type LiveQuery<T> = BoxStream<'static, Result<T, TripStoreError>>;

/// Read-side contract the aggregation layer needs from the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Find the unique trip whose slug equals `slug`, reading as `caller`.
    async fn find_trip_by_slug(
        &self,
        slug: &TripSlug,
        caller: &UserId,
    ) -> Result<Option<TripRecord>, TripStoreError>;

    /// Point read of a single proposal.
    async fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, TripStoreError>;

    /// Follow the trip document; `None` once it no longer exists.
    fn watch_trip(&self, trip_id: &TripId) -> LiveQuery<Option<Trip>>;

    /// Follow every day whose `trip_id` matches.
    fn watch_days(&self, trip_id: &TripId) -> LiveQuery<Vec<Day>>;

    /// Follow every slot whose `day_id` is a member of `chunk`.
    fn watch_slots(&self, chunk: &DayIdChunk) -> LiveQuery<Vec<Slot>>;

    /// Follow every proposal whose `trip_id` matches.
    fn watch_proposals(&self, trip_id: &TripId) -> LiveQuery<Vec<Proposal>>;
}
