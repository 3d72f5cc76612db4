//! Domain primitives, the live trip aggregation layer, and its ports.
//!
//! Purpose: Define strongly typed trip board documents and the read-side
//! machinery that keeps a nested `Trip -> Day -> Slot -> Proposal` view up to
//! date. Adapters live in `inbound` and `outbound`; nothing here knows about
//! sockets or storage engines.
//!
//! Public surface:
//! - Error (alias to `error::Error`): user-facing failure payload.
//! - TripFeed / TripFeedHandle: start and stop a live trip view.
//! - rebuild_view: pure join of cached documents into the nested view.

pub mod error;
pub mod ids;
pub mod itinerary;
pub mod live;
pub mod membership;
pub mod ports;
pub(crate) mod serde_defaults;
pub mod slug;
pub mod trip;
pub mod view;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{DayId, IdValidationError, ProposalId, SlotId, TripId, UserId};
pub use self::itinerary::{
    BookingDetails, Day, LockState, Proposal, ProposalSchedule, Slot, SlotStatus,
};
pub use self::live::{FeedState, TripFeed, TripFeedHandle};
pub use self::slug::{SlugValidationError, TripSlug};
pub use self::trip::{DateRange, Trip, TripRecord};
pub use self::view::{DayWithSlots, SlotWithProposals, rebuild_view};
