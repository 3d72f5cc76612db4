//! Itinerary documents: days, time slots, and the proposals voted into them.
//!
//! Each type mirrors one store collection. Ownership runs trip → day → slot →
//! proposal through plain identifier fields; the aggregation layer joins them
//! back together in [`crate::domain::view`].

mod day;
mod proposal;
mod slot;

pub use day::Day;
pub use proposal::{BookingDetails, Proposal, ProposalSchedule};
pub use slot::{LockState, Slot, SlotStatus};
