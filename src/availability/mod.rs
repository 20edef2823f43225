// Availability
//
// Slot primitives, blocked-date matching and the slot-check service.

pub mod blocked;
pub mod service;
pub mod slots;

pub use blocked::BlockedDate;
pub use service::{
    AvailabilityReason, AvailabilityResult, AvailabilityService, OccupiedInterval, SlotAvailability,
    SlotOccupancy, SlotRequest, SlotSpec,
};
pub use slots::TimeSlot;
