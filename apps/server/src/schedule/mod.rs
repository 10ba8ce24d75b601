//! Slot scheduling core: grid generation, overlap rules, day exceptions,
//! availability and the reservation state machine.

pub mod availability;
pub mod exceptions;
pub mod grid;
pub mod lifecycle;
pub mod overlap;
pub mod time;

pub use availability::AvailabilityService;
pub use exceptions::ExceptionResolver;
pub use grid::SlotGrid;
pub use lifecycle::BookingLifecycle;
pub use time::{ServiceClock, ServiceSpan, Slot, TimeOfDay, VenueTime};
