//! Driver availability index (B) and reservation lock service (C).

pub mod driver;
pub mod index;
pub mod reservation;

pub use driver::{Driver, DriverStatus};
pub use index::DriverIndex;
pub use reservation::{ReservationService, ReserveOutcome};
