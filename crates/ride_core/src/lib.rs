//! Coordination core for a rideshare platform.
//!
//! This crate holds the four subsystems that jointly turn a ride request into
//! a completed, paid trip while keeping geographically-distributed drivers in
//! consistent state: the geospatial engine, the driver availability index and
//! reservation lock service, the surge and pricing engines, the matching
//! engine, and the event-sourced trip orchestrator.
//!
//! Everything outside these subsystems (HTTP/GraphQL gateway, user/vehicle
//! CRUD, authentication, payment-provider wiring, deployment) is a
//! collaborator; only the interfaces this crate needs from them are modeled.

pub mod background;
pub mod bus;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod ids;
pub mod matching;
pub mod pricing;
pub mod surge;
pub mod trip;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::{CoreError, CoreResult};
