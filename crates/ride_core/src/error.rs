//! Error taxonomy for the coordination core.
//!
//! `Conflict` (a reservation race) is deliberately not a variant here: losing
//! a reservation race is a normal outcome of matching, represented as
//! `acquired: false`, not an error.

use crate::ids::{DriverId, TripId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("trip not found: {0}")]
    TripNotFound(TripId),

    #[error("driver not found: {0}")]
    DriverNotFound(DriverId),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("dependency degraded: {0}")]
    Degraded(String),

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
