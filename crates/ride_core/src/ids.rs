//! Newtype identifiers.
//!
//! Raw `Uuid`s are never passed between subsystems; wrapping them keeps the
//! ownership boundaries in the data model (drivers belong to the dispatch
//! index, trips to the orchestrator) enforced by the type system rather than
//! by convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

id_type!(TripId);
id_type!(DriverId);
id_type!(RiderId);
id_type!(VehicleId);
id_type!(RequestId);
id_type!(TripEventId);
