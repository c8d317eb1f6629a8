//! Driver record (component B's payload).

use crate::geo::Location;
use crate::ids::DriverId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    Available,
    Busy,
    OnBreak,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub vehicle_type: String,
    pub rating: f64,
    pub status: DriverStatus,
    pub current_location: Location,
    pub last_location_update: DateTime<Utc>,
    pub features: HashSet<String>,
    /// Completed-trip timestamps kept for the matching engine's fairness
    /// window (§4.F); trimmed lazily on read, not on every update.
    pub recent_trip_completions: Vec<DateTime<Utc>>,
}

impl Driver {
    pub fn new(
        id: DriverId,
        vehicle_type: impl Into<String>,
        rating: f64,
        location: Location,
    ) -> Self {
        let captured_at = location.captured_at;
        Self {
            id,
            vehicle_type: vehicle_type.into(),
            rating,
            status: DriverStatus::Offline,
            current_location: location,
            last_location_update: captured_at,
            features: HashSet::new(),
            recent_trip_completions: Vec::new(),
        }
    }

    pub fn recent_trip_count(&self, now: DateTime<Utc>, window: chrono::Duration) -> u32 {
        let cutoff = now - window;
        self.recent_trip_completions
            .iter()
            .filter(|t| **t >= cutoff)
            .count() as u32
    }
}
