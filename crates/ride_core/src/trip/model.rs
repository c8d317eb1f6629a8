//! Trip aggregate state (component G's payload).

use crate::geo::Location;
use crate::ids::{DriverId, RiderId, TripId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Requested,
    Searching,
    Matched,
    Confirmed,
    DriverArriving,
    DriverArrived,
    Started,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Whether `self -> next` is a legal edge in the state machine (§4.G).
    /// Cancellation is legal from any non-terminal state.
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        if next == TripStatus::Cancelled {
            return !self.is_terminal();
        }
        use TripStatus::*;
        matches!(
            (self, next),
            (Requested, Searching)
                | (Searching, Matched)
                | (Matched, Confirmed)
                | (Confirmed, DriverArriving)
                | (DriverArriving, DriverArrived)
                | (DriverArrived, Started)
                | (Started, InProgress)
                | (InProgress, Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Rider,
    Driver,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub rider_id: RiderId,
    pub pickup: Location,
    pub destination: Location,
    pub requested_vehicle_type: String,
    pub special_requirements: HashSet<String>,
    pub status: TripStatus,
    pub driver_id: Option<DriverId>,
    /// The request id the matching engine reserved the driver under; needed
    /// to release the reservation lock (compare-and-delete by holder) on
    /// cancellation.
    pub reservation_request_id: Option<crate::ids::RequestId>,
    pub vehicle_id: Option<VehicleId>,
    pub driver_current_location: Option<Location>,
    pub estimated_fare: Option<f64>,
    pub final_fare: Option<f64>,
    pub pickup_eta_sec: Option<u64>,
    pub distance_km: Option<f64>,
    pub duration_sec: Option<u64>,
    pub requested_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<ActorKind>,
    pub cancellation_fee: Option<f64>,
    pub version: u64,
}

impl Trip {
    pub fn new(
        id: TripId,
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
        requested_vehicle_type: String,
        special_requirements: HashSet<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rider_id,
            pickup,
            destination,
            requested_vehicle_type,
            special_requirements,
            status: TripStatus::Requested,
            driver_id: None,
            reservation_request_id: None,
            vehicle_id: None,
            driver_current_location: None,
            estimated_fare: None,
            final_fare: None,
            pickup_eta_sec: None,
            distance_km: None,
            duration_sec: None,
            requested_at,
            matched_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_fee: None,
            version: 0,
        }
    }

    /// Placeholder trip used only as the seed for replaying an event log.
    /// Every field but `id` is overwritten by the first `TripRequested`
    /// event — the log, not the caller, is the source of truth for a
    /// trip's origination fields.
    pub fn replay_seed(id: TripId) -> Self {
        let now = Utc::now();
        let placeholder = Location { lat: 0.0, lon: 0.0, accuracy_m: None, captured_at: now };
        Self::new(id, RiderId::default(), placeholder, placeholder, String::new(), HashSet::new(), now)
    }
}
