//! Event-sourced trip log (component H, scoped to a single aggregate).
//!
//! Append enforces `version = max_existing + 1`; replaying the log in
//! version order must reconstruct the stored Trip exactly (§8 invariant 1).

use super::model::{ActorKind, Trip, TripStatus};
use crate::geo::Location;
use crate::ids::{DriverId, RiderId, TripEventId, TripId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TripEventKind {
    TripRequested {
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
        requested_vehicle_type: String,
        special_requirements: HashSet<String>,
    },
    DriverMatched {
        driver_id: DriverId,
        request_id: crate::ids::RequestId,
        vehicle_id: Option<VehicleId>,
        estimated_fare: f64,
        pickup_eta_sec: u64,
        match_score: f64,
    },
    DriverConfirmed {
        driver_id: DriverId,
    },
    DriverArriving,
    DriverArrived,
    TripStarted,
    TripInProgress,
    LocationUpdated {
        lat: f64,
        lon: f64,
        captured_at: DateTime<Utc>,
    },
    EtaUpdated {
        new_eta_sec: u64,
        delta_sec: i64,
    },
    TripCompleted {
        final_fare: f64,
        distance_km: f64,
        duration_sec: u64,
    },
    TripCancelled {
        reason: String,
        cancelled_by: ActorKind,
        fee: f64,
    },
    PaymentRequested,
    PaymentProcessed {
        tx_id: String,
    },
    PaymentFailed {
        decline_code: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripEvent {
    pub id: TripEventId,
    pub trip_id: TripId,
    pub kind: TripEventKind,
    pub actor_id: String,
    pub actor_kind: ActorKind,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
}

/// Replays `events` (must already be in ascending version order) onto a
/// freshly constructed `Trip`, mutating state the same way the orchestrator
/// does when the event was first appended.
pub fn apply(trip: &mut Trip, event: &TripEvent) {
    use TripEventKind::*;
    match &event.kind {
        TripRequested { rider_id, pickup, destination, requested_vehicle_type, special_requirements } => {
            trip.rider_id = *rider_id;
            trip.pickup = *pickup;
            trip.destination = *destination;
            trip.requested_vehicle_type = requested_vehicle_type.clone();
            trip.special_requirements = special_requirements.clone();
            trip.requested_at = event.timestamp;
            trip.status = TripStatus::Searching;
        }
        DriverMatched { driver_id, request_id, vehicle_id, estimated_fare, pickup_eta_sec, .. } => {
            trip.status = TripStatus::Matched;
            trip.driver_id = Some(*driver_id);
            trip.reservation_request_id = Some(*request_id);
            trip.vehicle_id = *vehicle_id;
            trip.estimated_fare = Some(*estimated_fare);
            trip.pickup_eta_sec = Some(*pickup_eta_sec);
            trip.matched_at = Some(event.timestamp);
        }
        DriverConfirmed { .. } => {
            trip.status = TripStatus::Confirmed;
        }
        DriverArriving => {
            trip.status = TripStatus::DriverArriving;
        }
        DriverArrived => {
            trip.status = TripStatus::DriverArrived;
        }
        TripStarted => {
            trip.status = TripStatus::Started;
            trip.started_at = Some(event.timestamp);
        }
        TripInProgress => {
            trip.status = TripStatus::InProgress;
        }
        LocationUpdated { lat, lon, captured_at } => {
            trip.driver_current_location = crate::geo::Location::new(*lat, *lon, *captured_at).ok();
        }
        EtaUpdated { new_eta_sec, .. } => {
            trip.pickup_eta_sec = Some(*new_eta_sec);
        }
        TripCompleted { final_fare, distance_km, duration_sec } => {
            trip.status = TripStatus::Completed;
            trip.final_fare = Some(*final_fare);
            trip.distance_km = Some(*distance_km);
            trip.duration_sec = Some(*duration_sec);
            trip.completed_at = Some(event.timestamp);
        }
        TripCancelled { cancelled_by, fee, .. } => {
            trip.status = TripStatus::Cancelled;
            trip.cancelled_at = Some(event.timestamp);
            trip.cancelled_by = Some(*cancelled_by);
            trip.cancellation_fee = Some(*fee);
        }
        PaymentRequested | PaymentProcessed { .. } | PaymentFailed { .. } => {
            // Payment outcomes are recorded for audit but do not move the
            // trip state machine; Completed already happened on TripCompleted.
        }
    }
    trip.version = event.version;
}

/// Rebuilds a Trip from its event log. `seed` need carry nothing but the
/// trip id (see `Trip::replay_seed`): `TripRequested` carries the full
/// origination payload, so the log alone is sufficient to reconstruct a
/// trip if the snapshot cache is ever lost.
pub fn replay_onto(mut trip: Trip, events: &[TripEvent]) -> Trip {
    for event in events {
        apply(&mut trip, event);
    }
    trip
}
