//! Trip orchestrator (component G, §4.G).
//!
//! Generalizes the teacher's event-driven "react to the current event,
//! validate preconditions, mutate state, schedule the follow-up event"
//! systems (`systems::{matching,driver_decision,trip_started,trip_completed,
//! rider_cancel}`) from ECS-system functions into async methods on a single
//! aggregate root, backed by the append-only log in [`crate::bus`].
//!
//! Two state-machine edges the distilled spec names only by effect, not by
//! a dedicated operation (`Confirmed -> DriverArriving -> DriverArrived`),
//! are resolved here (recorded in this repository's design ledger):
//! `driver_confirm` also advances `Confirmed -> DriverArriving` in the same
//! call (a confirmed driver is, by definition, now en route), and
//! `update_driver_location` advances `DriverArriving -> DriverArrived` once
//! the driver is observed within `ARRIVAL_RADIUS_KM` of pickup.

use super::events::{apply, TripEvent, TripEventKind};
use super::model::{ActorKind, Trip, TripStatus};
use super::payment::{PaymentOutcome, PaymentProvider, PaymentRequest};
use crate::bus::{EventBus, EventLog};
use crate::clock::SharedClock;
use crate::config::{PricingConfig, SurgeConfig, TripConfig};
use crate::dispatch::{DriverIndex, DriverStatus, ReservationService};
use crate::error::{CoreError, CoreResult};
use crate::geo::{GeoEngine, Location};
use crate::ids::{DriverId, RequestId, RiderId, TripEventId, TripId};
use crate::matching::{MatchOutcome, MatchRequest, MatchingEngine};
use crate::pricing::{FareRequest, PricingEngine, PromoContext};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

const ARRIVAL_RADIUS_KM: f64 = 0.05;

pub struct TripOrchestrator {
    event_log: Arc<EventLog>,
    bus: Arc<EventBus>,
    matching: Arc<MatchingEngine>,
    geo: Arc<GeoEngine>,
    driver_index: Arc<DriverIndex>,
    reservation: Arc<ReservationService>,
    pricing_config: PricingConfig,
    surge: Arc<crate::surge::SurgeEngine>,
    surge_config: SurgeConfig,
    payment: Arc<dyn PaymentProvider>,
    clock: SharedClock,
    trip_config: TripConfig,
    snapshots: DashMap<TripId, Trip>,
    idempotency: DashMap<String, TripId>,
    op_idempotency: DashMap<String, Trip>,
}

impl TripOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_log: Arc<EventLog>,
        bus: Arc<EventBus>,
        matching: Arc<MatchingEngine>,
        geo: Arc<GeoEngine>,
        driver_index: Arc<DriverIndex>,
        reservation: Arc<ReservationService>,
        pricing_config: PricingConfig,
        surge: Arc<crate::surge::SurgeEngine>,
        surge_config: SurgeConfig,
        payment: Arc<dyn PaymentProvider>,
        clock: SharedClock,
        trip_config: TripConfig,
    ) -> Self {
        Self {
            event_log,
            bus,
            matching,
            geo,
            driver_index,
            reservation,
            pricing_config,
            surge,
            surge_config,
            payment,
            clock,
            trip_config,
            snapshots: DashMap::new(),
            idempotency: DashMap::new(),
            op_idempotency: DashMap::new(),
        }
    }

    /// Looks up a cached result for a keyed retry of a non-creating
    /// operation (§4.G: every state-transitioning operation is idempotent
    /// under a caller-supplied key, not just `request_trip`). Namespaced by
    /// trip and operation name so the same key can't collide across calls.
    fn op_idempotent_result(&self, trip_id: TripId, op: &str, key: &Option<String>) -> Option<Trip> {
        let key = key.as_ref()?;
        self.op_idempotency.get(&format!("{trip_id}:{op}:{key}")).map(|t| t.value().clone())
    }

    fn store_op_idempotent_result(&self, trip_id: TripId, op: &str, key: &Option<String>, trip: &Trip) {
        if let Some(key) = key {
            self.op_idempotency.insert(format!("{trip_id}:{op}:{key}"), trip.clone());
        }
    }

    pub fn get_trip(&self, trip_id: TripId) -> CoreResult<Trip> {
        self.snapshots
            .get(&trip_id)
            .map(|t| t.value().clone())
            .ok_or(CoreError::TripNotFound(trip_id))
    }

    pub async fn events_since(&self, trip_id: TripId, since_version: u64) -> Vec<TripEvent> {
        self.event_log.events_since(trip_id, since_version).await
    }

    async fn append_and_apply(&self, trip_id: TripId, kind: TripEventKind, actor_id: String, actor_kind: ActorKind) -> CoreResult<Trip> {
        let event = TripEvent {
            id: TripEventId::new(),
            trip_id,
            kind,
            actor_id,
            actor_kind,
            timestamp: self.clock.now(),
            version: 0,
        };
        let event = self.event_log.append(event).await;
        let mut trip = self.snapshots.get_mut(&trip_id).ok_or(CoreError::TripNotFound(trip_id))?;
        apply(trip.value_mut(), &event);
        let snapshot = trip.value().clone();
        drop(trip);
        self.bus.publish(event);
        Ok(snapshot)
    }

    fn check_transition(&self, trip: &Trip, next: TripStatus) -> CoreResult<()> {
        if !trip.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", trip.status),
                to: format!("{next:?}"),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn request_trip(
        &self,
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
        requested_vehicle_type: String,
        special_requirements: HashSet<String>,
        idempotency_key: Option<String>,
    ) -> CoreResult<Trip> {
        if let Some(key) = &idempotency_key {
            if let Some(existing) = self.idempotency.get(key) {
                return self.get_trip(*existing);
            }
        }

        let trip_id = TripId::new();
        self.snapshots.insert(trip_id, Trip::replay_seed(trip_id));

        let result = self
            .append_and_apply(
                trip_id,
                TripEventKind::TripRequested { rider_id, pickup, destination, requested_vehicle_type, special_requirements },
                rider_id.to_string(),
                ActorKind::Rider,
            )
            .await?;

        if let Some(key) = idempotency_key {
            self.idempotency.insert(key, trip_id);
        }
        Ok(result)
    }

    /// Runs the matching search for a trip in `Searching` and applies its
    /// outcome. Intended to be spawned by the caller right after
    /// `request_trip` returns (§4.G "asynchronously kicks off search").
    pub async fn run_search(&self, trip_id: TripId) -> CoreResult<Trip> {
        let trip = self.get_trip(trip_id)?;
        if trip.status != TripStatus::Searching {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", trip.status),
                to: "Searching".to_string(),
            });
        }

        let request_id = RequestId::new();
        let match_request = MatchRequest {
            request_id,
            pickup: trip.pickup,
            destination: trip.destination,
            vehicle_type: trip.requested_vehicle_type.clone(),
            special_requirements: trip.special_requirements.clone(),
        };
        let outcome = self.matching.find_match(&match_request, self.clock.now()).await;

        if outcome.matched {
            self.assign_driver(trip_id, request_id, outcome).await
        } else {
            self.cancel_trip(trip_id, "no_drivers".to_string(), ActorKind::System, None).await
        }
    }

    async fn assign_driver(&self, trip_id: TripId, request_id: RequestId, outcome: MatchOutcome) -> CoreResult<Trip> {
        let trip = self.get_trip(trip_id)?;
        self.check_transition(&trip, TripStatus::Matched)?;

        let driver = outcome.driver.expect("assign_driver called with an unmatched outcome");
        self.driver_index.update_status(driver.id, DriverStatus::Busy);

        self.append_and_apply(
            trip_id,
            TripEventKind::DriverMatched {
                driver_id: driver.id,
                request_id,
                vehicle_id: None,
                estimated_fare: outcome.estimated_fare.unwrap_or(0.0),
                pickup_eta_sec: outcome.eta_sec.unwrap_or(0),
                match_score: outcome.match_score.unwrap_or(0.0),
            },
            "system".to_string(),
            ActorKind::System,
        )
        .await
    }

    /// Confirms the assignment and, in the same call, advances the trip
    /// into `DriverArriving` (see module decision note above).
    pub async fn driver_confirm(&self, trip_id: TripId, driver_id: DriverId, idempotency_key: Option<String>) -> CoreResult<Trip> {
        const OP: &str = "driver_confirm";
        if let Some(cached) = self.op_idempotent_result(trip_id, OP, &idempotency_key) {
            return Ok(cached);
        }

        let trip = self.get_trip(trip_id)?;
        self.check_transition(&trip, TripStatus::Confirmed)?;
        if trip.driver_id != Some(driver_id) {
            return Err(CoreError::InvalidArgument(
                "driver_confirm called by a driver other than the assigned one".to_string(),
            ));
        }

        self.append_and_apply(
            trip_id,
            TripEventKind::DriverConfirmed { driver_id },
            driver_id.to_string(),
            ActorKind::Driver,
        )
        .await?;
        let result = self
            .append_and_apply(trip_id, TripEventKind::DriverArriving, "system".to_string(), ActorKind::System)
            .await?;
        self.store_op_idempotent_result(trip_id, OP, &idempotency_key, &result);
        Ok(result)
    }

    pub async fn update_driver_location(
        &self,
        trip_id: TripId,
        driver_id: DriverId,
        loc: Location,
        idempotency_key: Option<String>,
    ) -> CoreResult<Trip> {
        const OP: &str = "update_driver_location";
        if let Some(cached) = self.op_idempotent_result(trip_id, OP, &idempotency_key) {
            return Ok(cached);
        }

        let trip = self.get_trip(trip_id)?;
        if trip.driver_id != Some(driver_id) {
            return Err(CoreError::InvalidArgument("location update from unassigned driver".to_string()));
        }
        self.driver_index.update_location(driver_id, loc);

        let previous_eta = trip.pickup_eta_sec;
        let mut trip = self
            .append_and_apply(
                trip_id,
                TripEventKind::LocationUpdated { lat: loc.lat, lon: loc.lon, captured_at: loc.captured_at },
                driver_id.to_string(),
                ActorKind::Driver,
            )
            .await?;

        if matches!(trip.status, TripStatus::DriverArriving | TripStatus::InProgress) {
            let target = if trip.status == TripStatus::DriverArriving { trip.pickup } else { trip.destination };
            if let Ok(new_eta) = self.geo.eta(loc, target, &trip.requested_vehicle_type, 1.0) {
                if let Some(old) = previous_eta {
                    let delta = new_eta as i64 - old as i64;
                    if delta.unsigned_abs() > 60 {
                        trip = self
                            .append_and_apply(
                                trip_id,
                                TripEventKind::EtaUpdated { new_eta_sec: new_eta, delta_sec: delta },
                                "system".to_string(),
                                ActorKind::System,
                            )
                            .await?;
                    }
                }
            }
        }

        if trip.status == TripStatus::DriverArriving {
            if let Ok(d) = self.geo.distance(loc, trip.pickup, crate::geo::DistanceMethod::Haversine) {
                if d <= ARRIVAL_RADIUS_KM {
                    trip = self
                        .append_and_apply(trip_id, TripEventKind::DriverArrived, "system".to_string(), ActorKind::System)
                        .await?;
                }
            }
        }

        self.store_op_idempotent_result(trip_id, OP, &idempotency_key, &trip);
        Ok(trip)
    }

    pub async fn start_trip(&self, trip_id: TripId, idempotency_key: Option<String>) -> CoreResult<Trip> {
        const OP: &str = "start_trip";
        if let Some(cached) = self.op_idempotent_result(trip_id, OP, &idempotency_key) {
            return Ok(cached);
        }

        let trip = self.get_trip(trip_id)?;
        self.check_transition(&trip, TripStatus::Started)?;

        self.append_and_apply(trip_id, TripEventKind::TripStarted, "system".to_string(), ActorKind::System)
            .await?;
        let result = self
            .append_and_apply(trip_id, TripEventKind::TripInProgress, "system".to_string(), ActorKind::System)
            .await?;
        self.store_op_idempotent_result(trip_id, OP, &idempotency_key, &result);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn complete_trip(
        &self,
        trip_id: TripId,
        final_distance_km: f64,
        final_duration_min: f64,
        _end_location: Location,
        idempotency_key: Option<String>,
    ) -> CoreResult<Trip> {
        const OP: &str = "complete_trip";
        if let Some(cached) = self.op_idempotent_result(trip_id, OP, &idempotency_key) {
            return Ok(cached);
        }

        let trip = self.get_trip(trip_id)?;
        self.check_transition(&trip, TripStatus::Completed)?;

        let surge = self.surge.multiplier_for(trip.pickup, self.surge_config.zone_precision);
        let pricing = PricingEngine::new(&self.pricing_config);
        let fare_request = FareRequest {
            vehicle_type: trip.requested_vehicle_type.clone(),
            distance_km: final_distance_km,
            duration_min: final_duration_min,
            pickup: trip.pickup,
            time_of_day: self.clock.now(),
            user_id: trip.rider_id.to_string(),
            promo_code: None,
        };
        let fare = pricing.fare(&fare_request, surge, &PromoContext::default())?;

        let duration_sec = (final_duration_min * 60.0).round().max(0.0) as u64;
        let trip = self
            .append_and_apply(
                trip_id,
                TripEventKind::TripCompleted {
                    final_fare: fare.total,
                    distance_km: final_distance_km,
                    duration_sec,
                },
                "system".to_string(),
                ActorKind::System,
            )
            .await?;

        if let Some(driver_id) = trip.driver_id {
            self.driver_index.update_status(driver_id, DriverStatus::Available);
            self.driver_index.record_trip_completion(driver_id, self.clock.now());
        }

        self.append_and_apply(trip_id, TripEventKind::PaymentRequested, "system".to_string(), ActorKind::System)
            .await?;

        let payment_request = PaymentRequest {
            trip_id: trip_id.to_string(),
            user_id: trip.rider_id.to_string(),
            amount_cents: (fare.total * 100.0).round() as u64,
            currency: fare.currency.clone(),
            method_token: "default".to_string(),
        };
        let result = match self.payment.process(&payment_request).await {
            Ok(PaymentOutcome::Ok { tx_id }) => {
                self.append_and_apply(trip_id, TripEventKind::PaymentProcessed { tx_id }, "system".to_string(), ActorKind::System)
                    .await
            }
            Ok(PaymentOutcome::Declined { decline_code }) => {
                self.append_and_apply(
                    trip_id,
                    TripEventKind::PaymentFailed { decline_code },
                    "system".to_string(),
                    ActorKind::System,
                )
                .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "payment provider call failed");
                self.append_and_apply(
                    trip_id,
                    TripEventKind::PaymentFailed { decline_code: "provider_error".to_string() },
                    "system".to_string(),
                    ActorKind::System,
                )
                .await
            }
        }?;
        self.store_op_idempotent_result(trip_id, OP, &idempotency_key, &result);
        Ok(result)
    }

    pub async fn cancel_trip(
        &self,
        trip_id: TripId,
        reason: String,
        cancelled_by: ActorKind,
        idempotency_key: Option<String>,
    ) -> CoreResult<Trip> {
        const OP: &str = "cancel_trip";
        if let Some(cached) = self.op_idempotent_result(trip_id, OP, &idempotency_key) {
            return Ok(cached);
        }

        let trip = self.get_trip(trip_id)?;
        if trip.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", trip.status),
                to: "Cancelled".to_string(),
            });
        }

        let fee = cancellation_fee(trip.status, &self.pricing_config, &trip.requested_vehicle_type);

        if let Some(driver_id) = trip.driver_id {
            if let Some(request_id) = trip.reservation_request_id {
                self.reservation.release(driver_id, request_id);
            }
            self.driver_index.update_status(driver_id, DriverStatus::Available);
        }

        let result = self
            .append_and_apply(
                trip_id,
                TripEventKind::TripCancelled { reason, cancelled_by, fee },
                "system".to_string(),
                cancelled_by,
            )
            .await?;
        self.store_op_idempotent_result(trip_id, OP, &idempotency_key, &result);
        Ok(result)
    }

    /// Background task (§10.4 `ConfirmationTimeoutTask`): trips stuck in
    /// `Matched` past the confirmation deadline auto-cancel.
    pub async fn sweep_confirmation_timeouts(&self) -> usize {
        let now = self.clock.now();
        let timeout = chrono::Duration::seconds(self.trip_config.driver_confirmation_timeout_sec as i64);
        let stuck: Vec<TripId> = self
            .snapshots
            .iter()
            .filter(|e| {
                e.status == TripStatus::Matched
                    && e.matched_at.map(|t| now - t > timeout).unwrap_or(false)
            })
            .map(|e| *e.key())
            .collect();

        let mut swept = 0;
        for trip_id in stuck {
            if self
                .cancel_trip(trip_id, "driver_confirmation_timeout".to_string(), ActorKind::System, None)
                .await
                .is_ok()
            {
                swept += 1;
            }
        }
        swept
    }
}

/// Cancellation-fee lookup (§4.G): the status->fee table is illustrative in
/// the distilled spec, so it is sourced from the rate card's
/// `cancellation_fee`, scaled by how far into the trip lifecycle the
/// cancellation happened, rather than hardcoded here.
fn cancellation_fee(status: TripStatus, pricing: &PricingConfig, vehicle_type: &str) -> f64 {
    let base = pricing
        .rate_cards
        .get(vehicle_type)
        .map(|c| c.cancellation_fee)
        .unwrap_or(5.0);
    let factor = match status {
        TripStatus::Requested | TripStatus::Searching => 0.0,
        TripStatus::Matched | TripStatus::Confirmed => 0.4,
        TripStatus::DriverArriving => 0.6,
        TripStatus::DriverArrived | TripStatus::Started | TripStatus::InProgress => 1.0,
        TripStatus::Completed | TripStatus::Cancelled => 0.0,
    };
    (base * factor * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_fee_scales_with_progress() {
        let mut pricing = PricingConfig::default();
        pricing.rate_cards.insert(
            "standard".to_string(),
            crate::config::RateCard {
                base_fare: 2.5,
                per_km: 1.2,
                per_min: 0.25,
                minimum: 5.0,
                service_fee_pct: 0.2,
                cancellation_fee: 5.0,
            },
        );
        assert_eq!(cancellation_fee(TripStatus::Searching, &pricing, "standard"), 0.0);
        assert_eq!(cancellation_fee(TripStatus::Matched, &pricing, "standard"), 2.0);
        assert_eq!(cancellation_fee(TripStatus::DriverArrived, &pricing, "standard"), 5.0);
    }
}
