//! Matching engine (component F, §4.F).
//!
//! Generalizes the teacher's pluggable `MatchingAlgorithm` trait and its
//! zone-based fairness/imbalance scoring (`matching::policy`) into the
//! spec's fixed four-factor weighted score plus a fairness-window penalty,
//! wired through the real reservation walk instead of a simulated
//! acceptance draw.

use crate::config::{MatchingConfig, PricingConfig, SurgeConfig};
use crate::dispatch::{Driver, DriverIndex, ReservationService};
use crate::geo::{GeoEngine, Location, NearbyFilter};
use crate::ids::{RequestId};
use crate::pricing::{FareRequest, PricingEngine, PromoContext};
use crate::surge::SurgeEngine;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const FALLBACK_ETA_SEC: u64 = 300;
const FALLBACK_FARE: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub request_id: RequestId,
    pub pickup: Location,
    pub destination: Location,
    pub vehicle_type: String,
    pub special_requirements: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct DriverScore {
    pub total: f64,
    pub distance_s: f64,
    pub rating_s: f64,
    pub availability_s: f64,
    pub vehicle_type_s: f64,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matched: bool,
    pub driver: Option<Driver>,
    pub eta_sec: Option<u64>,
    pub estimated_fare: Option<f64>,
    pub match_score: Option<f64>,
    pub drivers_evaluated: usize,
    pub reason: Option<&'static str>,
}

impl MatchOutcome {
    fn no_match(reason: &'static str, drivers_evaluated: usize) -> Self {
        Self {
            matched: false,
            driver: None,
            eta_sec: None,
            estimated_fare: None,
            match_score: None,
            drivers_evaluated,
            reason: Some(reason),
        }
    }
}

pub struct MatchingEngine {
    config: MatchingConfig,
    pricing_config: PricingConfig,
    surge_config: SurgeConfig,
    geo: Arc<GeoEngine>,
    index: Arc<DriverIndex>,
    reservation: Arc<ReservationService>,
    surge: Arc<SurgeEngine>,
}

impl MatchingEngine {
    pub fn new(
        config: MatchingConfig,
        pricing_config: PricingConfig,
        surge_config: SurgeConfig,
        geo: Arc<GeoEngine>,
        index: Arc<DriverIndex>,
        reservation: Arc<ReservationService>,
        surge: Arc<SurgeEngine>,
    ) -> Self {
        Self { config, pricing_config, surge_config, geo, index, reservation, surge }
    }

    pub async fn find_match(&self, request: &MatchRequest, now: DateTime<Utc>) -> MatchOutcome {
        let deadline = Duration::from_secs(self.config.deadline_sec);
        match tokio::time::timeout(deadline, self.find_match_inner(request, now)).await {
            Ok(outcome) => outcome,
            Err(_) => MatchOutcome::no_match("timeout", 0),
        }
    }

    async fn find_match_inner(&self, request: &MatchRequest, now: DateTime<Utc>) -> MatchOutcome {
        let filter = NearbyFilter {
            vehicle_compatibility: Some(self.config.compatible_vehicle_types(&request.vehicle_type)),
            required_features: request.special_requirements.iter().cloned().collect(),
        };

        let mut candidates = Vec::new();
        let mut r = self.config.r0_km;
        loop {
            let result = self.geo.nearby_drivers(
                &self.index,
                request.pickup,
                r,
                &filter,
                self.config.max_candidates,
                now,
            );
            if result.degraded {
                return MatchOutcome::no_match("degraded", candidates.len());
            }
            candidates = result.drivers;
            if candidates.len() >= self.config.max_candidates || r >= self.config.rmax_km {
                break;
            }
            r += self.config.step_km;
        }

        if candidates.is_empty() {
            return MatchOutcome::no_match("no_drivers_in_range", 0);
        }
        let evaluated = candidates.len();

        let mut scored: Vec<(Driver, f64)> = candidates
            .into_iter()
            .map(|c| {
                let vehicle_type_s = filter.vehicle_type_score(&c.driver);
                let score = self.score(&c.driver, c.distance_km, vehicle_type_s);
                let adjusted = self.apply_fairness(&c.driver, score.total, now);
                (c.driver, adjusted)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        for (driver, score) in &scored {
            let outcome = self.reservation.reserve(driver.id, request.request_id, now, None);
            if outcome.acquired {
                let (eta_sec, estimated_fare) = self.enrich(request, driver, now);
                return MatchOutcome {
                    matched: true,
                    driver: Some(driver.clone()),
                    eta_sec: Some(eta_sec),
                    estimated_fare: Some(estimated_fare),
                    match_score: Some(*score),
                    drivers_evaluated: evaluated,
                    reason: None,
                };
            }
        }

        MatchOutcome::no_match("all_candidates_reserved", evaluated)
    }

    fn score(&self, driver: &Driver, distance_km: f64, vehicle_type_s: f64) -> DriverScore {
        let distance_s = (-distance_km / (self.config.rmax_km / 3.0)).exp().min(1.0);
        let rating_s = ((driver.rating - 3.0) / 2.0).max(0.0);
        let availability_s = match driver.status {
            crate::dispatch::DriverStatus::Available => 1.0,
            crate::dispatch::DriverStatus::OnBreak => 0.3,
            _ => 0.0,
        };

        let total = self.config.w_distance * distance_s
            + self.config.w_rating * rating_s
            + self.config.w_availability * availability_s
            + self.config.w_vehicle_type * vehicle_type_s;

        DriverScore { total, distance_s, rating_s, availability_s, vehicle_type_s }
    }

    fn apply_fairness(&self, driver: &Driver, total: f64, now: DateTime<Utc>) -> f64 {
        if !self.config.fairness_enabled {
            return total;
        }
        let window = chrono::Duration::minutes(self.config.fairness_window_min);
        let recent = driver.recent_trip_count(now, window);
        let fairness = 1.0 - (recent as f64 / self.config.n_fair as f64).min(1.0);
        if fairness < self.config.fairness_min {
            total + self.config.fairness_lambda * (self.config.fairness_min - fairness)
        } else {
            total
        }
    }

    /// ETA and fare estimate for the winning candidate. Failure in either is
    /// a soft warning with the spec's documented fallback values, never a
    /// hard match failure (§4.F step 5).
    fn enrich(&self, request: &MatchRequest, driver: &Driver, now: DateTime<Utc>) -> (u64, f64) {
        let eta_sec = self
            .geo
            .eta(request.pickup, request.destination, &request.vehicle_type, 1.0)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "eta estimation failed, using fallback");
                FALLBACK_ETA_SEC
            });

        let distance_km = self
            .geo
            .distance(request.pickup, request.destination, crate::geo::DistanceMethod::Haversine)
            .unwrap_or(0.0);
        let duration_min = eta_sec as f64 / 60.0;
        let surge = self.surge.multiplier_for(request.pickup, self.surge_config.zone_precision);

        let pricing = PricingEngine::new(&self.pricing_config);
        let fare_req = FareRequest {
            vehicle_type: request.vehicle_type.clone(),
            distance_km,
            duration_min,
            pickup: request.pickup,
            time_of_day: now,
            user_id: String::new(),
            promo_code: None,
        };
        let estimated_fare = pricing
            .fare(&fare_req, surge, &PromoContext::default())
            .map(|f| f.total)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "fare estimation failed, using fallback");
                FALLBACK_FARE
            });

        (eta_sec, estimated_fare)
    }
}
