//! Shared fixtures for integration tests, mirroring the teacher's
//! `tests/support/` helpers.

use ride_core::bus::{EventBus, EventLog};
use ride_core::clock::{Clock, FixedClock};
use ride_core::config::RideCoreConfig;
use ride_core::dispatch::{Driver, DriverIndex, DriverStatus, ReservationService};
use ride_core::geo::{GeoEngine, Location};
use ride_core::ids::DriverId;
use ride_core::matching::MatchingEngine;
use ride_core::surge::SurgeEngine;
use ride_core::trip::{TripOrchestrator, WalletPaymentProvider};
use std::sync::Arc;

pub struct Harness {
    pub config: RideCoreConfig,
    pub clock: Arc<FixedClock>,
    pub geo: Arc<GeoEngine>,
    pub driver_index: Arc<DriverIndex>,
    pub reservation: Arc<ReservationService>,
    pub surge: Arc<SurgeEngine>,
    pub orchestrator: Arc<TripOrchestrator>,
}

pub fn location(lat: f64, lon: f64, at: chrono::DateTime<chrono::Utc>) -> Location {
    Location::new(lat, lon, at).unwrap()
}

pub fn build_harness() -> Harness {
    let config = RideCoreConfig::default();
    let clock = Arc::new(FixedClock::new("2026-08-05T12:00:00Z".parse().unwrap()));
    let geo = Arc::new(GeoEngine::new(config.geo.clone()));
    let driver_index = Arc::new(DriverIndex::new(config.geo.clone()));
    let reservation = Arc::new(ReservationService::new(config.reservation.ttl_sec));
    let surge = Arc::new(SurgeEngine::new(config.surge.clone()));
    let event_log = Arc::new(EventLog::new());
    let bus = Arc::new(EventBus::new(1024));
    let payment = Arc::new(WalletPaymentProvider);

    let matching = Arc::new(MatchingEngine::new(
        config.matching.clone(),
        config.pricing.clone(),
        config.surge.clone(),
        geo.clone(),
        driver_index.clone(),
        reservation.clone(),
        surge.clone(),
    ));

    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let orchestrator = Arc::new(TripOrchestrator::new(
        event_log,
        bus,
        matching,
        geo.clone(),
        driver_index.clone(),
        reservation.clone(),
        config.pricing.clone(),
        surge.clone(),
        config.surge.clone(),
        payment,
        clock_dyn,
        config.trip.clone(),
    ));

    Harness { config, clock, geo, driver_index, reservation, surge, orchestrator }
}

pub fn add_driver(index: &DriverIndex, vehicle_type: &str, lat: f64, lon: f64, at: chrono::DateTime<chrono::Utc>) -> DriverId {
    let mut driver = Driver::new(DriverId::new(), vehicle_type, 4.8, location(lat, lon, at));
    driver.status = DriverStatus::Available;
    let id = driver.id;
    index.upsert(driver);
    id
}
