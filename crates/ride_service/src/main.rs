//! Coordination-core service entry point.
//!
//! Wires the four subsystems (`ride_core`) to a tokio runtime, starts the
//! named background tasks, and runs a demo request-to-completion scenario
//! end to end. The HTTP/GraphQL gateway that would normally front this
//! service is out of scope; this binary exercises the wiring directly.

use anyhow::Result;
use ride_core::background::{
    BackgroundTask, ConfirmationTimeoutTask, ReservationReaperTask, StaleSweepTask, TaskSupervisor,
};
use ride_core::bus::{EventBus, EventLog};
use ride_core::clock::SystemClock;
use ride_core::config::RideCoreConfig;
use ride_core::dispatch::{Driver, DriverIndex, DriverStatus, ReservationService};
use ride_core::geo::{GeoEngine, Location};
use ride_core::ids::{DriverId, RiderId};
use ride_core::matching::MatchingEngine;
use ride_core::surge::SurgeEngine;
use ride_core::trip::{ActorKind, TripOrchestrator, WalletPaymentProvider};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("ride_service=info".parse()?))
        .init();

    let config = RideCoreConfig::load(Some("ride_core")).unwrap_or_default();
    let clock = Arc::new(SystemClock);

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

    let orchestrator = Arc::new(TripOrchestrator::new(
        event_log.clone(),
        bus.clone(),
        matching.clone(),
        geo.clone(),
        driver_index.clone(),
        reservation.clone(),
        config.pricing.clone(),
        surge.clone(),
        config.surge.clone(),
        payment,
        clock.clone(),
        config.trip.clone(),
    ));

    let mut supervisor = TaskSupervisor::new();
    supervisor.spawn(Arc::new(StaleSweepTask {
        index: driver_index.clone(),
        clock: clock.clone(),
        interval: Duration::from_secs(30),
    }));
    supervisor.spawn(Arc::new(ReservationReaperTask {
        reservation: reservation.clone(),
        clock: clock.clone(),
        interval: Duration::from_secs(10),
    }));
    supervisor.spawn(Arc::new(ConfirmationTimeoutTask {
        orchestrator: orchestrator.clone(),
        interval: Duration::from_secs(5),
    }));

    seed_demo_drivers(&driver_index);

    run_demo_scenario(&orchestrator).await?;

    supervisor.cancel_all();
    supervisor.join_all().await;
    Ok(())
}

fn seed_demo_drivers(index: &DriverIndex) {
    let seeds = [
        ("standard", 40.7128, -74.0060),
        ("standard", 40.7138, -74.0050),
        ("premium", 40.7200, -74.0000),
    ];
    for (vehicle_type, lat, lon) in seeds {
        let loc = Location::new(lat, lon, chrono::Utc::now()).expect("valid demo coordinate");
        let mut driver = Driver::new(DriverId::new(), vehicle_type, 4.8, loc);
        driver.status = DriverStatus::Available;
        index.upsert(driver);
    }
}

async fn run_demo_scenario(orchestrator: &Arc<TripOrchestrator>) -> Result<()> {
    let pickup = Location::new(40.7128, -74.0060, chrono::Utc::now())?;
    let destination = Location::new(40.7300, -73.9950, chrono::Utc::now())?;

    let trip = orchestrator
        .request_trip(
            RiderId::new(),
            pickup,
            destination,
            "standard".to_string(),
            HashSet::new(),
            None,
        )
        .await?;
    info!(trip_id = %trip.id, "trip requested");

    let trip = orchestrator.run_search(trip.id).await?;
    info!(trip_id = %trip.id, status = ?trip.status, "search completed");

    if let Some(driver_id) = trip.driver_id {
        let trip = orchestrator.driver_confirm(trip.id, driver_id, None).await?;
        info!(trip_id = %trip.id, status = ?trip.status, "driver confirmed");

        let trip = orchestrator.update_driver_location(trip.id, driver_id, pickup, None).await?;
        info!(trip_id = %trip.id, status = ?trip.status, "driver arrived");

        let trip = orchestrator.start_trip(trip.id, None).await?;
        info!(trip_id = %trip.id, status = ?trip.status, "trip started");

        let trip = orchestrator.complete_trip(trip.id, 2.0, 8.0, destination, None).await?;
        info!(trip_id = %trip.id, status = ?trip.status, fare = ?trip.final_fare, "trip completed");
    } else {
        orchestrator
            .cancel_trip(trip.id, "no_drivers".to_string(), ActorKind::System, None)
            .await?;
        info!(trip_id = %trip.id, "no drivers available, trip cancelled");
    }

    Ok(())
}
