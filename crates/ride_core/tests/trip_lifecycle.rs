mod support;

use ride_core::clock::Clock;
use ride_core::ids::RiderId;
use ride_core::trip::{ActorKind, TripStatus};
use std::collections::HashSet;
use support::{add_driver, build_harness, location};

#[tokio::test]
async fn happy_path_reaches_completed_with_expected_fare() {
    let h = build_harness();
    let now = h.clock.now();
    add_driver(&h.driver_index, "standard", 40.7128, -74.0060, now);

    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let trip = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
        .await
        .unwrap();
    assert_eq!(trip.status, TripStatus::Searching);

    let trip = h.orchestrator.run_search(trip.id).await.unwrap();
    assert_eq!(trip.status, TripStatus::Matched);
    let driver_id = trip.driver_id.unwrap();

    let trip = h.orchestrator.driver_confirm(trip.id, driver_id, None).await.unwrap();
    assert_eq!(trip.status, TripStatus::DriverArriving);

    let trip = h.orchestrator.update_driver_location(trip.id, driver_id, pickup, None).await.unwrap();
    assert_eq!(trip.status, TripStatus::DriverArrived);

    let trip = h.orchestrator.start_trip(trip.id, None).await.unwrap();
    assert_eq!(trip.status, TripStatus::InProgress);

    let trip = h.orchestrator.complete_trip(trip.id, 2.0, 8.0, destination, None).await.unwrap();
    assert_eq!(trip.status, TripStatus::Completed);
    assert!(trip.final_fare.unwrap() >= h.config.pricing.global_min_fare);
}

#[tokio::test]
async fn no_drivers_cancels_with_no_drivers_reason() {
    let h = build_harness();
    let now = h.clock.now();
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let trip = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
        .await
        .unwrap();

    let trip = h.orchestrator.run_search(trip.id).await.unwrap();
    assert_eq!(trip.status, TripStatus::Cancelled);
    assert_eq!(trip.cancellation_fee, Some(0.0));
}

#[tokio::test]
async fn cancel_after_arrival_charges_full_fee() {
    let h = build_harness();
    let now = h.clock.now();
    add_driver(&h.driver_index, "standard", 40.7128, -74.0060, now);
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let trip = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
        .await
        .unwrap();
    let trip = h.orchestrator.run_search(trip.id).await.unwrap();
    let driver_id = trip.driver_id.unwrap();
    let trip = h.orchestrator.driver_confirm(trip.id, driver_id, None).await.unwrap();
    let trip = h.orchestrator.update_driver_location(trip.id, driver_id, pickup, None).await.unwrap();
    assert_eq!(trip.status, TripStatus::DriverArrived);

    let trip = h
        .orchestrator
        .cancel_trip(trip.id, "rider changed mind".to_string(), ActorKind::Rider, None)
        .await
        .unwrap();
    assert_eq!(trip.status, TripStatus::Cancelled);
    assert_eq!(trip.cancellation_fee, Some(5.0));
}

#[tokio::test]
async fn idempotency_key_returns_same_trip_on_replay() {
    let h = build_harness();
    let now = h.clock.now();
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);
    let key = Some("req-123".to_string());

    let t1 = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), key.clone())
        .await
        .unwrap();
    let t2 = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), key)
        .await
        .unwrap();
    assert_eq!(t1.id, t2.id);
}

#[tokio::test]
async fn invalid_transition_is_rejected() {
    let h = build_harness();
    let now = h.clock.now();
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let trip = h
        .orchestrator
        .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
        .await
        .unwrap();

    // Still Searching: start_trip is illegal from here.
    assert!(h.orchestrator.start_trip(trip.id, None).await.is_err());
}
