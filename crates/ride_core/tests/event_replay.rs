mod support;

use ride_core::clock::Clock;
use ride_core::ids::RiderId;
use ride_core::trip::{replay_onto, Trip, TripStatus};
use std::collections::HashSet;
use support::{add_driver, build_harness, location};

#[tokio::test]
async fn replaying_the_event_log_reconstructs_the_live_snapshot() {
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
    let trip = h.orchestrator.start_trip(trip.id, None).await.unwrap();
    let live = h.orchestrator.complete_trip(trip.id, 2.0, 8.0, destination, None).await.unwrap();

    let events = h.orchestrator.events_since(live.id, 0).await;
    assert!(!events.is_empty());
    assert_eq!(events.first().unwrap().version, 1);
    assert_eq!(events.last().unwrap().version, events.len() as u64);

    let seed = Trip::replay_seed(live.id);
    let replayed = replay_onto(seed, &events);

    assert_eq!(replayed.rider_id, live.rider_id);
    assert_eq!(replayed.pickup, live.pickup);
    assert_eq!(replayed.destination, live.destination);
    assert_eq!(replayed.requested_vehicle_type, live.requested_vehicle_type);
    assert_eq!(replayed.status, live.status);
    assert_eq!(replayed.driver_id, live.driver_id);
    assert_eq!(replayed.final_fare, live.final_fare);
    assert_eq!(replayed.version, live.version);
}

#[tokio::test]
async fn partial_replay_stops_at_requested_version() {
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

    let events = h.orchestrator.events_since(trip.id, 0).await;
    assert_eq!(trip.status, TripStatus::Matched);
    // Only the request event (version 1), not the match event (version 2).
    let only_first = &events[..1];
    let seed = Trip::replay_seed(trip.id);
    let replayed = replay_onto(seed, only_first);
    assert_eq!(replayed.status, TripStatus::Searching);
    assert_eq!(replayed.rider_id, trip.rider_id);
    assert_eq!(replayed.pickup, trip.pickup);
    assert!(replayed.driver_id.is_none());
}
