//! Load tests for ride_core: validate throughput under realistic request
//! volume. Only run explicitly:
//! `cargo test --package ride_core --test load_tests -- --ignored`

mod support;

use ride_core::clock::Clock;
use ride_core::ids::RiderId;
use std::collections::HashSet;
use std::time::Instant;
use support::{add_driver, build_harness, location};

#[tokio::test]
#[ignore]
async fn sustained_request_volume_meets_throughput_floor() {
    let h = build_harness();
    let now = h.clock.now();
    for i in 0..500 {
        let lat = 40.70 + (i as f64 % 50.0) * 0.001;
        let lon = -74.01 + (i as f64 / 50.0) * 0.001;
        add_driver(&h.driver_index, "standard", lat, lon, now);
    }

    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let start = Instant::now();
    let mut completed = 0u32;
    for _ in 0..1000 {
        let trip = h
            .orchestrator
            .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
            .await
            .unwrap();
        let trip = h.orchestrator.run_search(trip.id).await.unwrap();
        if trip.driver_id.is_some() {
            completed += 1;
        }
    }
    let duration = start.elapsed();
    let per_sec = completed as f64 / duration.as_secs_f64();
    println!("Sustained load test: {completed} matches in {:.2}s ({:.0}/sec)", duration.as_secs_f64(), per_sec);

    assert!(per_sec > 200.0, "should process >200 matches/sec, got {per_sec:.0}");
}

#[tokio::test]
#[ignore]
async fn peak_spike_of_simultaneous_requests_is_handled_gracefully() {
    let h = std::sync::Arc::new(build_harness());
    let now = h.clock.now();
    for i in 0..200 {
        let lat = 40.70 + (i as f64 % 20.0) * 0.002;
        let lon = -74.01 + (i as f64 / 20.0) * 0.002;
        add_driver(&h.driver_index, "standard", lat, lon, now);
    }

    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..500 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            let trip = h
                .orchestrator
                .request_trip(RiderId::new(), pickup, destination, "standard".to_string(), HashSet::new(), None)
                .await
                .unwrap();
            h.orchestrator.run_search(trip.id).await.unwrap().driver_id.is_some()
        }));
    }
    let mut matched = 0u32;
    for t in tasks {
        if t.await.unwrap() {
            matched += 1;
        }
    }
    let duration = start.elapsed();
    println!("Peak load test: {matched}/500 matched in {:.2}s", duration.as_secs_f64());
    assert!(matched >= 200, "should match at least 200 of 500 simultaneous requests, got {matched}");
}
