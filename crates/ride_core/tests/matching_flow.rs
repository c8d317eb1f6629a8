mod support;

use ride_core::clock::Clock;
use ride_core::ids::RequestId;
use ride_core::matching::{MatchRequest, MatchingEngine};
use std::collections::HashSet;
use std::sync::Arc;
use support::{add_driver, build_harness, location};

fn engine(h: &support::Harness) -> MatchingEngine {
    MatchingEngine::new(
        h.config.matching.clone(),
        h.config.pricing.clone(),
        h.config.surge.clone(),
        h.geo.clone(),
        h.driver_index.clone(),
        h.reservation.clone(),
        h.surge.clone(),
    )
}

#[tokio::test]
async fn nearest_available_driver_wins_when_ratings_are_equal() {
    let h = build_harness();
    let now = h.clock.now();
    let far = add_driver(&h.driver_index, "standard", 40.7500, -74.0000, now);
    let near = add_driver(&h.driver_index, "standard", 40.7129, -74.0061, now);

    let m = engine(&h);
    let request = MatchRequest {
        request_id: RequestId::new(),
        pickup: location(40.7128, -74.0060, now),
        destination: location(40.7300, -73.9950, now),
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome = m.find_match(&request, now).await;
    assert!(outcome.matched);
    let winner = outcome.driver.unwrap().id;
    assert_eq!(winner, near);
    assert_ne!(winner, far);
}

#[tokio::test]
async fn radius_expands_until_a_candidate_is_found() {
    let h = build_harness();
    let now = h.clock.now();
    // ~11km away, outside the default r0 but inside rmax.
    let distant = add_driver(&h.driver_index, "standard", 40.8128, -74.0060, now);

    let m = engine(&h);
    let request = MatchRequest {
        request_id: RequestId::new(),
        pickup: location(40.7128, -74.0060, now),
        destination: location(40.7300, -73.9950, now),
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome = m.find_match(&request, now).await;
    assert!(outcome.matched);
    assert_eq!(outcome.driver.unwrap().id, distant);
}

#[tokio::test]
async fn vehicle_type_filter_excludes_incompatible_drivers() {
    let h = build_harness();
    let now = h.clock.now();
    add_driver(&h.driver_index, "luxury", 40.7128, -74.0060, now);

    let m = engine(&h);
    let request = MatchRequest {
        request_id: RequestId::new(),
        pickup: location(40.7128, -74.0060, now),
        destination: location(40.7300, -73.9950, now),
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome = m.find_match(&request, now).await;
    assert!(!outcome.matched);
    assert_eq!(outcome.reason, Some("no_drivers_in_range"));
}

#[tokio::test]
async fn compatible_but_not_exact_vehicle_type_still_matches() {
    let h = build_harness();
    let now = h.clock.now();
    let premium = add_driver(&h.driver_index, "premium", 40.7128, -74.0060, now);

    let m = engine(&h);
    let request = MatchRequest {
        request_id: RequestId::new(),
        pickup: location(40.7128, -74.0060, now),
        destination: location(40.7300, -73.9950, now),
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome = m.find_match(&request, now).await;
    assert!(outcome.matched);
    assert_eq!(outcome.driver.unwrap().id, premium);
}

#[tokio::test]
async fn already_reserved_driver_is_skipped_for_a_second_request() {
    let h = build_harness();
    let now = h.clock.now();
    add_driver(&h.driver_index, "standard", 40.7128, -74.0060, now);

    let m = engine(&h);
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let first = MatchRequest {
        request_id: RequestId::new(),
        pickup,
        destination,
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome1 = m.find_match(&first, now).await;
    assert!(outcome1.matched);

    let second = MatchRequest {
        request_id: RequestId::new(),
        pickup,
        destination,
        vehicle_type: "standard".to_string(),
        special_requirements: HashSet::new(),
    };
    let outcome2 = m.find_match(&second, now).await;
    assert!(!outcome2.matched);
    assert_eq!(outcome2.reason, Some("all_candidates_reserved"));
}

#[tokio::test]
async fn concurrent_matches_for_the_same_lone_driver_only_one_wins() {
    let h = Arc::new(build_harness());
    let now = h.clock.now();
    add_driver(&h.driver_index, "standard", 40.7128, -74.0060, now);
    let m = Arc::new(engine(&h));
    let pickup = location(40.7128, -74.0060, now);
    let destination = location(40.7300, -73.9950, now);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let m = m.clone();
        tasks.push(tokio::spawn(async move {
            let request = MatchRequest {
                request_id: RequestId::new(),
                pickup,
                destination,
                vehicle_type: "standard".to_string(),
                special_requirements: HashSet::new(),
            };
            m.find_match(&request, now).await.matched
        }));
    }
    let mut wins = 0;
    for t in tasks {
        if t.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}
