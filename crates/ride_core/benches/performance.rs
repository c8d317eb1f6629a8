//! Performance benchmarks for ride_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ride_core::config::{GeoConfig, MatchingConfig, PricingConfig, SurgeConfig};
use ride_core::dispatch::{Driver, DriverIndex, DriverStatus, ReservationService};
use ride_core::geo::{DistanceMethod, GeoEngine, Location};
use ride_core::ids::{DriverId, RequestId};
use ride_core::matching::{MatchRequest, MatchingEngine};
use ride_core::surge::SurgeEngine;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn bench_distance(c: &mut Criterion) {
    let a = Location::new(40.7128, -74.0060, chrono::Utc::now()).unwrap();
    let b = Location::new(40.7306, -73.9352, chrono::Utc::now()).unwrap();
    let geo = GeoEngine::new(GeoConfig::default());

    let mut group = c.benchmark_group("distance");
    for method in [DistanceMethod::Haversine, DistanceMethod::Manhattan, DistanceMethod::Euclidean] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", method)), &method, |bench, &m| {
            bench.iter(|| black_box(geo.distance(a, b, m)));
        });
    }
    group.finish();
}

fn seeded_index(n: usize) -> DriverIndex {
    let index = DriverIndex::new(GeoConfig::default());
    for i in 0..n {
        let lat = 40.70 + (i as f64 % 50.0) * 0.001;
        let lon = -74.01 + (i as f64 / 50.0) * 0.001;
        let loc = Location::new(lat, lon, chrono::Utc::now()).unwrap();
        let mut d = Driver::new(DriverId::new(), "standard", 4.8, loc);
        d.status = DriverStatus::Available;
        index.upsert(d);
    }
    index
}

fn bench_matching_scan(c: &mut Criterion) {
    let scenarios = vec![("small", 50), ("medium", 200), ("large", 500)];

    let mut group = c.benchmark_group("matching_scan");
    for (name, n) in scenarios {
        let index = Arc::new(seeded_index(n));
        let geo = Arc::new(GeoEngine::new(GeoConfig::default()));
        let reservation = Arc::new(ReservationService::new(30));
        let surge = Arc::new(SurgeEngine::new(SurgeConfig::default()));
        let engine = MatchingEngine::new(
            MatchingConfig::default(),
            PricingConfig::default(),
            SurgeConfig::default(),
            geo,
            index,
            reservation,
            surge,
        );
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let pickup = Location::new(40.7128, -74.0060, chrono::Utc::now()).unwrap();
        let destination = Location::new(40.7300, -73.9950, chrono::Utc::now()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(name), &n, |bench, _| {
            bench.iter(|| {
                let request = MatchRequest {
                    request_id: RequestId::new(),
                    pickup,
                    destination,
                    vehicle_type: "standard".to_string(),
                    special_requirements: HashSet::new(),
                };
                black_box(rt.block_on(engine.find_match(&request, chrono::Utc::now())));
            });
        });
    }
    group.finish();
}

fn bench_surge_tick(c: &mut Criterion) {
    let engine = SurgeEngine::new(SurgeConfig::default());
    let now = chrono::Utc::now();
    let mut pending = HashMap::new();
    let mut active = HashMap::new();
    for i in 0..200 {
        let zone = format!("dr5re{}", i % 26);
        *pending.entry(zone.clone()).or_insert(0u32) += 3;
        *active.entry(zone).or_insert(0u32) += 1;
    }

    c.bench_function("surge_tick_200_zones", |b| {
        b.iter(|| black_box(engine.tick(&pending, &active, now)));
    });
}

criterion_group!(benches, bench_distance, bench_matching_scan, bench_surge_tick);
criterion_main!(benches);
