//! Driver availability index (component B).
//!
//! Generalizes the per-entity-locked location cache pattern (one lock per
//! driver, never a single global lock) to a live service: `DashMap` shards
//! give "multiple readers, one writer per driver" without the reverse
//! geohash-bucket index blocking point reads of unrelated drivers, per
//! the concurrency model's copy-on-write / striped-lock requirement.

use super::driver::{Driver, DriverStatus};
use crate::config::GeoConfig;
use crate::geo::distance::geohash_encode;
use crate::ids::DriverId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

const BUCKET_PRECISION: usize = 6;

pub struct DriverIndex {
    drivers: DashMap<DriverId, Driver>,
    /// geohash(precision=6) -> driver ids currently in that bucket.
    buckets: RwLock<HashMap<String, HashSet<DriverId>>>,
    geo_cfg: GeoConfig,
}

impl DriverIndex {
    pub fn new(geo_cfg: GeoConfig) -> Self {
        Self {
            drivers: DashMap::new(),
            buckets: RwLock::new(HashMap::new()),
            geo_cfg,
        }
    }

    pub fn get(&self, id: DriverId) -> Option<Driver> {
        self.drivers.get(&id).map(|r| r.value().clone())
    }

    pub fn upsert(&self, driver: Driver) {
        let bucket = geohash_encode(driver.current_location, BUCKET_PRECISION).ok();
        let old_bucket = self
            .drivers
            .get(&driver.id)
            .and_then(|d| geohash_encode(d.current_location, BUCKET_PRECISION).ok());
        self.drivers.insert(driver.id, driver.clone());
        self.reindex_bucket(driver.id, old_bucket, bucket);
    }

    pub fn update_location(&self, id: DriverId, loc: crate::geo::Location) -> bool {
        let new_bucket = geohash_encode(loc, BUCKET_PRECISION).ok();
        let old_bucket = match self.drivers.get_mut(&id) {
            Some(mut entry) => {
                let old = geohash_encode(entry.current_location, BUCKET_PRECISION).ok();
                entry.current_location = loc;
                entry.last_location_update = loc.captured_at;
                old
            }
            None => return false,
        };
        self.reindex_bucket(id, old_bucket, new_bucket);
        true
    }

    pub fn update_status(&self, id: DriverId, status: DriverStatus) -> bool {
        match self.drivers.get_mut(&id) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn record_trip_completion(&self, id: DriverId, at: DateTime<Utc>) {
        if let Some(mut entry) = self.drivers.get_mut(&id) {
            entry.recent_trip_completions.push(at);
            if entry.recent_trip_completions.len() > 256 {
                let keep_from = entry.recent_trip_completions.len() - 256;
                entry.recent_trip_completions.drain(0..keep_from);
            }
        }
    }

    fn reindex_bucket(&self, id: DriverId, old: Option<String>, new: Option<String>) {
        if old == new {
            return;
        }
        let mut buckets = self.buckets.write();
        if let Some(old) = old {
            if let Some(set) = buckets.get_mut(&old) {
                set.remove(&id);
                if set.is_empty() {
                    buckets.remove(&old);
                }
            }
        }
        if let Some(new) = new {
            buckets.entry(new).or_default().insert(id);
        }
    }

    pub fn bucket_precision(&self) -> usize {
        BUCKET_PRECISION
    }

    /// Drivers in `bucket` and its 8 geohash neighbors.
    pub fn query_bucket_and_neighbors(&self, bucket: &str) -> Vec<DriverId> {
        self.query_rings(bucket, 1)
    }

    /// Drivers in `bucket` and `rings` concentric rings of geohash
    /// neighbors around it, expanding ring-by-ring like a flood fill so a
    /// caller can cover an arbitrary radius without the index needing
    /// multiple precision levels.
    pub fn query_rings(&self, bucket: &str, rings: usize) -> Vec<DriverId> {
        use geohash::Direction;
        const DIRECTIONS: [Direction; 8] = [
            Direction::N,
            Direction::S,
            Direction::E,
            Direction::W,
            Direction::NE,
            Direction::NW,
            Direction::SE,
            Direction::SW,
        ];

        let buckets = self.buckets.read();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(bucket.to_string());
        let mut out = Vec::new();
        if let Some(set) = buckets.get(bucket) {
            out.extend(set.iter().copied());
        }

        let mut frontier = vec![bucket.to_string()];
        for _ in 0..rings {
            let mut next_frontier = Vec::new();
            for cell in &frontier {
                for direction in DIRECTIONS {
                    let Ok(neighbor) = geohash::neighbor(cell, direction) else { continue };
                    if !seen.insert(neighbor.clone()) {
                        continue;
                    }
                    if let Some(set) = buckets.get(&neighbor) {
                        out.extend(set.iter().copied());
                    }
                    next_frontier.push(neighbor);
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        out
    }

    /// Periodic background task (§10.4 `StaleSweepTask`): drivers whose
    /// last location update exceeds the staleness window are forced
    /// Offline regardless of their stored status.
    pub fn stale_sweep(&self, now: DateTime<Utc>) -> usize {
        let staleness = chrono::Duration::seconds(self.geo_cfg.location_staleness_sec as i64);
        let mut swept = 0;
        for mut entry in self.drivers.iter_mut() {
            if entry.status != DriverStatus::Offline && now - entry.last_location_update > staleness {
                entry.status = DriverStatus::Offline;
                swept += 1;
            }
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use chrono::Utc;

    fn loc(lat: f64, lon: f64) -> Location {
        Location { lat, lon, accuracy_m: None, captured_at: Utc::now() }
    }

    #[test]
    fn upsert_and_get_round_trips() {
        let idx = DriverIndex::new(GeoConfig::default());
        let d = Driver::new(DriverId::new(), "standard", 4.8, loc(40.0, -74.0));
        let id = d.id;
        idx.upsert(d);
        assert!(idx.get(id).is_some());
    }

    #[test]
    fn moving_driver_updates_bucket_membership() {
        let idx = DriverIndex::new(GeoConfig::default());
        let d = Driver::new(DriverId::new(), "standard", 4.8, loc(40.0, -74.0));
        let id = d.id;
        idx.upsert(d);
        let far = loc(10.0, 10.0);
        idx.update_location(id, far);
        let bucket = geohash_encode(far, BUCKET_PRECISION).unwrap();
        assert!(idx.query_bucket_and_neighbors(&bucket).contains(&id));
    }

    #[test]
    fn stale_sweep_forces_offline() {
        let idx = DriverIndex::new(GeoConfig::default());
        let mut d = Driver::new(DriverId::new(), "standard", 4.8, loc(40.0, -74.0));
        d.status = DriverStatus::Available;
        d.last_location_update = Utc::now() - chrono::Duration::seconds(999);
        let id = d.id;
        idx.upsert(d);
        idx.stale_sweep(Utc::now());
        assert_eq!(idx.get(id).unwrap().status, DriverStatus::Offline);
    }
}
