//! Surge pricing engine (component D).
//!
//! Generalizes the teacher's zone-based imbalance scoring (`matching::policy`)
//! from a per-match penalty into a standalone, periodically recomputed
//! per-geohash-zone table read by the pricing engine.

use crate::config::SurgeConfig;
use crate::geo::distance::geohash_encode;
use crate::geo::Location;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgeZone {
    pub geohash: String,
    pub active_drivers: u32,
    pub pending_requests: u32,
    pub multiplier: f64,
    pub computed_at: DateTime<Utc>,
}

pub struct SurgeEngine {
    config: SurgeConfig,
    zones: DashMap<String, SurgeZone>,
}

/// Outcome of a single zone's recompute: carries the prior multiplier so the
/// caller can detect and emit a `SurgeSpike` event (§6).
pub struct ZoneUpdate {
    pub geohash: String,
    pub old_multiplier: Option<f64>,
    pub new_multiplier: f64,
}

impl SurgeEngine {
    pub fn new(config: SurgeConfig) -> Self {
        Self { config, zones: DashMap::new() }
    }

    pub fn multiplier_for(&self, loc: Location, precision: usize) -> f64 {
        match geohash_encode(loc, precision) {
            Ok(hash) => self.zones.get(&hash).map(|z| z.multiplier).unwrap_or(1.0),
            Err(_) => 1.0,
        }
    }

    /// One surveillance tick (§4.D): counts per zone, recomputes the
    /// piecewise multiplier, evicts zones with no activity, and returns the
    /// set of updates so the caller can raise `SurgeSpike` events.
    pub fn tick(
        &self,
        pending_requests_by_geohash: &std::collections::HashMap<String, u32>,
        active_drivers_by_geohash: &std::collections::HashMap<String, u32>,
        now: DateTime<Utc>,
    ) -> Vec<ZoneUpdate> {
        let mut all_keys: std::collections::HashSet<&String> =
            pending_requests_by_geohash.keys().collect();
        all_keys.extend(active_drivers_by_geohash.keys());

        let mut updates = Vec::new();
        for geohash in all_keys {
            let requests = pending_requests_by_geohash.get(geohash).copied().unwrap_or(0);
            let drivers = active_drivers_by_geohash.get(geohash).copied().unwrap_or(0);
            if requests == 0 && drivers == 0 {
                continue;
            }
            let multiplier = self.compute_multiplier(requests, drivers);
            let old_multiplier = self.zones.get(geohash).map(|z| z.multiplier);
            self.zones.insert(
                geohash.clone(),
                SurgeZone {
                    geohash: geohash.clone(),
                    active_drivers: drivers,
                    pending_requests: requests,
                    multiplier,
                    computed_at: now,
                },
            );
            updates.push(ZoneUpdate { geohash: geohash.clone(), old_multiplier, new_multiplier: multiplier });
        }

        // Evict zones that had no activity this tick at all.
        let active: std::collections::HashSet<String> = pending_requests_by_geohash
            .keys()
            .chain(active_drivers_by_geohash.keys())
            .cloned()
            .collect();
        self.zones.retain(|k, _| active.contains(k));

        updates
    }

    fn compute_multiplier(&self, pending_requests: u32, active_drivers: u32) -> f64 {
        let demand_ratio = if active_drivers == 0 {
            if pending_requests == 0 {
                0.0
            } else {
                2.0 * pending_requests as f64
            }
        } else {
            pending_requests as f64 / active_drivers as f64
        };

        let m = if demand_ratio <= self.config.low {
            1.0
        } else if demand_ratio <= self.config.high {
            let t = (demand_ratio - self.config.low) / (self.config.high - self.config.low);
            1.0 + t * (self.config.base - 1.0)
        } else {
            let over = (demand_ratio - self.config.high) / 2.0;
            self.config.base * (1.0 + over.min(3.0))
        };

        m.clamp(1.0, self.config.max)
    }

    /// A transition is spike-worthy (§4.D) if it crosses 2.0 and is also a
    /// >1.2x jump over the prior value.
    pub fn is_spike(old: Option<f64>, new: f64) -> bool {
        match old {
            Some(old) if old > 0.0 => new > 2.0 && new > old * 1.2,
            _ => new > 2.0,
        }
    }
}
