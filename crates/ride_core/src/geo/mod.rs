//! Geospatial engine (component A): distance, ETA, geohashing, and
//! radius search over the driver availability index.

pub mod distance;
pub mod eta;
pub mod traffic;

use crate::config::GeoConfig;
use crate::dispatch::driver::{Driver, DriverStatus};
use crate::dispatch::index::DriverIndex;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
pub use distance::{DistanceMethod, Location};
pub use eta::eta_seconds;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
pub use traffic::{NoopTrafficFactorProvider, TrafficFactorProvider};

/// Filters applied before distance/ranking, per the matching engine's hard
/// filters (vehicle-type compatibility, special requirements, status).
///
/// `vehicle_compatibility` is a precomputed offered-type -> score map (see
/// `MatchingConfig::compatible_vehicle_types`): geo stays ignorant of the
/// matrix itself and only consults the lookup the caller already built.
#[derive(Debug, Clone, Default)]
pub struct NearbyFilter {
    pub vehicle_compatibility: Option<HashMap<String, f64>>,
    pub required_features: Vec<String>,
}

impl NearbyFilter {
    fn admits(&self, driver: &Driver) -> bool {
        if let Some(compat) = &self.vehicle_compatibility {
            if !compat.contains_key(&driver.vehicle_type) {
                return false;
            }
        }
        self.required_features
            .iter()
            .all(|f| driver.features.contains(f))
    }

    /// Compatibility score for `driver`'s offered vehicle type, or `1.0`
    /// when this filter carries no vehicle-type constraint.
    pub fn vehicle_type_score(&self, driver: &Driver) -> f64 {
        self.vehicle_compatibility
            .as_ref()
            .and_then(|m| m.get(&driver.vehicle_type))
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyDriver {
    pub driver: Driver,
    pub distance_km: f64,
}

/// Result of a radius query, flagged if degraded rather than silently empty.
#[derive(Debug, Clone)]
pub struct NearbyResult {
    pub drivers: Vec<NearbyDriver>,
    pub degraded: bool,
}

pub struct GeoEngine {
    config: GeoConfig,
}

impl GeoEngine {
    pub fn new(config: GeoConfig) -> Self {
        Self { config }
    }

    pub fn distance(&self, a: Location, b: Location, method: DistanceMethod) -> CoreResult<f64> {
        distance::distance(a, b, method, self.config.r_earth_km)
    }

    pub fn geohash(&self, loc: Location, precision: usize) -> CoreResult<String> {
        distance::geohash_encode(loc, precision)
    }

    pub fn eta(
        &self,
        origin: Location,
        destination: Location,
        vehicle_type: &str,
        traffic_factor: f64,
    ) -> CoreResult<u64> {
        let distance_km = self.distance(origin, destination, DistanceMethod::Haversine)?;
        let avg_speed_kmh = self
            .config
            .avg_speed_kmh
            .get(vehicle_type)
            .copied()
            .unwrap_or(35.0);
        Ok(eta::eta_seconds(distance_km, avg_speed_kmh, traffic_factor))
    }

    /// Expanding bounding-box search over `index`'s geohash buckets, true
    /// distance filter, stable ascending-distance / driver-id tie-break.
    pub fn nearby_drivers(
        &self,
        index: &DriverIndex,
        center: Location,
        radius_km: f64,
        filter: &NearbyFilter,
        limit: usize,
        now: DateTime<Utc>,
    ) -> NearbyResult {
        let precision = index.bucket_precision();
        let center_hash = match distance::geohash_encode(center, precision) {
            Ok(h) => h,
            Err(_) => return NearbyResult { drivers: vec![], degraded: true },
        };
        let rings = rings_for_radius(radius_km, precision);
        let candidate_ids = index.query_rings(&center_hash, rings);

        let mut out: Vec<NearbyDriver> = Vec::new();
        for id in candidate_ids {
            let Some(driver) = index.get(id) else { continue };
            if driver.status != DriverStatus::Available {
                continue;
            }
            if is_stale(&driver, now, self.config.location_staleness_sec) {
                continue;
            }
            if !filter.admits(&driver) {
                continue;
            }
            let Ok(d_km) = distance::distance(
                center,
                driver.current_location,
                DistanceMethod::Haversine,
                self.config.r_earth_km,
            ) else {
                continue;
            };
            if d_km <= radius_km {
                out.push(NearbyDriver { driver, distance_km: d_km });
            }
        }
        out.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.driver.id.cmp(&b.driver.id))
        });
        out.truncate(limit);
        NearbyResult { drivers: out, degraded: false }
    }
}

pub fn is_stale(driver: &Driver, now: DateTime<Utc>, staleness_sec: u64) -> bool {
    (now - driver.last_location_update).num_seconds() > staleness_sec as i64
}

/// Approximate geohash cell width at each precision level, used to size the
/// ring expansion rather than vary the index's storage precision.
fn cell_width_km(precision: usize) -> f64 {
    match precision {
        1 => 5000.0,
        2 => 1250.0,
        3 => 156.0,
        4 => 39.0,
        5 => 4.9,
        6 => 1.2,
        7 => 0.153,
        8 => 0.038,
        _ => 0.0048,
    }
}

/// Number of neighbor rings around the center bucket needed to cover a
/// circle of `radius_km`, capped to avoid unbounded fan-out on bad input.
fn rings_for_radius(radius_km: f64, precision: usize) -> usize {
    let width = cell_width_km(precision);
    if width <= 0.0 {
        return 1;
    }
    ((radius_km / width).ceil() as usize).clamp(1, 16)
}

pub type SharedGeoEngine = Arc<GeoEngine>;

pub(crate) fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::InvalidArgument(msg.into())
}
