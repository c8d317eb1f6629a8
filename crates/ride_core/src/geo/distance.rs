//! Distance and geohash primitives.
//!
//! Haversine is hand-rolled the way the teacher's `spatial.rs` hand-rolls it
//! over H3 cell centers, generalized here to plain lat/lon `Location`
//! points. Geohash encoding is delegated to the `geohash` crate rather than
//! H3, since the spec pins down base-32 geohash strings and the prefix
//! property directly.

use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Location {
    pub fn new(lat: f64, lon: f64, captured_at: DateTime<Utc>) -> CoreResult<Self> {
        validate(lat, lon)?;
        Ok(Self { lat, lon, accuracy_m: None, captured_at })
    }
}

fn validate(lat: f64, lon: f64) -> CoreResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(super::invalid(format!("latitude out of range: {lat}")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(super::invalid(format!("longitude out of range: {lon}")));
    }
    if !lat.is_finite() || !lon.is_finite() {
        return Err(super::invalid("non-finite coordinate"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMethod {
    Haversine,
    Manhattan,
    Euclidean,
}

pub fn distance(a: Location, b: Location, method: DistanceMethod, r_earth_km: f64) -> CoreResult<f64> {
    validate(a.lat, a.lon)?;
    validate(b.lat, b.lon)?;
    Ok(match method {
        DistanceMethod::Haversine => haversine_km(a, b, r_earth_km),
        DistanceMethod::Manhattan => manhattan_km(a, b, r_earth_km),
        DistanceMethod::Euclidean => euclidean_km(a, b, r_earth_km),
    })
}

fn haversine_km(a: Location, b: Location, r_earth_km: f64) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();
    r_earth_km * c
}

/// Great-circle "manhattan" distance: sum of a pure-latitude and a
/// pure-longitude haversine leg. The longitude leg is measured at the
/// midpoint latitude so the result does not depend on argument order.
fn manhattan_km(a: Location, b: Location, r_earth_km: f64) -> f64 {
    let mid_lat = (a.lat + b.lat) / 2.0;
    let lat_leg = Location { lat: b.lat, lon: a.lon, ..a };
    let lon_leg_from = Location { lat: mid_lat, lon: a.lon, ..a };
    let lon_leg_to = Location { lat: mid_lat, lon: b.lon, ..a };
    haversine_km(a, lat_leg, r_earth_km) + haversine_km(lon_leg_from, lon_leg_to, r_earth_km)
}

/// Flat-earth approximation, valid only over short distances; useful as a
/// cheap lower-cost estimate when haversine's trig cost matters. The
/// longitude leg is scaled by the midpoint latitude's cosine so the result
/// does not depend on argument order.
fn euclidean_km(a: Location, b: Location, r_earth_km: f64) -> f64 {
    let mid_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let dlat_km = (b.lat - a.lat).to_radians() * r_earth_km;
    let dlon_km = (b.lon - a.lon).to_radians() * r_earth_km * mid_lat.cos();
    (dlat_km * dlat_km + dlon_km * dlon_km).sqrt()
}

pub fn geohash_encode(loc: Location, precision: usize) -> CoreResult<String> {
    validate(loc.lat, loc.lon)?;
    let coord = geohash::Coord { x: loc.lon, y: loc.lat };
    geohash::encode(coord, precision)
        .map_err(|e| super::invalid(format!("geohash encode failed: {e}")))
}
