//! Fixture builders shared by this crate's tests and by `ride_service`,
//! mirroring the teacher's own `test_helpers` module (kept behind the same
//! `test-helpers` default feature).

use crate::config::RideCoreConfig;
use crate::dispatch::driver::{Driver, DriverStatus};
use crate::geo::Location;
use crate::ids::{DriverId, RiderId};
use chrono::Utc;

pub fn sample_location(lat: f64, lon: f64) -> Location {
    Location { lat, lon, accuracy_m: None, captured_at: Utc::now() }
}

pub fn sample_driver(vehicle_type: &str, lat: f64, lon: f64) -> Driver {
    let mut driver = Driver::new(DriverId::new(), vehicle_type, 4.8, sample_location(lat, lon));
    driver.status = DriverStatus::Available;
    driver
}

pub fn sample_rider_id() -> RiderId {
    RiderId::new()
}

pub fn sample_config() -> RideCoreConfig {
    RideCoreConfig::default()
}
