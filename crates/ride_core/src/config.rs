//! Coordination-core configuration.
//!
//! A single immutable struct built once at startup and shared via `Arc`,
//! following the nested-sub-structs-with-serde-defaults shape used for
//! `Config` in the ambient web-service stack this workspace is grounded on.
//! Layering (defaults -> optional file -> environment) is done with the
//! `config` crate; nothing here reads a process-global.

use serde::Deserialize;
use std::collections::HashMap;

fn default_r_earth_km() -> f64 {
    6371.0088
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_r_earth_km")]
    pub r_earth_km: f64,
    #[serde(default = "default_location_staleness_sec")]
    pub location_staleness_sec: u64,
    #[serde(default)]
    pub avg_speed_kmh: HashMap<String, f64>,
}

fn default_location_staleness_sec() -> u64 {
    120
}

impl Default for GeoConfig {
    fn default() -> Self {
        let mut avg_speed_kmh = HashMap::new();
        for (vt, kmh) in [
            ("economy", 35.0),
            ("standard", 35.0),
            ("premium", 38.0),
            ("luxury", 38.0),
            ("suv", 33.0),
            ("accessible", 30.0),
            ("electric", 36.0),
        ] {
            avg_speed_kmh.insert(vt.to_string(), kmh);
        }
        Self {
            r_earth_km: default_r_earth_km(),
            location_staleness_sec: default_location_staleness_sec(),
            avg_speed_kmh,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_r0")]
    pub r0_km: f64,
    #[serde(default = "default_rmax")]
    pub rmax_km: f64,
    #[serde(default = "default_step")]
    pub step_km: f64,
    #[serde(default = "default_max_cand")]
    pub max_candidates: usize,
    #[serde(default = "default_deadline_sec")]
    pub deadline_sec: u64,
    #[serde(default = "default_w_dist")]
    pub w_distance: f64,
    #[serde(default = "default_w_rat")]
    pub w_rating: f64,
    #[serde(default = "default_w_avail")]
    pub w_availability: f64,
    #[serde(default = "default_w_vtyp")]
    pub w_vehicle_type: f64,
    #[serde(default = "default_true")]
    pub fairness_enabled: bool,
    #[serde(default = "default_fairness_min")]
    pub fairness_min: f64,
    #[serde(default = "default_fairness_window_min")]
    pub fairness_window_min: i64,
    #[serde(default = "default_n_fair")]
    pub n_fair: u32,
    #[serde(default = "default_lambda")]
    pub fairness_lambda: f64,
    /// `requested -> offered -> score` lookup for non-exact vehicle-type
    /// matches. Exact matches always score 1.0 regardless of this table;
    /// an offered type absent from the requested type's row (or scoring
    /// 0.0) is filtered out as incompatible.
    #[serde(default = "default_vehicle_compatibility")]
    pub vehicle_compatibility: HashMap<String, HashMap<String, f64>>,
}

fn default_vehicle_compatibility() -> HashMap<String, HashMap<String, f64>> {
    fn row(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(vt, s)| (vt.to_string(), *s)).collect()
    }
    let mut m = HashMap::new();
    m.insert("economy".to_string(), row(&[("standard", 0.8), ("electric", 0.7)]));
    m.insert("standard".to_string(), row(&[("premium", 0.7), ("suv", 0.6), ("electric", 0.8), ("economy", 0.5)]));
    m.insert("premium".to_string(), row(&[("luxury", 0.6), ("standard", 0.4)]));
    m.insert("luxury".to_string(), row(&[("premium", 0.5)]));
    m.insert("suv".to_string(), row(&[("standard", 0.5)]));
    m.insert("accessible".to_string(), row(&[]));
    m.insert("electric".to_string(), row(&[("standard", 0.6)]));
    m
}

impl MatchingConfig {
    /// Compatibility score for offering a driver of `offered`'s vehicle
    /// type against a rider's `requested` one. `None` means the hard
    /// filter rejects the pairing outright.
    pub fn vehicle_compatibility_score(&self, requested: &str, offered: &str) -> Option<f64> {
        if requested == offered {
            return Some(1.0);
        }
        self.vehicle_compatibility
            .get(requested)
            .and_then(|row| row.get(offered))
            .copied()
            .filter(|s| *s > 0.0)
    }

    /// Full offered-type -> score map for a request's `requested` vehicle
    /// type, including the exact match itself. Hands the hard filter and
    /// the scoring step a single precomputed lookup.
    pub fn compatible_vehicle_types(&self, requested: &str) -> HashMap<String, f64> {
        let mut m = self.vehicle_compatibility.get(requested).cloned().unwrap_or_default();
        m.retain(|_, s| *s > 0.0);
        m.insert(requested.to_string(), 1.0);
        m
    }
}

fn default_r0() -> f64 {
    3.0
}
fn default_rmax() -> f64 {
    15.0
}
fn default_step() -> f64 {
    1.0
}
fn default_max_cand() -> usize {
    50
}
fn default_deadline_sec() -> u64 {
    30
}
fn default_w_dist() -> f64 {
    0.4
}
fn default_w_rat() -> f64 {
    0.3
}
fn default_w_avail() -> f64 {
    0.2
}
fn default_w_vtyp() -> f64 {
    0.1
}
fn default_true() -> bool {
    true
}
fn default_fairness_min() -> f64 {
    0.3
}
fn default_fairness_window_min() -> i64 {
    60
}
fn default_n_fair() -> u32 {
    5
}
fn default_lambda() -> f64 {
    0.5
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            r0_km: default_r0(),
            rmax_km: default_rmax(),
            step_km: default_step(),
            max_candidates: default_max_cand(),
            deadline_sec: default_deadline_sec(),
            w_distance: default_w_dist(),
            w_rating: default_w_rat(),
            w_availability: default_w_avail(),
            w_vehicle_type: default_w_vtyp(),
            fairness_enabled: default_true(),
            fairness_min: default_fairness_min(),
            fairness_window_min: default_fairness_window_min(),
            n_fair: default_n_fair(),
            fairness_lambda: default_lambda(),
            vehicle_compatibility: default_vehicle_compatibility(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurgeConfig {
    #[serde(default = "default_surge_low")]
    pub low: f64,
    #[serde(default = "default_surge_high")]
    pub high: f64,
    #[serde(default = "default_surge_base")]
    pub base: f64,
    #[serde(default = "default_surge_max")]
    pub max: f64,
    #[serde(default = "default_surge_tick_sec")]
    pub tick_sec: u64,
    #[serde(default = "default_backlog_window_sec")]
    pub backlog_window_sec: i64,
    #[serde(default = "default_zone_precision")]
    pub zone_precision: usize,
}

fn default_surge_low() -> f64 {
    1.5
}
fn default_surge_high() -> f64 {
    3.0
}
fn default_surge_base() -> f64 {
    1.8
}
fn default_surge_max() -> f64 {
    5.0
}
fn default_surge_tick_sec() -> u64 {
    5
}
fn default_backlog_window_sec() -> i64 {
    120
}
fn default_zone_precision() -> usize {
    6
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self {
            low: default_surge_low(),
            high: default_surge_high(),
            base: default_surge_base(),
            max: default_surge_max(),
            tick_sec: default_surge_tick_sec(),
            backlog_window_sec: default_backlog_window_sec(),
            zone_precision: default_zone_precision(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateCard {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_min: f64,
    pub minimum: f64,
    pub service_fee_pct: f64,
    pub cancellation_fee: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_global_min_fare")]
    pub global_min_fare: f64,
    #[serde(default = "default_max_discount")]
    pub max_discount: f64,
    #[serde(default)]
    pub rate_cards: HashMap<String, RateCard>,
}

fn default_global_min_fare() -> f64 {
    3.0
}
fn default_max_discount() -> f64 {
    0.25
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut rate_cards = HashMap::new();
        for vt in [
            "economy",
            "standard",
            "premium",
            "luxury",
            "suv",
            "accessible",
            "electric",
        ] {
            rate_cards.insert(
                vt.to_string(),
                RateCard {
                    base_fare: 2.50,
                    per_km: 1.20,
                    per_min: 0.25,
                    minimum: 5.0,
                    service_fee_pct: 0.20,
                    cancellation_fee: 5.0,
                },
            );
        }
        Self {
            global_min_fare: default_global_min_fare(),
            max_discount: default_max_discount(),
            rate_cards,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    #[serde(default = "default_reserve_ttl_sec")]
    pub ttl_sec: u64,
}

fn default_reserve_ttl_sec() -> u64 {
    30
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            ttl_sec: default_reserve_ttl_sec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripConfig {
    #[serde(default = "default_confirm_timeout_sec")]
    pub driver_confirmation_timeout_sec: u64,
}

fn default_confirm_timeout_sec() -> u64 {
    15
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            driver_confirmation_timeout_sec: default_confirm_timeout_sec(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideCoreConfig {
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub surge: SurgeConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub reservation: ReservationConfig,
    #[serde(default)]
    pub trip: TripConfig,
}

impl RideCoreConfig {
    /// Layers defaults -> an optional TOML file -> `RIDE_*` environment
    /// variables, the way the ambient web-service stack this crate is
    /// grounded on loads its own `Config`.
    pub fn load(file_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("RIDE")
                .separator("__")
                .try_parsing(true),
        );
        let merged = builder.build()?;
        match merged.try_deserialize::<Self>() {
            Ok(cfg) => Ok(cfg),
            Err(_) => Ok(Self::default()),
        }
    }
}
