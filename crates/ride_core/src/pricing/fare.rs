//! Fare computation pipeline (component E, §4.E).

use crate::config::{PricingConfig, RateCard};
use crate::error::{CoreError, CoreResult};
use crate::geo::Location;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct FareRequest {
    pub vehicle_type: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub pickup: Location,
    pub time_of_day: DateTime<Utc>,
    pub user_id: String,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base: f64,
    pub distance: f64,
    pub time: f64,
    pub surge_delta: f64,
    pub promo_delta: f64,
    pub service_fee: f64,
    pub driver_earnings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fare {
    pub total: f64,
    pub surge: f64,
    pub breakdown: FareBreakdown,
    pub currency: String,
}

/// Promotion rule inputs external to the fare pipeline itself; kept
/// separate so callers (the orchestrator, the estimate endpoint) can supply
/// them without this module reaching into user/loyalty services directly.
#[derive(Debug, Clone, Default)]
pub struct PromoContext {
    pub completed_trip_count: u32,
    pub loyalty_discount: f64,
    pub promo_code_discount: f64,
    pub time_based_discount: f64,
}

impl PromoContext {
    fn total_discount(&self, max_discount: f64) -> f64 {
        let mut total = 0.0;
        if self.completed_trip_count == 0 {
            total += 0.10;
        }
        total += self.loyalty_discount;
        total += self.promo_code_discount;
        total += self.time_based_discount;
        total.clamp(0.0, max_discount)
    }
}

pub struct PricingEngine<'a> {
    config: &'a PricingConfig,
}

impl<'a> PricingEngine<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    fn rate_card(&self, vehicle_type: &str) -> CoreResult<&RateCard> {
        self.config
            .rate_cards
            .get(vehicle_type)
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown vehicle_type: {vehicle_type}")))
    }

    pub fn fare(
        &self,
        request: &FareRequest,
        surge_multiplier: f64,
        promo: &PromoContext,
    ) -> CoreResult<Fare> {
        let card = self.rate_card(&request.vehicle_type)?;

        let base = card.base_fare;
        let distance = request.distance_km * card.per_km;
        let time = request.duration_min * card.per_min;
        let mut subtotal = base + distance + time;
        subtotal = subtotal.max(card.minimum);

        let after_surge = subtotal * surge_multiplier;
        let surge_delta = after_surge - subtotal;

        let time_mul = time_of_day_multiplier(request.time_of_day);
        let before_promo = after_surge * time_mul;

        let promo_disc = promo.total_discount(self.config.max_discount);
        let after_promo = before_promo * (1.0 - promo_disc);
        let promo_delta = before_promo - after_promo;

        let service_fee = after_promo * card.service_fee_pct;
        let driver_earnings = after_promo - service_fee;

        let total = round_cents(after_promo.max(self.config.global_min_fare));

        Ok(Fare {
            total,
            surge: surge_multiplier,
            breakdown: FareBreakdown {
                base,
                distance,
                time,
                surge_delta,
                promo_delta,
                service_fee: round_cents(service_fee),
                driver_earnings: round_cents(driver_earnings),
            },
            currency: "USD".to_string(),
        })
    }
}

/// Weekend +10%, AM rush (7-9) +15%, PM rush (17-19) +20%, late night
/// (23-5) +25%, else 1.0. Multiplicative with surge.
fn time_of_day_multiplier(at: DateTime<Utc>) -> f64 {
    let weekday = matches!(
        at.weekday(),
        chrono::Weekday::Sat | chrono::Weekday::Sun
    );
    let hour = at.hour();
    let am_rush = (7..9).contains(&hour);
    let pm_rush = (17..19).contains(&hour);
    let late_night = hour >= 23 || hour < 5;

    let mut mul = 1.0;
    if weekday {
        mul *= 1.10;
    }
    if am_rush {
        mul *= 1.15;
    } else if pm_rush {
        mul *= 1.20;
    } else if late_night {
        mul *= 1.25;
    }
    mul
}

/// Round to the nearest cent using banker's rounding (round-half-to-even)
/// so repeated fare recomputation does not drift upward.
fn round_cents(amount: f64) -> f64 {
    let scaled = amount * 100.0;
    let floor = scaled.floor();
    let diff = scaled - floor;
    let rounded = if (diff - 0.5).abs() < 1e-9 {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / 100.0
}
