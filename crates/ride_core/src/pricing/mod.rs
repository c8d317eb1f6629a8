//! Pricing engine (component E).

pub mod fare;

pub use fare::{Fare, FareBreakdown, FareRequest, PricingEngine, PromoContext};
