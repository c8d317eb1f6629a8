//! Payment capability abstraction (§9).
//!
//! A trait at the seam, pure construction (no global registry), variant
//! implementations selected by config at startup — the same shape the
//! matching engine's `TrafficFactorProvider` uses for its external seam.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub trip_id: String,
    pub user_id: String,
    pub amount_cents: u64,
    pub currency: String,
    pub method_token: String,
}

#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Ok { tx_id: String },
    Declined { decline_code: String },
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentOutcome, String>;
    async fn refund(&self, tx_id: &str) -> Result<(), String>;
    fn verify_webhook(&self, signature: &str, body: &[u8]) -> bool;
}

/// In-memory stub that always succeeds; the default for tests and for the
/// demo binary where no real payment gateway is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalletPaymentProvider;

#[async_trait]
impl PaymentProvider for WalletPaymentProvider {
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentOutcome, String> {
        Ok(PaymentOutcome::Ok { tx_id: format!("wallet-{}", request.trip_id) })
    }

    async fn refund(&self, _tx_id: &str) -> Result<(), String> {
        Ok(())
    }

    fn verify_webhook(&self, _signature: &str, _body: &[u8]) -> bool {
        true
    }
}

/// Stub standing in for a real Stripe integration (out of scope per §1's
/// Non-goals: payment-provider-specific logic). Declines every request so
/// callers exercise the `PaymentDeclined` path without a live credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripePaymentProvider;

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    async fn process(&self, _request: &PaymentRequest) -> Result<PaymentOutcome, String> {
        Ok(PaymentOutcome::Declined { decline_code: "not_configured".to_string() })
    }

    async fn refund(&self, _tx_id: &str) -> Result<(), String> {
        Err("stripe provider not configured".to_string())
    }

    fn verify_webhook(&self, _signature: &str, _body: &[u8]) -> bool {
        false
    }
}

/// Stub standing in for a real PayPal integration, same rationale as
/// `StripePaymentProvider`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayPalPaymentProvider;

#[async_trait]
impl PaymentProvider for PayPalPaymentProvider {
    async fn process(&self, _request: &PaymentRequest) -> Result<PaymentOutcome, String> {
        Ok(PaymentOutcome::Declined { decline_code: "not_configured".to_string() })
    }

    async fn refund(&self, _tx_id: &str) -> Result<(), String> {
        Err("paypal provider not configured".to_string())
    }

    fn verify_webhook(&self, _signature: &str, _body: &[u8]) -> bool {
        false
    }
}
