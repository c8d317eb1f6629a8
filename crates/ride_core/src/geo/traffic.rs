//! Pluggable traffic-factor provider (§4.A, supplemented per §10.8).
//!
//! The spec names a "pluggable provider" without specifying transport.
//! Generalizes the teacher's `osrm` feature (an HTTP routing-engine client,
//! feature-gated, degrading to a fallback on error) into a trait with a
//! default no-op implementation and an optional HTTP-backed one.

use super::distance::Location;
use async_trait::async_trait;

#[async_trait]
pub trait TrafficFactorProvider: Send + Sync {
    /// Returns a multiplicative factor in `[1.0, 2.0]`; `1.0` means no
    /// congestion. Implementations must never panic on transport failure —
    /// callers treat an `Err` as "disabled" and fall back to `1.0`.
    async fn traffic_factor(&self, origin: Location, destination: Location) -> Result<f64, String>;
}

/// Default provider: always reports no congestion, per §4.A "when disabled
/// returns 1.0".
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrafficFactorProvider;

#[async_trait]
impl TrafficFactorProvider for NoopTrafficFactorProvider {
    async fn traffic_factor(&self, _origin: Location, _destination: Location) -> Result<f64, String> {
        Ok(1.0)
    }
}

#[cfg(feature = "traffic-provider")]
pub use http_provider::HttpTrafficFactorProvider;

#[cfg(feature = "traffic-provider")]
mod http_provider {
    use super::*;

    /// Queries an external routing engine's congestion endpoint. Any
    /// transport or parse failure is surfaced as `Err`, never a panic; the
    /// caller is expected to fall back to `NoopTrafficFactorProvider`-style
    /// behavior when this returns an error.
    pub struct HttpTrafficFactorProvider {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpTrafficFactorProvider {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self { client: reqwest::Client::new(), base_url: base_url.into() }
        }
    }

    #[async_trait]
    impl TrafficFactorProvider for HttpTrafficFactorProvider {
        async fn traffic_factor(&self, origin: Location, destination: Location) -> Result<f64, String> {
            let url = format!(
                "{}/traffic?from={},{}&to={},{}",
                self.base_url, origin.lat, origin.lon, destination.lat, destination.lon
            );
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
            body.get("factor")
                .and_then(|v| v.as_f64())
                .map(|f| f.clamp(1.0, 2.0))
                .ok_or_else(|| "missing factor field".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn noop_provider_always_returns_one() {
        let p = NoopTrafficFactorProvider;
        let loc = Location { lat: 0.0, lon: 0.0, accuracy_m: None, captured_at: Utc::now() };
        assert_eq!(p.traffic_factor(loc, loc).await.unwrap(), 1.0);
    }
}
