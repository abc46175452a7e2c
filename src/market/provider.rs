//! Quote providers: the external price source consumed by the reporting
//! path.
//!
//! Settlement never calls a provider; quotes exist only for display and
//! unrealized P&L. Providers give no staleness guarantee and no schema
//! beyond a numeric price.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::utils::decimal::round_to_precision;

/// Errors from a quote lookup. Confined to the reporting path;
/// settlement never depends on a quote.
#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("Quote unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },
}

impl QuoteError {
    pub fn unavailable(symbol: &str, reason: impl ToString) -> Self {
        Self::Unavailable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A current price observation for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Day change as reported by the source; zero when unknown.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub change: Decimal,
}

/// Source of current instrument prices.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// Wire shape accepted from an upstream quote endpoint. `price` may come
/// as a number or a string; `rust_decimal`'s deserializer takes both.
#[derive(Debug, Deserialize)]
struct QuoteBody {
    price: Decimal,
    #[serde(default)]
    change: Option<Decimal>,
}

/// Quote provider backed by an HTTP endpoint (`{base_url}/{symbol}`).
pub struct HttpQuoteProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpQuoteProvider {
    /// Create a provider with a hard request timeout. Lookups past the
    /// timeout surface as `QuoteError::Unavailable`, never hang.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url: String = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let url = format!("{}/{}", self.base_url, symbol);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::unavailable(symbol, e))?
            .error_for_status()
            .map_err(|e| QuoteError::unavailable(symbol, e))?;

        let body: QuoteBody = response
            .json()
            .await
            .map_err(|e| QuoteError::unavailable(symbol, e))?;

        debug!(%symbol, price = %body.price, "Quote fetched");

        Ok(Quote {
            symbol: symbol.to_string(),
            price: body.price,
            change: body.change.unwrap_or(Decimal::ZERO),
        })
    }
}

/// Mock provider returning noise in a configurable band, for running the
/// simulator without any upstream source.
pub struct MockQuoteProvider {
    price_floor: Decimal,
    price_band: Decimal,
}

impl MockQuoteProvider {
    pub fn new(price_floor: Decimal, price_band: Decimal) -> Self {
        Self {
            price_floor,
            price_band,
        }
    }
}

impl Default for MockQuoteProvider {
    fn default() -> Self {
        Self::new(Decimal::from(2000), Decimal::from(1000))
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let mut rng = rand::rng();
        let offset = Decimal::from_f64_retain(rng.random_range(0.0..1.0))
            .unwrap_or(Decimal::ZERO);
        let change = Decimal::from_f64_retain(rng.random_range(-10.0..10.0))
            .unwrap_or(Decimal::ZERO);

        Ok(Quote {
            symbol: symbol.to_string(),
            price: round_to_precision(self.price_floor + offset * self.price_band, 2),
            change: round_to_precision(change, 2),
        })
    }
}
