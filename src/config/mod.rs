//! Configuration management for the paper-trading simulator.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Wallet bootstrap settings
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Quote provider settings
    #[serde(default)]
    pub quotes: QuoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Balance the wallet starts with at process start
    #[serde(default = "default_opening_balance")]
    pub opening_balance: Decimal,
    /// Funding-source label for deposits that do not name one
    #[serde(default = "default_deposit_source")]
    pub deposit_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Serve mocked quotes instead of calling an upstream source
    #[serde(default = "default_mock")]
    pub mock: bool,
    /// Upstream quote endpoint, used when `mock` is off
    #[serde(default)]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Lowest mocked price
    #[serde(default = "default_price_floor")]
    pub price_floor: Decimal,
    /// Width of the mocked price band above the floor
    #[serde(default = "default_price_band")]
    pub price_band: Decimal,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_opening_balance() -> Decimal {
    Decimal::new(5000, 0)
}

fn default_deposit_source() -> String {
    crate::ledger::DEFAULT_DEPOSIT_SOURCE.to_string()
}

fn default_mock() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_price_floor() -> Decimal {
    Decimal::new(2000, 0)
}

fn default_price_band() -> Decimal {
    Decimal::new(1000, 0)
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("PL"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.wallet.opening_balance >= Decimal::ZERO,
            "opening_balance must not be negative"
        );

        anyhow::ensure!(
            self.quotes.timeout_secs >= 1,
            "quote timeout_secs must be at least 1"
        );

        anyhow::ensure!(
            self.quotes.mock || !self.quotes.base_url.is_empty(),
            "quotes.base_url is required when quotes.mock is off"
        );

        anyhow::ensure!(
            self.quotes.price_band > Decimal::ZERO,
            "quotes.price_band must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            wallet: WalletConfig::default(),
            quotes: QuoteConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            opening_balance: default_opening_balance(),
            deposit_source: default_deposit_source(),
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            mock: default_mock(),
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            price_floor: default_price_floor(),
            price_band: default_price_band(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_live_quotes_require_base_url() {
        let mut config = Config::default();
        config.quotes.mock = false;

        assert!(config.validate().is_err());

        config.quotes.base_url = "http://127.0.0.1:9000/api/quote".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_opening_balance_is_rejected() {
        let mut config = Config::default();
        config.wallet.opening_balance = Decimal::new(-1, 0);

        assert!(config.validate().is_err());
    }
}
