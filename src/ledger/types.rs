//! Domain types for the settlement and accounting engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ledger::error::LedgerError;

/// Order side, parsed case-insensitively from the wire (`"buy"`, `"SELL"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(LedgerError::InvalidAction(other.to_string())),
        }
    }
}

/// An incoming order request, exactly as the presentation layer submits it.
///
/// All fields are defaulted so that a request with missing fields
/// deserializes and is then rejected by engine validation instead of
/// failing opaquely at the extraction layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: Decimal,
}

impl OrderRequest {
    pub fn new(symbol: &str, action: &str, quantity: i64, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            action: action.to_string(),
            quantity,
            price,
        }
    }
}

/// Result of a settled order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub side: OrderSide,
    pub symbol: String,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
}

/// Transaction categories recorded in the ledger log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Buy,
    Sell,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "DEPOSIT"),
            TransactionKind::Buy => write!(f, "BUY"),
            TransactionKind::Sell => write!(f, "SELL"),
        }
    }
}

/// Immutable record appended on every funds or order event.
///
/// For deposits `symbol` carries the funding-source label, `price` the
/// deposited amount and `quantity` is 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, symbol: &str, price: Decimal, quantity: u64) -> Self {
        Self {
            kind,
            symbol: symbol.to_string(),
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregated holding of one symbol.
///
/// `quantity` is strictly positive while the entry exists; a position
/// reduced to zero is removed from the portfolio rather than kept around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_price: Decimal,
}

impl Position {
    /// Total invested cost at the current average: `quantity * average_price`.
    pub fn invested(&self) -> Decimal {
        Decimal::from(self.quantity) * self.average_price
    }
}

/// Point-in-time view of the whole ledger, returned by `report()`.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub portfolio: Vec<Position>,
    pub transactions: Vec<Transaction>,
}
