//! Typed errors for the ledger engine.
//!
//! Engine errors are returned, never panicked, and every variant renders
//! as a short message suitable for direct display to the end user. A
//! failed operation leaves the ledger untouched.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by `LedgerEngine` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Deposit amount was missing, zero or negative.
    #[error("Invalid amount: deposit must be a positive number")]
    InvalidAmount,

    /// Order fields missing or malformed (empty symbol, non-positive
    /// quantity or price).
    #[error("Invalid order: {0}")]
    InvalidOrder(&'static str),

    /// Action was present but neither BUY nor SELL.
    #[error("Invalid action '{0}': expected BUY or SELL")]
    InvalidAction(String),

    /// A BUY whose total cost exceeds the wallet balance.
    #[error("Insufficient funds: order costs {required}, wallet holds {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// A SELL against a symbol with no open position.
    #[error("No open position for {0}")]
    NoPosition(String),

    /// A SELL for more units than currently held.
    #[error("Insufficient holdings: requested {requested}, holding {held}")]
    InsufficientHoldings { requested: u64, held: u64 },
}
