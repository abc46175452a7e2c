//! The ledger engine: wallet balance, position set and transaction log.
//!
//! Everything here is process-lifetime state mutated exclusively through
//! [`LedgerEngine`]. No other code path touches the balance, the
//! portfolio or the log.

mod engine;
mod error;
mod types;

pub use engine::{LedgerEngine, LedgerState, DEFAULT_DEPOSIT_SOURCE};
pub use error::LedgerError;
pub use types::{
    Fill, LedgerSnapshot, OrderRequest, OrderSide, Position, Transaction, TransactionKind,
};
