//! Unrealized P&L projection over the open portfolio.
//!
//! Each position is valued with its own isolated quote fetch: one
//! symbol's failed lookup cannot abort the others. On failure the
//! display price falls back to the position's own average cost, which
//! yields zero P&L and is flagged via `live = false` rather than being
//! silently wrong.

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::ledger::Position;
use crate::market::provider::QuoteProvider;
use crate::utils::decimal::{percent_change, round_to_precision};

/// A position joined with a current (or fallback) price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedPosition {
    pub symbol: String,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_price: Decimal,
    /// Last traded price, or the average cost when the quote failed.
    #[serde(with = "rust_decimal::serde::float")]
    pub last_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unrealized_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl_percent: Decimal,
    /// False when the fallback price is in use.
    pub live: bool,
}

/// Valuation of the full portfolio.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub positions: Vec<ValuedPosition>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_unrealized_pnl: Decimal,
}

/// Value every open position concurrently against the quote provider.
pub async fn value_portfolio(
    provider: &dyn QuoteProvider,
    positions: &[Position],
) -> PortfolioValuation {
    let valued = join_all(positions.iter().map(|p| value_position(provider, p))).await;
    let total_unrealized_pnl = valued.iter().map(|v| v.unrealized_pnl).sum();

    PortfolioValuation {
        positions: valued,
        total_unrealized_pnl,
    }
}

async fn value_position(provider: &dyn QuoteProvider, position: &Position) -> ValuedPosition {
    match provider.quote(&position.symbol).await {
        Ok(quote) => build_valued(position, quote.price, true),
        Err(err) => {
            warn!(
                symbol = %position.symbol,
                %err,
                "Quote unavailable, showing average cost"
            );
            build_valued(position, position.average_price, false)
        }
    }
}

fn build_valued(position: &Position, last_price: Decimal, live: bool) -> ValuedPosition {
    let unrealized_pnl = (last_price - position.average_price) * Decimal::from(position.quantity);
    let pnl_percent = percent_change(position.average_price, last_price);

    ValuedPosition {
        symbol: position.symbol.clone(),
        quantity: position.quantity,
        average_price: position.average_price,
        last_price,
        unrealized_pnl,
        pnl_percent: round_to_precision(pnl_percent, 2),
        live,
    }
}
