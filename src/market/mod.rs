//! Market data: quote providers and portfolio valuation.
//!
//! Consumed only by the reporting path. Settlement prices come from the
//! order request itself, never from here.

mod provider;
mod valuation;

pub use provider::{HttpQuoteProvider, MockQuoteProvider, Quote, QuoteError, QuoteProvider};
pub use valuation::{value_portfolio, PortfolioValuation, ValuedPosition};
