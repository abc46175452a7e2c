//! Order-settlement and portfolio-accounting engine.
//!
//! Owns the wallet balance, the position set and the append-only
//! transaction log. All three live behind a single lock and are mutated
//! only through [`LedgerEngine`] operations: either a full transition
//! commits, or nothing changes.
//!
//! Settlement trusts the price carried in the order request and never
//! consults a quote provider. A client can therefore submit an arbitrary
//! execution price; acceptable for a simulator, but it is a trust
//! boundary worth knowing about.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    Fill, LedgerSnapshot, OrderRequest, OrderSide, Position, Transaction, TransactionKind,
};

/// Funding-source label used when a deposit does not name one.
pub const DEFAULT_DEPOSIT_SOURCE: &str = "GAME_REWARD";

/// Mutable ledger state. Created once per process, never persisted.
#[derive(Debug)]
pub struct LedgerState {
    pub opening_balance: Decimal,
    pub balance: Decimal,
    pub positions: HashMap<String, Position>,
    pub transactions: Vec<Transaction>,
}

impl LedgerState {
    fn new(opening_balance: Decimal) -> Self {
        Self {
            opening_balance,
            balance: opening_balance,
            positions: HashMap::new(),
            transactions: Vec::new(),
        }
    }
}

/// The ledger engine. Cheap to clone via `Arc`; every operation locks the
/// whole state for its read-modify-write, so concurrent callers serialize.
pub struct LedgerEngine {
    state: Arc<RwLock<LedgerState>>,
    deposit_source: String,
}

impl LedgerEngine {
    /// Create an engine with the given opening balance.
    pub fn new(opening_balance: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::new(opening_balance))),
            deposit_source: DEFAULT_DEPOSIT_SOURCE.to_string(),
        }
    }

    /// Override the default funding-source label for unlabeled deposits.
    pub fn with_deposit_source(mut self, source: impl Into<String>) -> Self {
        self.deposit_source = source.into();
        self
    }

    /// Current wallet balance.
    pub async fn balance(&self) -> Decimal {
        self.state.read().await.balance
    }

    /// Credit funds to the wallet and record a DEPOSIT transaction.
    ///
    /// The transaction carries `price = amount` and `quantity = 1`, with
    /// the source label (or the configured default) in the symbol field.
    /// Returns the new balance.
    pub async fn deposit(
        &self,
        amount: Decimal,
        source: Option<&str>,
    ) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let label = source.unwrap_or(&self.deposit_source).to_string();

        let mut state = self.state.write().await;
        state.balance += amount;
        state
            .transactions
            .push(Transaction::new(TransactionKind::Deposit, &label, amount, 1));

        info!(
            %amount,
            source = %label,
            new_balance = %state.balance,
            "Funds deposited"
        );

        Ok(state.balance)
    }

    /// Settle a BUY or SELL order atomically.
    ///
    /// Validation happens before any state is touched; the funds and
    /// holdings checks happen under the write guard so two concurrent
    /// orders cannot both spend the same balance.
    pub async fn execute_order(&self, order: &OrderRequest) -> Result<Fill, LedgerError> {
        let symbol = order.symbol.trim();
        if symbol.is_empty() {
            return Err(LedgerError::InvalidOrder("missing symbol"));
        }
        if order.action.trim().is_empty() {
            return Err(LedgerError::InvalidOrder("missing action"));
        }
        if order.quantity <= 0 {
            return Err(LedgerError::InvalidOrder(
                "quantity must be a positive integer",
            ));
        }
        if order.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidOrder("price must be positive"));
        }

        let side: OrderSide = order.action.parse()?;
        let quantity = order.quantity as u64;
        let total_cost = order.price * Decimal::from(quantity);

        let mut state = self.state.write().await;
        match side {
            OrderSide::Buy => Self::settle_buy(&mut state, symbol, quantity, order.price, total_cost),
            OrderSide::Sell => {
                Self::settle_sell(&mut state, symbol, quantity, order.price, total_cost)
            }
        }
    }

    fn settle_buy(
        state: &mut LedgerState,
        symbol: &str,
        quantity: u64,
        price: Decimal,
        total_cost: Decimal,
    ) -> Result<Fill, LedgerError> {
        if total_cost > state.balance {
            return Err(LedgerError::InsufficientFunds {
                required: total_cost,
                available: state.balance,
            });
        }

        state.balance -= total_cost;

        match state.positions.get_mut(symbol) {
            Some(position) => {
                // Weighted average over total invested cost, not a price
                // average: exact under successive partial buys regardless
                // of order.
                let invested = position.invested() + total_cost;
                position.quantity += quantity;
                position.average_price = invested / Decimal::from(position.quantity);
            }
            None => {
                state.positions.insert(
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        quantity,
                        average_price: price,
                    },
                );
            }
        }

        state
            .transactions
            .push(Transaction::new(TransactionKind::Buy, symbol, price, quantity));

        let position = &state.positions[symbol];
        debug!(
            %symbol,
            quantity,
            %price,
            held = position.quantity,
            average_price = %position.average_price,
            balance = %state.balance,
            "BUY settled"
        );

        Ok(Fill {
            side: OrderSide::Buy,
            symbol: symbol.to_string(),
            quantity,
            price,
            new_balance: state.balance,
        })
    }

    fn settle_sell(
        state: &mut LedgerState,
        symbol: &str,
        quantity: u64,
        price: Decimal,
        total_cost: Decimal,
    ) -> Result<Fill, LedgerError> {
        // Read the held quantity first so failures happen before any
        // mutation.
        let held = match state.positions.get(symbol) {
            Some(position) => position.quantity,
            None => return Err(LedgerError::NoPosition(symbol.to_string())),
        };
        if held < quantity {
            return Err(LedgerError::InsufficientHoldings {
                requested: quantity,
                held,
            });
        }

        state.balance += total_cost;

        // Average cost basis only changes on BUY; a SELL just reduces the
        // quantity, removing the entry entirely at zero.
        let remaining = held - quantity;
        if remaining == 0 {
            state.positions.remove(symbol);
        } else if let Some(position) = state.positions.get_mut(symbol) {
            position.quantity = remaining;
        }

        state
            .transactions
            .push(Transaction::new(TransactionKind::Sell, symbol, price, quantity));

        debug!(
            %symbol,
            quantity,
            %price,
            remaining,
            balance = %state.balance,
            "SELL settled"
        );

        Ok(Fill {
            side: OrderSide::Sell,
            symbol: symbol.to_string(),
            quantity,
            price,
            new_balance: state.balance,
        })
    }

    /// Snapshot of balance, portfolio and transaction log. Pure read.
    ///
    /// Positions are returned sorted by symbol so collaborators see a
    /// stable ordering.
    pub async fn report(&self) -> LedgerSnapshot {
        let state = self.state.read().await;
        let mut portfolio: Vec<Position> = state.positions.values().cloned().collect();
        portfolio.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        LedgerSnapshot {
            balance: state.balance,
            portfolio,
            transactions: state.transactions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy(symbol: &str, quantity: i64, price: Decimal) -> OrderRequest {
        OrderRequest::new(symbol, "BUY", quantity, price)
    }

    fn sell(symbol: &str, quantity: i64, price: Decimal) -> OrderRequest {
        OrderRequest::new(symbol, "SELL", quantity, price)
    }

    // =========================================================================
    // Deposit Tests
    // =========================================================================

    #[tokio::test]
    async fn test_deposit_increases_balance() {
        let engine = LedgerEngine::new(dec!(0));

        let balance = engine.deposit(dec!(1000), None).await.unwrap();
        assert_eq!(balance, dec!(1000));

        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(1000));
        assert_eq!(snapshot.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_deposit_records_default_source_label() {
        let engine = LedgerEngine::new(dec!(0));
        engine.deposit(dec!(1000), None).await.unwrap();

        let snapshot = engine.report().await;
        let tx = &snapshot.transactions[0];
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert_eq!(tx.symbol, DEFAULT_DEPOSIT_SOURCE);
        assert_eq!(tx.price, dec!(1000));
        assert_eq!(tx.quantity, 1);
    }

    #[tokio::test]
    async fn test_deposit_with_explicit_source() {
        let engine = LedgerEngine::new(dec!(0));
        engine.deposit(dec!(250), Some("QUIZ_PRIZE")).await.unwrap();

        let snapshot = engine.report().await;
        assert_eq!(snapshot.transactions[0].symbol, "QUIZ_PRIZE");
    }

    #[tokio::test]
    async fn test_deposit_with_configured_source() {
        let engine = LedgerEngine::new(dec!(0)).with_deposit_source("DAILY_BONUS");
        engine.deposit(dec!(50), None).await.unwrap();

        let snapshot = engine.report().await;
        assert_eq!(snapshot.transactions[0].symbol, "DAILY_BONUS");
    }

    #[tokio::test]
    async fn test_deposit_rejects_non_positive_amounts() {
        let engine = LedgerEngine::new(dec!(100));

        assert_eq!(
            engine.deposit(dec!(0), None).await.unwrap_err(),
            LedgerError::InvalidAmount
        );
        assert_eq!(
            engine.deposit(dec!(-10), None).await.unwrap_err(),
            LedgerError::InvalidAmount
        );

        // No mutation, no transaction.
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(100));
        assert!(snapshot.transactions.is_empty());
    }

    // =========================================================================
    // BUY Settlement Tests
    // =========================================================================

    #[tokio::test]
    async fn test_buy_opens_position_and_debits_wallet() {
        let engine = LedgerEngine::new(dec!(5000));

        let fill = engine
            .execute_order(&buy("RELIANCE", 2, dec!(2500)))
            .await
            .unwrap();
        assert_eq!(fill.new_balance, dec!(0));

        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(0));
        assert_eq!(snapshot.portfolio.len(), 1);
        assert_eq!(snapshot.portfolio[0].quantity, 2);
        assert_eq!(snapshot.portfolio[0].average_price, dec!(2500));
    }

    #[tokio::test]
    async fn test_buy_merges_into_weighted_average() {
        let engine = LedgerEngine::new(dec!(10000));

        engine
            .execute_order(&buy("TCS", 2, dec!(1000)))
            .await
            .unwrap();
        engine
            .execute_order(&buy("TCS", 2, dec!(2000)))
            .await
            .unwrap();

        let snapshot = engine.report().await;
        let position = &snapshot.portfolio[0];
        // (2*1000 + 2*2000) / 4 = 1500
        assert_eq!(position.quantity, 4);
        assert_eq!(position.average_price, dec!(1500));
        assert_eq!(snapshot.balance, dec!(4000));
    }

    #[tokio::test]
    async fn test_average_cost_is_order_independent() {
        let fills = [(3u64, dec!(2100)), (1, dec!(2400)), (5, dec!(1980))];

        let forward = LedgerEngine::new(dec!(100000));
        for (qty, price) in fills {
            forward
                .execute_order(&buy("INFY", qty as i64, price))
                .await
                .unwrap();
        }

        let reverse = LedgerEngine::new(dec!(100000));
        for (qty, price) in fills.iter().rev() {
            reverse
                .execute_order(&buy("INFY", *qty as i64, *price))
                .await
                .unwrap();
        }

        let expected = (dec!(3) * dec!(2100) + dec!(1) * dec!(2400) + dec!(5) * dec!(1980))
            / dec!(9);
        let avg_forward = forward.report().await.portfolio[0].average_price;
        let avg_reverse = reverse.report().await.portfolio[0].average_price;

        assert!((avg_forward - expected).abs() < dec!(0.0000001));
        assert!((avg_forward - avg_reverse).abs() < dec!(0.0000001));
    }

    #[tokio::test]
    async fn test_buy_rejected_on_insufficient_funds() {
        let engine = LedgerEngine::new(dec!(100));

        let err = engine
            .execute_order(&buy("RELIANCE", 1, dec!(2500)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: dec!(2500),
                available: dec!(100),
            }
        );

        // Balance never goes negative; nothing changed.
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(100));
        assert!(snapshot.portfolio.is_empty());
        assert!(snapshot.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_buy_spending_entire_balance_is_allowed() {
        let engine = LedgerEngine::new(dec!(2500));

        let fill = engine
            .execute_order(&buy("RELIANCE", 1, dec!(2500)))
            .await
            .unwrap();
        assert_eq!(fill.new_balance, dec!(0));
    }

    // =========================================================================
    // SELL Settlement Tests
    // =========================================================================

    #[tokio::test]
    async fn test_partial_sell_keeps_average_price() {
        let engine = LedgerEngine::new(dec!(5000));
        engine
            .execute_order(&buy("RELIANCE", 2, dec!(2500)))
            .await
            .unwrap();

        let fill = engine
            .execute_order(&sell("RELIANCE", 1, dec!(2600)))
            .await
            .unwrap();
        assert_eq!(fill.new_balance, dec!(2600));

        let snapshot = engine.report().await;
        let position = &snapshot.portfolio[0];
        assert_eq!(position.quantity, 1);
        assert_eq!(position.average_price, dec!(2500));
    }

    #[tokio::test]
    async fn test_full_sell_removes_position() {
        let engine = LedgerEngine::new(dec!(5000));
        engine
            .execute_order(&buy("RELIANCE", 2, dec!(2500)))
            .await
            .unwrap();
        engine
            .execute_order(&sell("RELIANCE", 2, dec!(2550)))
            .await
            .unwrap();

        let snapshot = engine.report().await;
        assert!(snapshot.portfolio.is_empty());
        assert_eq!(snapshot.balance, dec!(5100));
    }

    #[tokio::test]
    async fn test_sell_without_position_is_rejected() {
        let engine = LedgerEngine::new(dec!(5000));

        let err = engine
            .execute_order(&sell("RELIANCE", 1, dec!(2500)))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NoPosition("RELIANCE".to_string()));

        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(5000));
        assert!(snapshot.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_sell_beyond_holdings_is_rejected() {
        let engine = LedgerEngine::new(dec!(5000));
        engine
            .execute_order(&buy("RELIANCE", 2, dec!(2500)))
            .await
            .unwrap();

        let err = engine
            .execute_order(&sell("RELIANCE", 3, dec!(2600)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientHoldings {
                requested: 3,
                held: 2,
            }
        );

        // Rejection leaves everything intact.
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(0));
        assert_eq!(snapshot.portfolio[0].quantity, 2);
        assert_eq!(snapshot.transactions.len(), 1);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[tokio::test]
    async fn test_order_validation_rejects_malformed_requests() {
        let engine = LedgerEngine::new(dec!(5000));

        let cases = [
            buy("", 1, dec!(100)),
            OrderRequest::new("RELIANCE", "", 1, dec!(100)),
            buy("RELIANCE", 0, dec!(100)),
            buy("RELIANCE", -4, dec!(100)),
            buy("RELIANCE", 1, dec!(0)),
            buy("RELIANCE", 1, dec!(-5)),
        ];

        for order in &cases {
            let err = engine.execute_order(order).await.unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidOrder(_)),
                "expected InvalidOrder for {order:?}, got {err:?}"
            );
        }

        // None of the rejected orders touched the ledger.
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(5000));
        assert!(snapshot.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let engine = LedgerEngine::new(dec!(5000));

        let err = engine
            .execute_order(&OrderRequest::new("RELIANCE", "SHORT", 1, dec!(100)))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidAction("SHORT".to_string()));

        assert!(engine.report().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_action_is_case_insensitive() {
        let engine = LedgerEngine::new(dec!(5000));

        engine
            .execute_order(&OrderRequest::new("RELIANCE", "buy", 1, dec!(2500)))
            .await
            .unwrap();
        engine
            .execute_order(&OrderRequest::new("RELIANCE", "Sell", 1, dec!(2500)))
            .await
            .unwrap();

        assert_eq!(engine.report().await.transactions.len(), 2);
    }

    // =========================================================================
    // Transaction Log Tests
    // =========================================================================

    #[tokio::test]
    async fn test_every_successful_operation_appends_one_transaction() {
        let engine = LedgerEngine::new(dec!(5000));

        engine.deposit(dec!(1000), None).await.unwrap();
        engine
            .execute_order(&buy("RELIANCE", 1, dec!(2500)))
            .await
            .unwrap();
        engine
            .execute_order(&sell("RELIANCE", 1, dec!(2600)))
            .await
            .unwrap();

        let snapshot = engine.report().await;
        assert_eq!(snapshot.transactions.len(), 3);
        assert_eq!(snapshot.transactions[0].kind, TransactionKind::Deposit);
        assert_eq!(snapshot.transactions[1].kind, TransactionKind::Buy);
        assert_eq!(snapshot.transactions[2].kind, TransactionKind::Sell);
    }

    #[tokio::test]
    async fn test_transaction_log_is_time_ordered() {
        let engine = LedgerEngine::new(dec!(5000));
        engine.deposit(dec!(10), None).await.unwrap();
        engine.deposit(dec!(20), None).await.unwrap();
        engine.deposit(dec!(30), None).await.unwrap();

        let snapshot = engine.report().await;
        for pair in snapshot.transactions.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    // =========================================================================
    // Scenario Tests
    // =========================================================================

    #[tokio::test]
    async fn test_buy_sell_buy_scenario() {
        // Start 5000; BUY 2 @ 2500 -> balance 0, avg 2500.
        // SELL 1 @ 2600 -> balance 2600, qty 1, avg unchanged.
        // BUY 1 @ 2700 -> qty 2, avg (2500 + 2700) / 2 = 2600.
        let engine = LedgerEngine::new(dec!(5000));

        engine
            .execute_order(&buy("RELIANCE", 2, dec!(2500)))
            .await
            .unwrap();
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(0));
        assert_eq!(snapshot.portfolio[0].quantity, 2);
        assert_eq!(snapshot.portfolio[0].average_price, dec!(2500));

        engine
            .execute_order(&sell("RELIANCE", 1, dec!(2600)))
            .await
            .unwrap();
        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(2600));
        assert_eq!(snapshot.portfolio[0].quantity, 1);
        assert_eq!(snapshot.portfolio[0].average_price, dec!(2500));

        engine
            .execute_order(&buy("RELIANCE", 1, dec!(2700)))
            .await
            .unwrap();
        let snapshot = engine.report().await;
        assert_eq!(snapshot.portfolio[0].quantity, 2);
        assert_eq!(snapshot.portfolio[0].average_price, dec!(2600));
    }

    #[tokio::test]
    async fn test_report_reflects_cumulative_effect() {
        let engine = LedgerEngine::new(dec!(10000));

        engine
            .execute_order(&buy("RELIANCE", 2, dec!(2000)))
            .await
            .unwrap();
        engine.execute_order(&buy("TCS", 1, dec!(3000))).await.unwrap();
        engine
            .execute_order(&sell("RELIANCE", 1, dec!(2100)))
            .await
            .unwrap();
        // Failed operations must not leak into the report.
        let _ = engine.execute_order(&sell("WIPRO", 1, dec!(500))).await;
        let _ = engine.deposit(dec!(-1), None).await;

        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(10000) - dec!(4000) - dec!(3000) + dec!(2100));
        assert_eq!(snapshot.portfolio.len(), 2);
        assert_eq!(snapshot.transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_buys_serialize_on_balance() {
        // Two tasks race to spend a balance that only covers one order;
        // exactly one settles.
        let engine = Arc::new(LedgerEngine::new(dec!(2500)));

        let a = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.execute_order(&buy("RELIANCE", 1, dec!(2500))).await })
        };
        let b = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.execute_order(&buy("TCS", 1, dec!(2500))).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let settled = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(settled, 1);

        let snapshot = engine.report().await;
        assert_eq!(snapshot.balance, dec!(0));
        assert_eq!(snapshot.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_symbol_is_trimmed() {
        let engine = LedgerEngine::new(dec!(5000));
        engine
            .execute_order(&buy("  RELIANCE  ", 1, dec!(2500)))
            .await
            .unwrap();
        engine
            .execute_order(&sell("RELIANCE", 1, dec!(2500)))
            .await
            .unwrap();

        assert!(engine.report().await.portfolio.is_empty());
    }
}
