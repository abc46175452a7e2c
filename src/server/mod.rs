//! HTTP boundary for the presentation layer.
//!
//! Thin adapter: every handler validates nothing itself, calls into the
//! engine (or the quote provider) and maps the typed result onto the wire
//! shapes the front-end expects. Engine errors become 400 responses with
//! a short `{ "error": ... }` body; quote failures become 502 on the
//! quote endpoint and the documented fallback price on the valuation
//! endpoint. Nothing here can crash the process.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::ledger::{LedgerEngine, LedgerError, OrderRequest, Position, Transaction};
use crate::market::{value_portfolio, PortfolioValuation, Quote, QuoteProvider};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
    pub quotes: Arc<dyn QuoteProvider>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/add-funds", post(add_funds))
        .route("/api/order", post(place_order))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/portfolio/valuation", get(get_valuation))
        .route("/api/quote/:symbol", get(get_quote))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    use anyhow::Context;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Paper trading API listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")?;

    Ok(())
}

type ErrorResponse = (StatusCode, Json<serde_json::Value>);

fn bad_request(err: LedgerError) -> ErrorResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
}

#[derive(Debug, Serialize)]
struct WalletResponse {
    #[serde(with = "rust_decimal::serde::float")]
    balance: Decimal,
}

async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    Json(WalletResponse {
        balance: state.engine.balance().await,
    })
}

#[derive(Debug, Deserialize)]
struct AddFundsRequest {
    /// Missing amount deserializes to zero and is rejected by the engine.
    #[serde(default)]
    amount: Decimal,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddFundsResponse {
    success: bool,
    #[serde(with = "rust_decimal::serde::float")]
    new_balance: Decimal,
}

async fn add_funds(
    State(state): State<AppState>,
    Json(req): Json<AddFundsRequest>,
) -> Result<Json<AddFundsResponse>, ErrorResponse> {
    let new_balance = state
        .engine
        .deposit(req.amount, req.source.as_deref())
        .await
        .map_err(bad_request)?;

    Ok(Json(AddFundsResponse {
        success: true,
        new_balance,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    success: bool,
    message: String,
    #[serde(with = "rust_decimal::serde::float")]
    new_balance: Decimal,
}

async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<OrderResponse>, ErrorResponse> {
    let fill = state
        .engine
        .execute_order(&req)
        .await
        .map_err(bad_request)?;

    Ok(Json(OrderResponse {
        success: true,
        message: format!("Order Executed: {} {} {}", fill.side, fill.quantity, fill.symbol),
        new_balance: fill.new_balance,
    }))
}

#[derive(Debug, Serialize)]
struct PortfolioResponse {
    portfolio: Vec<Position>,
    transactions: Vec<Transaction>,
}

async fn get_portfolio(State(state): State<AppState>) -> Json<PortfolioResponse> {
    let snapshot = state.engine.report().await;
    Json(PortfolioResponse {
        portfolio: snapshot.portfolio,
        transactions: snapshot.transactions,
    })
}

async fn get_valuation(State(state): State<AppState>) -> Json<PortfolioValuation> {
    let snapshot = state.engine.report().await;
    Json(value_portfolio(state.quotes.as_ref(), &snapshot.portfolio).await)
}

async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ErrorResponse> {
    state
        .quotes
        .quote(&symbol)
        .await
        .map(Json)
        .map_err(|err| (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.to_string() }))))
}
