//! Paper Ledger - Main Entry Point
//!
//! Serves the paper-trading API; `quote` fetches a single price through
//! the configured provider for debugging.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paper_ledger::config::Config;
use paper_ledger::ledger::LedgerEngine;
use paper_ledger::market::{HttpQuoteProvider, MockQuoteProvider, QuoteProvider};
use paper_ledger::server::{self, AppState};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Paper Ledger CLI
#[derive(Parser)]
#[command(name = "paper-ledger")]
#[command(version, about = "Paper-trading simulator with a virtual wallet and position ledger")]
struct Cli {
    /// Bind address override
    #[arg(long)]
    host: Option<String>,

    /// Listen port override
    #[arg(long)]
    port: Option<u16>,

    /// Opening wallet balance override
    #[arg(short = 'b', long)]
    balance: Option<f64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single quote through the configured provider
    Quote {
        /// Instrument symbol
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(balance) = cli.balance {
        config.wallet.opening_balance = Decimal::from_f64_retain(balance)
            .context("Opening balance is not a representable amount")?;
    }
    config.validate()?;

    let quotes = build_quote_provider(&config)?;

    if let Some(Commands::Quote { symbol }) = cli.command {
        return run_quote(quotes.as_ref(), &symbol).await;
    }

    info!(
        "Paper Ledger v{} - simulated trading only, no real orders",
        env!("CARGO_PKG_VERSION")
    );
    log_config(&config);

    let engine = Arc::new(
        LedgerEngine::new(config.wallet.opening_balance)
            .with_deposit_source(config.wallet.deposit_source.clone()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    server::serve(AppState { engine, quotes }, addr).await
}

/// Select the quote provider from configuration.
fn build_quote_provider(config: &Config) -> Result<Arc<dyn QuoteProvider>> {
    if config.quotes.mock {
        info!("Quote provider: mock (no upstream source)");
        Ok(Arc::new(MockQuoteProvider::new(
            config.quotes.price_floor,
            config.quotes.price_band,
        )))
    } else {
        info!(base_url = %config.quotes.base_url, "Quote provider: HTTP");
        let provider = HttpQuoteProvider::new(
            config.quotes.base_url.clone(),
            Duration::from_secs(config.quotes.timeout_secs),
        )?;
        Ok(Arc::new(provider))
    }
}

/// Fetch and print one quote, then exit.
async fn run_quote(provider: &dyn QuoteProvider, symbol: &str) -> Result<()> {
    match provider.quote(symbol).await {
        Ok(quote) => {
            info!(
                symbol = %quote.symbol,
                price = %quote.price,
                change = %quote.change,
                "Quote"
            );
            println!("{}  price={}  change={}", quote.symbol, quote.price, quote.change);
            Ok(())
        }
        Err(err) => {
            warn!(%err, "Quote lookup failed");
            Err(err.into())
        }
    }
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // File appender for detailed logs
    let file_appender = tracing_appender::rolling::hourly("logs", "paper-ledger.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("paper_ledger=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("Configuration:");
    info!(
        "   Listen: {}:{}",
        config.server.host, config.server.port
    );
    info!("   Opening balance: {}", config.wallet.opening_balance);
    info!("   Deposit source label: {}", config.wallet.deposit_source);
    if config.quotes.mock {
        info!(
            "   Quotes: mock, band {} to {}",
            config.quotes.price_floor,
            config.quotes.price_floor + config.quotes.price_band
        );
    } else {
        info!(
            "   Quotes: {} ({}s timeout)",
            config.quotes.base_url, config.quotes.timeout_secs
        );
    }
}
