//! Ebb Daemon
//!
//! Unattended single-position short engine: polls Binance market data, runs
//! one decision cycle per interval, and persists position state between
//! cycles.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p ebbd
//!
//! # Start with custom parameters
//! EBB_TRADE_SYMBOL=SUIUSDT EBB_POLL_SECS=10 cargo run -p ebbd
//! ```
//!
//! # Environment Variables
//!
//! - `BINANCE_API_KEY` / `BINANCE_API_SECRET`: venue credentials (required)
//! - `EBB_TRADE_SYMBOL`: traded instrument (default: SUIUSDT)
//! - `EBB_REFERENCE_SYMBOL`: regime reference (default: BTCUSDT)
//! - `EBB_ENTRY_TF` / `EBB_EXIT_TF` / `EBB_REFERENCE_TF`: timeframes
//! - `EBB_POLL_SECS`: sleep between cycles (default: 10)
//! - `EBB_STATE_FILE`: state file path (default: ebb_state.json)
//! - `EBB_INVEST_USDT`, `EBB_SL_PCT`, `EBB_TP1_PCT`, `EBB_TP1_SPLIT`,
//!   `EBB_TRAILING_LOOKBACK`, plus the `EBB_*_FILTER` toggles

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ebb_connectors::{BinanceFutures, BinanceMarketData};
use ebb_store::FileStateStore;
use ebbd::{Config, DaemonError, TradingEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("ebbd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let api_key = std::env::var("BINANCE_API_KEY")
        .map_err(|_| DaemonError::Config("BINANCE_API_KEY not set".to_string()))?;
    let api_secret = std::env::var("BINANCE_API_SECRET")
        .map_err(|_| DaemonError::Config("BINANCE_API_SECRET not set".to_string()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        trade_symbol = %config.trade_symbol,
        reference_symbol = %config.reference_symbol,
        poll_secs = config.poll_interval.as_secs(),
        "Ebb Daemon"
    );

    let feed = Arc::new(BinanceMarketData::new());
    let exchange = Arc::new(
        BinanceFutures::connect(api_key, api_secret, config.trade_symbol.clone()).await?,
    );
    let store = Arc::new(FileStateStore::new(config.state_path.clone()));

    let mut engine = TradingEngine::boot(config, feed, exchange, store).await?;

    // The scheduler loop runs until ctrl-c; cycle failures never end it.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    engine.run(shutdown).await;
    Ok(())
}
