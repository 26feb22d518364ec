//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ebb_domain::{StrategyConfig, Symbol};

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Traded instrument
    pub trade_symbol: Symbol,
    /// Reference instrument driving the regime
    pub reference_symbol: Symbol,
    /// Entry-decision timeframe
    pub entry_timeframe: String,
    /// Exit-decision timeframe
    pub exit_timeframe: String,
    /// Reference/regime timeframe
    pub reference_timeframe: String,
    /// Candles requested per series
    pub candle_limit: usize,
    /// Sleep between cycles
    pub poll_interval: Duration,
    /// Reference series staleness threshold in milliseconds
    pub reference_stale_ms: i64,
    /// Traded series staleness threshold in milliseconds
    pub trade_stale_ms: i64,
    /// Canonical state file path
    pub state_path: PathBuf,
    /// Strategy parameters
    pub strategy: StrategyConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let defaults = StrategyConfig::default();
        let strategy = StrategyConfig {
            regime_filter_enabled: load_bool_env(
                "EBB_REGIME_FILTER",
                defaults.regime_filter_enabled,
            )?,
            entry_filter_enabled: load_bool_env("EBB_ENTRY_FILTER", defaults.entry_filter_enabled)?,
            volatility_filter_enabled: load_bool_env(
                "EBB_VOLATILITY_FILTER",
                defaults.volatility_filter_enabled,
            )?,
            volume_filter_enabled: load_bool_env(
                "EBB_VOLUME_FILTER",
                defaults.volume_filter_enabled,
            )?,
            ema_entry_tolerance_pct: load_decimal_env(
                "EBB_EMA_TOLERANCE_PCT",
                defaults.ema_entry_tolerance_pct,
            )?,
            volatility_min_pct: load_decimal_env(
                "EBB_VOLATILITY_MIN_PCT",
                defaults.volatility_min_pct,
            )?,
            volume_spike_ratio: load_decimal_env(
                "EBB_VOLUME_SPIKE_RATIO",
                defaults.volume_spike_ratio,
            )?,
            invest_usdt: load_decimal_env("EBB_INVEST_USDT", defaults.invest_usdt)?,
            sl_pct: load_decimal_env("EBB_SL_PCT", defaults.sl_pct)?,
            tp1_enabled: load_bool_env("EBB_TP1_ENABLED", defaults.tp1_enabled)?,
            tp1_pct: load_decimal_env("EBB_TP1_PCT", defaults.tp1_pct)?,
            tp1_split: load_decimal_env("EBB_TP1_SPLIT", defaults.tp1_split)?,
            trailing_enabled: load_bool_env("EBB_TRAILING_ENABLED", defaults.trailing_enabled)?,
            trailing_lookback: load_usize_env("EBB_TRAILING_LOOKBACK", defaults.trailing_lookback)?,
        };
        strategy.validate()?;

        let trade_symbol = Symbol::new(&load_string_env("EBB_TRADE_SYMBOL", "SUIUSDT"))?;
        let reference_symbol = Symbol::new(&load_string_env("EBB_REFERENCE_SYMBOL", "BTCUSDT"))?;

        Ok(Self {
            trade_symbol,
            reference_symbol,
            entry_timeframe: load_string_env("EBB_ENTRY_TF", "5m"),
            exit_timeframe: load_string_env("EBB_EXIT_TF", "3m"),
            reference_timeframe: load_string_env("EBB_REFERENCE_TF", "5m"),
            candle_limit: load_usize_env("EBB_CANDLE_LIMIT", 60)?,
            poll_interval: Duration::from_secs(load_u64_env("EBB_POLL_SECS", 10)?),
            reference_stale_ms: load_i64_env("EBB_REFERENCE_STALE_MS", 600_000)?,
            trade_stale_ms: load_i64_env("EBB_TRADE_STALE_MS", 600_000)?,
            state_path: PathBuf::from(load_string_env("EBB_STATE_FILE", "ebb_state.json")),
            strategy,
        })
    }

    /// Create test configuration: every entry filter off, a wide EMA band,
    /// and a near-zero poll interval.
    pub fn test() -> Self {
        Self {
            trade_symbol: Symbol::new("SUIUSDT").expect("valid test symbol"),
            reference_symbol: Symbol::new("BTCUSDT").expect("valid test symbol"),
            entry_timeframe: "5m".to_string(),
            exit_timeframe: "3m".to_string(),
            reference_timeframe: "5m".to_string(),
            candle_limit: 30,
            poll_interval: Duration::from_millis(10),
            reference_stale_ms: 600_000,
            trade_stale_ms: 600_000,
            state_path: PathBuf::from("ebb_state_test.json"),
            strategy: StrategyConfig {
                regime_filter_enabled: false,
                entry_filter_enabled: false,
                volatility_filter_enabled: false,
                volume_filter_enabled: false,
                ema_entry_tolerance_pct: dec!(5),
                invest_usdt: dec!(100),
                sl_pct: dec!(2),
                tp1_enabled: true,
                tp1_pct: dec!(1.2),
                tp1_split: dec!(0.5),
                trailing_enabled: true,
                trailing_lookback: 3,
                ..StrategyConfig::default()
            },
        }
    }
}

// =============================================================================
// Env helpers
// =============================================================================

fn load_string_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
    match env::var(key) {
        Ok(val) => Decimal::from_str(&val)
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn load_bool_env(key: &str, default: bool) -> DaemonResult<bool> {
    match env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(DaemonError::Config(format!(
                "Invalid {} value: {}. Expected: true, false, 1, 0",
                key, other
            ))),
        },
        Err(_) => Ok(default),
    }
}

fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn load_i64_env(key: &str, default: i64) -> DaemonResult<i64> {
    match env::var(key) {
        Ok(val) => val
            .parse::<i64>()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn load_usize_env(key: &str, default: usize) -> DaemonResult<usize> {
    match env::var(key) {
        Ok(val) => val
            .parse::<usize>()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

// =============================================================================
// Tests
// =============================================================================
