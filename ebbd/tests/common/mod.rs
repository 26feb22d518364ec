//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ebb_domain::{Candle, PositionState, Regime};
use ebb_exec::{StubExchange, StubFeed};
use ebb_store::MemoryStateStore;
use ebbd::{Config, TradingEngine};

/// Bar spacing used by the scripted series.
pub const TF_MS: i64 = 180_000;

/// Current wall-clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Candle series ending with one in-progress bar whose close is `live_close`.
///
/// Closed bars all close at 100 with a 2% range; the newest closed bar ends
/// at `now_ms`, so the series reads as fresh.
pub fn scripted_series(len: usize, live_close: Decimal, now_ms: i64) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let offset = i as i64 - (len as i64 - 2);
            let close = if i == len - 1 { live_close } else { dec!(100) };
            Candle {
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close,
                volume: dec!(1000),
                close_time: now_ms + offset * TF_MS,
            }
        })
        .collect()
}

/// Reference series whose closed closes are eleven 100s then 90, putting the
/// last closed close below the EMA(9); with an anchor above 90 the regime
/// computes On.
pub fn descending_reference(now_ms: i64) -> Vec<Candle> {
    let mut closes = vec![dec!(100); 11];
    closes.push(dec!(90));
    closes.push(dec!(90)); // in-progress
    let len = closes.len();
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle {
            open: *close,
            high: *close,
            low: *close,
            close: *close,
            volume: dec!(1000),
            close_time: now_ms + (i as i64 - (len as i64 - 2)) * TF_MS,
        })
        .collect()
}

/// Open short seeded the way the engine would have persisted it: entry with a
/// 2% stop, nothing else armed.
pub fn open_short(entry: Decimal, qty: Decimal, regime: Regime) -> PositionState {
    PositionState {
        has_position: true,
        entry_price: Some(entry),
        remaining_qty: qty,
        sl_price: Some(PositionState::stop_loss_price(entry, dec!(2))),
        regime,
        ..PositionState::flat()
    }
}

/// One engine wired against shared stubs, so tests can inspect the feed,
/// exchange, and store after the engine consumed them.
pub struct Harness {
    pub cfg: Config,
    pub feed: Arc<StubFeed>,
    pub exchange: Arc<StubExchange>,
    pub store: Arc<MemoryStateStore>,
}

impl Harness {
    pub fn new(cfg: Config) -> Self {
        Self::with_store(cfg, MemoryStateStore::new())
    }

    pub fn with_store(cfg: Config, store: MemoryStateStore) -> Self {
        Self {
            cfg,
            feed: Arc::new(StubFeed::new()),
            exchange: Arc::new(StubExchange::new()),
            store: Arc::new(store),
        }
    }

    /// Fresh reference data that computes regime Off (anchor below price).
    pub fn script_reference(&self, now_ms: i64) {
        self.feed.set_series(
            &self.cfg.reference_symbol,
            &self.cfg.reference_timeframe,
            scripted_series(30, dec!(100), now_ms),
        );
        self.feed.set_daily_open(&self.cfg.reference_symbol, dec!(90));
    }

    /// Fresh reference data that computes regime On.
    pub fn script_reference_on(&self, now_ms: i64) {
        self.feed.set_series(
            &self.cfg.reference_symbol,
            &self.cfg.reference_timeframe,
            descending_reference(now_ms),
        );
        self.feed.set_daily_open(&self.cfg.reference_symbol, dec!(95));
    }

    /// Fresh traded-instrument data for both decision timeframes.
    pub fn script_trade(&self, entry_live: Decimal, exit_live: Decimal, now_ms: i64) {
        self.feed.set_series(
            &self.cfg.trade_symbol,
            &self.cfg.entry_timeframe,
            scripted_series(30, entry_live, now_ms),
        );
        self.feed.set_series(
            &self.cfg.trade_symbol,
            &self.cfg.exit_timeframe,
            scripted_series(30, exit_live, now_ms),
        );
    }

    pub async fn boot(&self) -> TradingEngine<StubFeed, StubExchange, MemoryStateStore> {
        TradingEngine::boot(
            self.cfg.clone(),
            self.feed.clone(),
            self.exchange.clone(),
            self.store.clone(),
        )
        .await
        .expect("engine boot")
    }
}
