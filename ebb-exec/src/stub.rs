//! Stub adapters for tests.
//!
//! Scripted market data and a recording exchange, both safe to share behind
//! `Arc` across a test and the engine under test.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;

use ebb_domain::{Candle, OrderSide, Symbol};

use crate::error::{ExecError, FeedError};
use crate::lot::{normalize_qty, LotSizeFilter};
use crate::ports::{MarketDataFeed, OrderExecutionService};

// =============================================================================
// Stub Feed
// =============================================================================

/// Scripted market data feed.
///
/// Series are keyed by (symbol, timeframe); a symbol can be switched into a
/// failed state to exercise the fail-closed paths.
#[derive(Default)]
pub struct StubFeed {
    series: RwLock<HashMap<(String, String), Vec<Candle>>>,
    daily_opens: RwLock<HashMap<String, Decimal>>,
    failed: RwLock<HashSet<String>>,
}

impl StubFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the series returned for (symbol, timeframe).
    pub fn set_series(&self, symbol: &Symbol, timeframe: &str, candles: Vec<Candle>) {
        self.series
            .write()
            .expect("stub feed lock")
            .insert((symbol.as_str().to_string(), timeframe.to_string()), candles);
    }

    /// Script the daily open returned for a symbol.
    pub fn set_daily_open(&self, symbol: &Symbol, price: Decimal) {
        self.daily_opens
            .write()
            .expect("stub feed lock")
            .insert(symbol.as_str().to_string(), price);
    }

    /// Force every request for this symbol to fail.
    pub fn fail_symbol(&self, symbol: &Symbol) {
        self.failed
            .write()
            .expect("stub feed lock")
            .insert(symbol.as_str().to_string());
    }

    /// Clear a forced failure.
    pub fn restore_symbol(&self, symbol: &Symbol) {
        self.failed
            .write()
            .expect("stub feed lock")
            .remove(symbol.as_str());
    }

    fn is_failed(&self, symbol: &Symbol) -> bool {
        self.failed
            .read()
            .expect("stub feed lock")
            .contains(symbol.as_str())
    }
}

#[async_trait]
impl MarketDataFeed for StubFeed {
    async fn candles(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        if self.is_failed(symbol) {
            return Err(FeedError::Unavailable { got: 0, need: limit });
        }
        self.series
            .read()
            .expect("stub feed lock")
            .get(&(symbol.as_str().to_string(), timeframe.to_string()))
            .cloned()
            .ok_or(FeedError::Unavailable { got: 0, need: limit })
    }

    async fn daily_open(&self, symbol: &Symbol) -> Result<Decimal, FeedError> {
        if self.is_failed(symbol) {
            return Err(FeedError::Unavailable { got: 0, need: 1 });
        }
        self.daily_opens
            .read()
            .expect("stub feed lock")
            .get(symbol.as_str())
            .copied()
            .ok_or(FeedError::Unavailable { got: 0, need: 1 })
    }
}

// =============================================================================
// Stub Exchange
// =============================================================================

/// A market order as the stub exchange recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// Order direction
    pub side: OrderSide,
    /// Filled (lot-normalized) quantity
    pub quantity: Decimal,
    /// Whether the order could only reduce exposure
    pub reduce_only: bool,
}

/// Recording exchange with configurable lot filter and rejection switches.
pub struct StubExchange {
    lot: LotSizeFilter,
    orders: Mutex<Vec<PlacedOrder>>,
    reject_all: AtomicBool,
    reject_next: AtomicBool,
}

impl StubExchange {
    /// Exchange with a fine default lot grid (step 0.001, min 0.001).
    pub fn new() -> Self {
        Self::with_lot(LotSizeFilter {
            step_size: Decimal::new(1, 3),
            min_qty: Decimal::new(1, 3),
        })
    }

    /// Exchange with an explicit lot filter.
    pub fn with_lot(lot: LotSizeFilter) -> Self {
        Self {
            lot,
            orders: Mutex::new(Vec::new()),
            reject_all: AtomicBool::new(false),
            reject_next: AtomicBool::new(false),
        }
    }

    /// Reject every order until cleared.
    pub fn reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Reject exactly the next order.
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Every order placed so far, oldest first.
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.orders.lock().expect("stub exchange lock").clone()
    }

    /// Number of orders placed so far.
    pub fn order_count(&self) -> usize {
        self.orders.lock().expect("stub exchange lock").len()
    }
}

impl Default for StubExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderExecutionService for StubExchange {
    async fn place_market_order(
        &self,
        side: OrderSide,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<Decimal, ExecError> {
        if quantity <= Decimal::ZERO {
            return Err(ExecError::InvalidQuantity(quantity));
        }
        if self.reject_all.load(Ordering::SeqCst) || self.reject_next.swap(false, Ordering::SeqCst)
        {
            return Err(ExecError::Rejected {
                code: -2010,
                msg: "stub rejection".to_string(),
            });
        }

        let filled = normalize_qty(quantity, &self.lot)?;
        self.orders.lock().expect("stub exchange lock").push(PlacedOrder {
            side,
            quantity: filled,
            reduce_only,
        });
        Ok(filled)
    }
}

// =============================================================================
// Tests
// =============================================================================
