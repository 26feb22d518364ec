//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services (exchange, market data).
//! Adapters implement these ports for specific venues (Binance, stubs).

use async_trait::async_trait;
use rust_decimal::Decimal;

use ebb_domain::{Candle, OrderSide, Symbol};

use crate::error::{ExecError, FeedError};

// =============================================================================
// Market Data Port
// =============================================================================

/// Port for polled market data.
///
/// Implementations:
/// - `StubFeed` - scripted series for tests
/// - `BinanceMarketData` - Binance spot klines
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Fetch a candle series, oldest first.
    ///
    /// Implementations must deliver at least the venue-page minimum of rows
    /// or signal `FeedError::Unavailable`; the last element may be an
    /// in-progress bar.
    async fn candles(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError>;

    /// Current daily open for the symbol at the venue's day boundary.
    ///
    /// Safe to call every cycle; callers cache it per daily reset window.
    async fn daily_open(&self, symbol: &Symbol) -> Result<Decimal, FeedError>;
}

// =============================================================================
// Order Execution Port
// =============================================================================

/// Port for placing market orders on the execution venue.
///
/// Implementations:
/// - `StubExchange` - recorded fills for tests
/// - `BinanceFutures` - USDT-margined futures market orders
#[async_trait]
pub trait OrderExecutionService: Send + Sync {
    /// Place a market order and return the venue-filled quantity.
    ///
    /// Implementations normalize the requested quantity down to the venue's
    /// lot-size step and reject (never silently clamp) when the normalized
    /// quantity falls below the venue minimum. `reduce_only` must be set for
    /// every closing order so a close can never open fresh exposure.
    async fn place_market_order(
        &self,
        side: OrderSide,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<Decimal, ExecError>;
}
