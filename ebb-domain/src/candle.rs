//! Candle data for one bar of one instrument/timeframe.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One completed or in-progress bar.
///
/// A series is ordered oldest to newest. The final element may represent an
/// in-progress bar and must never be used where a closed-bar value is
/// required; callers slice it off before computing indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price (latest trade for an in-progress bar)
    pub close: Decimal,
    /// Base-asset volume
    pub volume: Decimal,
    /// Close timestamp in epoch milliseconds; doubles as the candle id
    pub close_time: i64,
}

impl Candle {
    /// Top of the candle body.
    pub fn body_top(&self) -> Decimal {
        self.open.max(self.close)
    }

    /// Bar range as a percentage of the close.
    ///
    /// Returns `None` when the close is not positive, so a malformed bar can
    /// never divide by zero.
    pub fn range_pct(&self) -> Option<Decimal> {
        if self.close <= Decimal::ZERO {
            return None;
        }
        (self.high - self.low)
            .checked_div(self.close)
            .map(|r| r * Decimal::ONE_HUNDRED)
    }
}

// =============================================================================
// Tests
// =============================================================================
