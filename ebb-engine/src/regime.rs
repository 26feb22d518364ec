//! Market regime detection.
//!
//! The regime gates all new entries and force-closes an open position on an
//! `On -> Off` transition. It is derived from the reference instrument only:
//! the last closed close must sit below both the cached daily anchor price
//! and the EMA(9) of closed closes.
//!
//! The daily anchor is the reference instrument's open at the 09:00 reset in
//! a fixed UTC+9 offset. It lives in an explicit cache value object; the
//! daemon refreshes it read-through whenever the reset boundary is crossed,
//! so the recompute stays a cheap predicate check rather than a scheduled
//! job.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use rust_decimal::Decimal;

use ebb_domain::indicators::ema;
use ebb_domain::Regime;

use crate::error::EngineError;

/// EMA length for the regime trend filter.
pub const REGIME_EMA_PERIOD: usize = 9;

/// Hour of day (in the anchor offset) at which the daily anchor resets.
const ANCHOR_RESET_HOUR: u32 = 9;

/// Fixed anchor timezone offset in hours east of UTC.
const ANCHOR_OFFSET_HOURS: i32 = 9;

/// The most recent daily reset instant at or before `now`.
pub fn anchor_instant(now: DateTime<Utc>) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(ANCHOR_OFFSET_HOURS * 3600)
        .expect("fixed UTC+9 offset is in range");
    let reset = NaiveTime::from_hms_opt(ANCHOR_RESET_HOUR, 0, 0)
        .expect("09:00:00 is a valid time of day");

    let local = now.with_timezone(&offset);
    let mut date = local.date_naive();
    if local.time() < reset {
        date = date - Duration::days(1);
    }
    date.and_time(reset)
        .and_local_timezone(offset)
        .single()
        .expect("fixed offsets have no ambiguous local times")
        .with_timezone(&Utc)
}

/// Cached daily anchor price with the reset instant it was sampled for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCache {
    /// Reset instant this price belongs to
    pub anchor_at: DateTime<Utc>,
    /// Reference instrument's daily open at that instant
    pub price: Decimal,
}

impl AnchorCache {
    /// Cache a freshly fetched anchor price for the current reset window.
    pub fn new(now: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            anchor_at: anchor_instant(now),
            price,
        }
    }

    /// True once wall-clock time has crossed into the next reset window.
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        self.anchor_at != anchor_instant(now)
    }
}

/// Derive the regime from closed reference closes and the daily anchor.
///
/// `On` only when the last closed close is below both the anchor and the
/// EMA(9); everything else is `Off`.
///
/// # Errors
/// Returns `EngineError` when the series cannot support the EMA. Callers must
/// treat that exactly like a reference-feed failure.
pub fn detect_regime(
    closed_closes: &[Decimal],
    daily_anchor: Decimal,
) -> Result<Regime, EngineError> {
    let Some(last_close) = closed_closes.last().copied() else {
        return Err(EngineError::InsufficientCandles {
            need: REGIME_EMA_PERIOD,
            got: 0,
        });
    };
    let ema9 = ema(closed_closes, REGIME_EMA_PERIOD)?;

    if last_close < daily_anchor && last_close < ema9 {
        Ok(Regime::On)
    } else {
        Ok(Regime::Off)
    }
}

// =============================================================================
// Tests
// =============================================================================
