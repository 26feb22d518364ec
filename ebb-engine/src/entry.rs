//! Short-entry signal evaluation.
//!
//! Runs only when flat. All checks read closed entry-timeframe candles except
//! the final price band check, which deliberately uses the in-progress close
//! as a defense against feed latency.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ebb_domain::indicators::{ema, mean};
use ebb_domain::{Candle, CandleId, StrategyConfig};

use crate::error::EngineError;

/// EMA length for the entry band and mother trigger.
pub const ENTRY_EMA_PERIOD: usize = 9;

/// Sliding window of closed candle pairs scanned by the mother trigger.
pub const MOTHER_WINDOW: usize = 7;

/// Closed bars averaged for the volume spike filter.
pub const VOLUME_MA_PERIOD: usize = 20;

/// Minimum series length before any entry evaluation.
pub const MIN_ENTRY_CANDLES: usize = 25;

/// Fixed epsilon (fraction of the EMA) added to the price band.
const EMA_BAND_EPSILON: Decimal = dec!(0.0002);

/// An armed short-entry trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    /// In-progress close at evaluation time; the sizing price
    pub price: Decimal,
    /// Id of the entry candle consumed by this signal
    pub candle_id: CandleId,
}

/// Evaluate the short-entry trigger against the entry-timeframe series.
///
/// Returns `Ok(None)` when any enabled filter rejects the setup or when the
/// in-progress candle was already consumed by a previous entry.
///
/// # Errors
/// Propagates indicator failures; the caller escalates those to the cycle
/// boundary.
pub fn evaluate_entry(
    cfg: &StrategyConfig,
    candles: &[Candle],
    last_entry_candle_id: Option<CandleId>,
) -> Result<Option<EntrySignal>, EngineError> {
    if candles.len() < MIN_ENTRY_CANDLES {
        return Ok(None);
    }

    let current = &candles[candles.len() - 1];
    // Candle-consumption dedup: at most one entry per entry-timeframe bar.
    if last_entry_candle_id == Some(current.close_time) {
        return Ok(None);
    }

    let closed = &candles[..candles.len() - 1];
    let closes: Vec<Decimal> = closed.iter().map(|c| c.close).collect();
    let ema9 = ema(&closes, ENTRY_EMA_PERIOD)?;
    let tol = ema9 * cfg.ema_entry_tolerance_pct / Decimal::ONE_HUNDRED;

    if cfg.entry_filter_enabled && !mother_trigger(candles, ema9, tol) {
        return Ok(None);
    }

    let prev = &candles[candles.len() - 2];

    if cfg.volatility_filter_enabled {
        let Some(range_pct) = prev.range_pct() else {
            return Ok(None);
        };
        if range_pct < cfg.volatility_min_pct {
            return Ok(None);
        }
    }

    if cfg.volume_filter_enabled && volume_ratio(candles) < cfg.volume_spike_ratio {
        return Ok(None);
    }

    // Price band: the live price must still hug the EMA when the order would
    // actually go out, tolerance plus a small latency epsilon.
    let price = current.close;
    let eps = ema9 * EMA_BAND_EPSILON;
    if (price - ema9).abs() > tol + eps {
        return Ok(None);
    }

    Ok(Some(EntrySignal {
        price,
        candle_id: current.close_time,
    }))
}

/// Mother trigger with window memory.
///
/// Scans the most recent closed two-candle pairs, newest first. A pair
/// (older, newer) qualifies when the older body top hugs the EMA and the
/// newer close sits below the EMA or within tolerance of it. One qualifying
/// pair anywhere in the window arms the trigger, not only the most recent
/// pair.
fn mother_trigger(candles: &[Candle], ema9: Decimal, tol: Decimal) -> bool {
    for i in 2..2 + MOTHER_WINDOW {
        if candles.len() < i + 1 {
            break;
        }
        let older = &candles[candles.len() - (i + 1)];
        let newer = &candles[candles.len() - i];

        let ema_ok = (older.body_top() - ema9).abs() <= tol;
        let direction_ok = newer.close < ema9 || (newer.close - ema9).abs() <= tol;
        if ema_ok && direction_ok {
            return true;
        }
    }
    false
}

/// Previous closed bar's volume over the 20-bar closed mean; zero when the
/// mean is not positive.
fn volume_ratio(candles: &[Candle]) -> Decimal {
    let prev = &candles[candles.len() - 2];
    let window = &candles[candles.len() - 1 - VOLUME_MA_PERIOD..candles.len() - 1];
    let vols: Vec<Decimal> = window.iter().map(|c| c.volume).collect();
    match mean(&vols) {
        Some(ma) if ma > Decimal::ZERO => prev.volume.checked_div(ma).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Series with every close pinned to 100 (so EMA(9) is exactly 100) and
    /// every body top pushed far outside any tolerance band.
    fn flat_series(len: usize) -> Vec<Candle> {
        (0..len)
            .map(|i| Candle {
                open: dec!(200),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100),
                volume: dec!(1000),
                close_time: 1_700_000_000_000 + i as i64 * 300_000,
            })
            .collect()
    }

    fn entry_only_config() -> StrategyConfig {
        StrategyConfig {
            entry_filter_enabled: true,
            volatility_filter_enabled: false,
            volume_filter_enabled: false,
            ema_entry_tolerance_pct: dec!(1),
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn test_mother_window_remembers_oldest_pair() {
        let cfg = entry_only_config();
        let mut candles = flat_series(26);

        // Only the oldest pair in the 7-pair window has its older candle's
        // body top on the EMA; every newer pair stays far above it.
        let oldest_older = candles.len() - 9;
        candles[oldest_older].open = dec!(100);

        let signal = evaluate_entry(&cfg, &candles, None).unwrap();
        assert!(signal.is_some());
        assert_eq!(signal.unwrap().price, dec!(100));
    }

    #[test]
    fn test_mother_trigger_most_recent_pair_also_arms() {
        let cfg = entry_only_config();
        let mut candles = flat_series(26);
        let recent_older = candles.len() - 3;
        candles[recent_older].open = dec!(100);

        assert!(evaluate_entry(&cfg, &candles, None).unwrap().is_some());
    }

    #[test]
    fn test_mother_trigger_blocks_when_no_pair_qualifies() {
        let cfg = entry_only_config();
        let candles = flat_series(26);

        assert_eq!(evaluate_entry(&cfg, &candles, None).unwrap(), None);
    }

    #[test]
    fn test_entry_filter_disabled_skips_mother_trigger() {
        let cfg = StrategyConfig {
            entry_filter_enabled: false,
            ..entry_only_config()
        };
        let candles = flat_series(26);

        assert!(evaluate_entry(&cfg, &candles, None).unwrap().is_some());
    }

    #[test]
    fn test_candle_consumption_dedup() {
        let cfg = StrategyConfig {
            entry_filter_enabled: false,
            ..entry_only_config()
        };
        let candles = flat_series(26);
        let consumed = candles.last().unwrap().close_time;

        assert_eq!(evaluate_entry(&cfg, &candles, Some(consumed)).unwrap(), None);
        // A different consumed id does not block.
        assert!(evaluate_entry(&cfg, &candles, Some(consumed - 1)).unwrap().is_some());
    }

    #[test]
    fn test_volatility_filter_gates_on_previous_bar_range() {
        let cfg = StrategyConfig {
            entry_filter_enabled: false,
            volatility_filter_enabled: true,
            volatility_min_pct: dec!(0.35),
            ..entry_only_config()
        };

        // Default bars carry a 2% range: passes.
        let candles = flat_series(26);
        assert!(evaluate_entry(&cfg, &candles, None).unwrap().is_some());

        // Collapse the previous closed bar to zero range: blocked.
        let mut quiet = flat_series(26);
        let prev = quiet.len() - 2;
        quiet[prev].high = dec!(100);
        quiet[prev].low = dec!(100);
        assert_eq!(evaluate_entry(&cfg, &quiet, None).unwrap(), None);
    }

    #[test]
    fn test_volume_filter_requires_spike() {
        let cfg = StrategyConfig {
            entry_filter_enabled: false,
            volume_filter_enabled: true,
            volume_spike_ratio: dec!(1.8),
            ..entry_only_config()
        };

        // Flat volume everywhere: ratio 1, blocked.
        let candles = flat_series(26);
        assert_eq!(evaluate_entry(&cfg, &candles, None).unwrap(), None);

        // Spike on the previous closed bar: passes.
        let mut spiked = flat_series(26);
        let prev = spiked.len() - 2;
        spiked[prev].volume = dec!(3000);
        assert!(evaluate_entry(&cfg, &spiked, None).unwrap().is_some());
    }

    #[test]
    fn test_price_band_rejects_runaway_live_price() {
        let cfg = StrategyConfig {
            entry_filter_enabled: false,
            ..entry_only_config()
        };
        let mut candles = flat_series(26);
        // Closed closes (and the EMA) stay at 100; only the live price runs.
        let last = candles.len() - 1;
        candles[last].close = dec!(110);

        assert_eq!(evaluate_entry(&cfg, &candles, None).unwrap(), None);
    }

    #[test]
    fn test_short_series_is_no_signal_not_error() {
        let cfg = entry_only_config();
        let candles = flat_series(10);
        assert_eq!(evaluate_entry(&cfg, &candles, None).unwrap(), None);
    }
}
