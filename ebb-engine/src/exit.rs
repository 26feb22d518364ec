//! The prioritized exit chain (steps 3 to 5).
//!
//! Pure evaluation of an open short position against the exit-timeframe
//! series. The first matching condition wins and ends the cycle; the daemon
//! performs the resulting order and state mutation. Reference-data failure
//! and the regime transition exit (steps 1 and 2) are orchestrated by the
//! daemon before this runs, because they depend on feed results rather than
//! candles.

use rust_decimal::Decimal;

use ebb_domain::indicators::lowest;
use ebb_domain::{Candle, ExitReason, PositionState, StrategyConfig};

/// Outcome of one exit-chain evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitAction {
    /// Keep the position untouched this cycle
    Hold,
    /// Position fields are inconsistent; end the cycle without acting
    AbortInconsistent,
    /// Close the full remaining quantity
    Close {
        /// Quantity to buy back
        qty: Decimal,
        /// Cause recorded on the flattened state
        reason: ExitReason,
    },
    /// Close part of the position (TP1)
    PartialClose {
        /// Quantity to buy back
        qty: Decimal,
    },
    /// Persist a changed trailing stop line
    UpdateStopLine {
        /// New minimum of the recent closed lows
        stop_line: Decimal,
    },
}

/// Evaluate exit-chain steps 3 to 5 for an open short position.
///
/// Priority is fixed: stop-loss, then TP1, then trailing. The stop-loss and
/// trailing checks deliberately read the in-progress close (a realtime
/// price), while the trailing stop line itself comes from closed bars only.
pub fn evaluate_open_position(
    cfg: &StrategyConfig,
    state: &PositionState,
    exit_candles: &[Candle],
) -> ExitAction {
    let Some(current) = exit_candles.last() else {
        return ExitAction::Hold;
    };
    let price = current.close;

    // State defense: a missing or non-positive entry/stop is an inconsistency
    // that must never be inferred away. End the cycle without flattening.
    let (Some(entry), Some(sl)) = (state.entry_price, state.sl_price) else {
        return ExitAction::AbortInconsistent;
    };
    if entry <= Decimal::ZERO || sl <= Decimal::ZERO {
        return ExitAction::AbortInconsistent;
    }

    // Step 3: stop-loss. For a short, the stop sits above entry.
    if price >= sl {
        return ExitAction::Close {
            qty: state.remaining_qty,
            reason: ExitReason::SlExit,
        };
    }

    // Step 4: TP1 partial exit, once.
    let pnl_pct = (entry - price) / entry * Decimal::ONE_HUNDRED;
    if cfg.tp1_enabled && !state.tp1_filled && pnl_pct >= cfg.tp1_pct {
        let qty = state.remaining_qty * cfg.tp1_split;
        if qty <= Decimal::ZERO {
            return ExitAction::Hold;
        }
        return ExitAction::PartialClose { qty };
    }

    // Step 5: trailing exit.
    if state.trailing_active {
        let n = cfg.trailing_lookback;
        if n == 0 {
            return ExitAction::Hold;
        }
        // One in-progress bar, N closed bars, one spare.
        if exit_candles.len() < n + 2 {
            return ExitAction::Hold;
        }
        let closed = &exit_candles[..exit_candles.len() - 1];
        let lows: Vec<Decimal> = closed.iter().map(|c| c.low).collect();
        let Ok(stop_line) = lowest(&lows, n) else {
            return ExitAction::Hold;
        };

        if price > stop_line {
            return ExitAction::Close {
                qty: state.remaining_qty,
                reason: ExitReason::TrailingExit,
            };
        }
        if state.stop_line != Some(stop_line) {
            return ExitAction::UpdateStopLine { stop_line };
        }
    }

    ExitAction::Hold
}

// =============================================================================
// Tests
// =============================================================================
