//! Durable position state.
//!
//! The single record that survives a process restart. Everything else the
//! engine needs is recomputed each cycle from fresh market data.
//!
//! # Invariants
//!
//! At the end of every cycle:
//! - flat implies no entry price, no stop, zero remaining quantity and no
//!   trailing sub-state;
//! - open implies a positive entry price, positive remaining quantity, and a
//!   stop-loss derived from the entry price (above it, this engine is
//!   short-only);
//! - a full exit replaces the record wholesale, carrying forward only the
//!   consumed entry candle id and the exit cause.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::types::{DomainError, ExitReason, Regime, Side};

/// Identifier of an entry-timeframe candle: its close time in epoch millis.
pub type CandleId = i64;

/// Durable record of the current position, regime, and consumed-candle
/// bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Whether a position is currently open
    pub has_position: bool,
    /// Position direction; always short in this engine
    pub position_side: Side,
    /// Fill price of the open position; `None` when flat
    pub entry_price: Option<Decimal>,
    /// Quantity still open; decreases on partial exits
    pub remaining_qty: Decimal,
    /// Stop-loss trigger price, derived from the entry price
    pub sl_price: Option<Decimal>,
    /// Whether the first take-profit has already fired
    pub tp1_filled: bool,
    /// Whether the trailing-stop sub-state is live
    pub trailing_active: bool,
    /// Current trailing stop level; valid only while trailing is active
    pub stop_line: Option<Decimal>,
    /// Entry candle consumed for the current/last position
    pub last_entry_candle_id: Option<CandleId>,
    /// Last computed regime
    pub regime: Regime,
    /// Cause of the most recent flatten
    pub exit_reason: Option<ExitReason>,
}

impl PositionState {
    /// Fresh flat state for first boot.
    pub fn flat() -> Self {
        Self {
            has_position: false,
            position_side: Side::Short,
            entry_price: None,
            remaining_qty: Decimal::ZERO,
            sl_price: None,
            tp1_filled: false,
            trailing_active: false,
            stop_line: None,
            last_entry_candle_id: None,
            regime: Regime::Off,
            exit_reason: None,
        }
    }

    /// Flat state after a full exit.
    ///
    /// Carries forward only the consumed entry candle (so the same bar cannot
    /// be re-entered) and the exit cause; regime is forced Off.
    pub fn reset(reason: ExitReason, last_entry_candle_id: Option<CandleId>) -> Self {
        Self {
            last_entry_candle_id,
            exit_reason: Some(reason),
            ..Self::flat()
        }
    }

    /// Stop-loss trigger for a short position: the stop sits above entry.
    pub fn stop_loss_price(entry_price: Decimal, sl_pct: Decimal) -> Decimal {
        entry_price * (Decimal::ONE + sl_pct / Decimal::ONE_HUNDRED)
    }

    /// Fresh short position after a filled entry order.
    ///
    /// Trailing is pre-armed only when trailing is enabled and TP1 is
    /// disabled; with TP1 enabled, trailing arms after the TP1 fill instead.
    ///
    /// # Errors
    /// Returns `DomainError` on a non-positive fill price or quantity.
    pub fn opened(
        entry_price: Decimal,
        filled_qty: Decimal,
        cfg: &StrategyConfig,
        candle_id: CandleId,
        regime: Regime,
    ) -> Result<Self, DomainError> {
        if entry_price <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(entry_price.to_string()));
        }
        if filled_qty <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(filled_qty.to_string()));
        }
        Ok(Self {
            has_position: true,
            position_side: Side::Short,
            entry_price: Some(entry_price),
            remaining_qty: filled_qty,
            sl_price: Some(Self::stop_loss_price(entry_price, cfg.sl_pct)),
            tp1_filled: false,
            trailing_active: cfg.trailing_enabled && !cfg.tp1_enabled,
            stop_line: None,
            last_entry_candle_id: Some(candle_id),
            regime,
            exit_reason: None,
        })
    }

    /// Bookkeeping after a filled TP1 order.
    ///
    /// The stop line is always cleared so trailing starts fresh from the next
    /// recompute.
    pub fn apply_tp1_fill(&mut self, closed_qty: Decimal, trailing_enabled: bool) {
        self.remaining_qty -= closed_qty;
        self.tp1_filled = true;
        self.trailing_active = trailing_enabled;
        self.stop_line = None;
    }

    /// Field-presence invariants: flat states carry no position fields, open
    /// states carry all of them.
    pub fn invariants_ok(&self) -> bool {
        if self.has_position {
            matches!(self.entry_price, Some(p) if p > Decimal::ZERO)
                && self.remaining_qty > Decimal::ZERO
                && matches!(self.sl_price, Some(p) if p > Decimal::ZERO)
        } else {
            self.entry_price.is_none()
                && self.remaining_qty == Decimal::ZERO
                && self.sl_price.is_none()
                && !self.tp1_filled
                && !self.trailing_active
                && self.stop_line.is_none()
        }
    }
}

impl Default for PositionState {
    fn default() -> Self {
        Self::flat()
    }
}

// =============================================================================
// Tests
// =============================================================================
