//! The trading engine: one decision cycle per invocation.
//!
//! Cycle order is a design invariant, not an accident of code layout:
//! reference-data failure is checked first, then the regime transition, then
//! traded-instrument freshness, then the exit chain for an open position, and
//! only ever last the entry evaluation. Exit handling for a cycle always
//! completes (or aborts) before entry evaluation is attempted in that cycle.
//!
//! Order submission and the matching state reset are one logical unit: when a
//! closing order fails, the reset is skipped and the previous state stays on
//! the books for the next cycle's retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ebb_domain::{Candle, ExitReason, OrderSide, PositionState, Regime};
use ebb_engine::{
    detect_regime, evaluate_entry, evaluate_open_position, AnchorCache, ExitAction,
};
use ebb_exec::{MarketDataFeed, OrderExecutionService};
use ebb_store::StateStore;

use crate::config::Config;
use crate::error::DaemonResult;

// =============================================================================
// Engine Context
// =============================================================================

/// Mutable engine state threaded through cycles.
///
/// An explicit value rather than ambient globals, so the single-writer
/// discipline stays visible and testable.
#[derive(Debug)]
pub struct EngineContext {
    /// Durable position state, persisted after every mutation
    pub state: PositionState,
    /// Regime latch for the edge-triggered transition exit
    pub prev_regime: Regime,
    /// One-shot entry suppression after a positioned restart
    pub boot_skip_entry: bool,
    /// An exit fired in the current cycle
    pub just_exited: bool,
    /// Cached daily anchor for the reference instrument
    pub anchor: Option<AnchorCache>,
}

// =============================================================================
// Trading Engine
// =============================================================================

/// Orchestrates one decision cycle: data, regime, exits, entry.
pub struct TradingEngine<F, X, S> {
    cfg: Config,
    feed: Arc<F>,
    exec: Arc<X>,
    store: Arc<S>,
    ctx: EngineContext,
}

impl<F, X, S> TradingEngine<F, X, S>
where
    F: MarketDataFeed,
    X: OrderExecutionService,
    S: StateStore,
{
    /// Boot the engine: load persisted state and repair reboot invariants.
    ///
    /// A load failure of any kind boots flat instead of propagating; losing
    /// track of a pre-existing position is the accepted tradeoff against
    /// crash-looping.
    pub async fn boot(
        cfg: Config,
        feed: Arc<F>,
        exec: Arc<X>,
        store: Arc<S>,
    ) -> DaemonResult<Self> {
        cfg.strategy.validate()?;

        let state = match store.load().await {
            Ok(Some(mut state)) => {
                // Reboot repair: the stop-loss is always recomputed from the
                // entry price and the current config, never trusted from disk.
                if state.has_position {
                    if let Some(entry) = state.entry_price.filter(|p| *p > Decimal::ZERO) {
                        state.sl_price =
                            Some(PositionState::stop_loss_price(entry, cfg.strategy.sl_pct));
                    }
                }
                state
            }
            Ok(None) => PositionState::flat(),
            Err(e) => {
                warn!(error = %e, "state load failed, booting flat");
                PositionState::flat()
            }
        };

        let ctx = EngineContext {
            prev_regime: state.regime,
            boot_skip_entry: state.has_position,
            just_exited: false,
            anchor: None,
            state,
        };
        info!(
            has_position = ctx.state.has_position,
            regime = %ctx.state.regime,
            "engine booted"
        );
        Ok(Self {
            cfg,
            feed,
            exec,
            store,
            ctx,
        })
    }

    /// Durable state as of the last completed cycle.
    pub fn state(&self) -> &PositionState {
        &self.ctx.state
    }

    /// Engine context, for assertions in integration tests.
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Run cycles forever, separated by the configured poll interval.
    ///
    /// Cycle failures trip the fail-safe but never end the loop; only the
    /// shutdown token does.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.cfg.poll_interval.as_millis() as u64,
            trade_symbol = %self.cfg.trade_symbol,
            reference_symbol = %self.cfg.reference_symbol,
            "engine loop started"
        );
        loop {
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "cycle failed");
                self.fail_safe().await;
            }
            debug_assert!(self.ctx.state.invariants_ok());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, engine loop stopping");
                    break;
                }
                _ = tokio::time::sleep(self.cfg.poll_interval) => {}
            }
        }
    }

    /// One decision cycle.
    pub async fn run_cycle(&mut self) -> DaemonResult<()> {
        self.ctx.just_exited = false;
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let reference = self
            .feed
            .candles(
                &self.cfg.reference_symbol,
                &self.cfg.reference_timeframe,
                self.cfg.candle_limit,
            )
            .await;
        let entry_series = self
            .feed
            .candles(
                &self.cfg.trade_symbol,
                &self.cfg.entry_timeframe,
                self.cfg.candle_limit,
            )
            .await;
        let exit_series = self
            .feed
            .candles(
                &self.cfg.trade_symbol,
                &self.cfg.exit_timeframe,
                self.cfg.candle_limit,
            )
            .await;

        // Exit chain step 1: reference failure outranks everything and runs
        // before the position is even looked at.
        let reference = match reference {
            Ok(candles) if !is_stale(&candles, self.cfg.reference_stale_ms, now_ms) => candles,
            _ => {
                return self
                    .fail_reference("reference feed unavailable or stale")
                    .await
            }
        };

        let regime = match self.compute_regime(&reference, now).await {
            Ok(regime) => regime,
            Err(e) => {
                warn!(error = %e, "regime computation failed");
                return self.fail_reference("regime computation failed").await;
            }
        };
        self.ctx.state.regime = regime;

        // Exit chain step 2: edge-triggered regime transition exit.
        if self.ctx.state.has_position
            && self.ctx.prev_regime == Regime::On
            && regime == Regime::Off
        {
            self.ctx.prev_regime = Regime::Off;
            return self.close_position(ExitReason::RegimeExit).await;
        }
        self.ctx.prev_regime = regime;

        // Traded-instrument freshness: no information means no decision. The
        // reference-side exits above have already been applied and stand.
        let fresh_entry =
            matches!(&entry_series, Ok(c) if !is_stale(c, self.cfg.trade_stale_ms, now_ms));
        let fresh_exit =
            matches!(&exit_series, Ok(c) if !is_stale(c, self.cfg.trade_stale_ms, now_ms));
        if !fresh_entry || !fresh_exit {
            debug!("traded-instrument feed unavailable or stale, holding");
            return Ok(());
        }
        let (Ok(entry_series), Ok(exit_series)) = (entry_series, exit_series) else {
            return Ok(());
        };

        // A position blocks entry evaluation unconditionally this cycle.
        if self.ctx.state.has_position {
            return self.run_exit_chain(&exit_series).await;
        }

        self.run_entry(&entry_series).await
    }

    // =========================================================================
    // Cycle steps
    // =========================================================================

    /// Read-through anchor refresh plus regime detection.
    async fn compute_regime(
        &mut self,
        reference: &[Candle],
        now: DateTime<Utc>,
    ) -> DaemonResult<Regime> {
        let anchor_price = match self.ctx.anchor {
            Some(cache) if !cache.refresh_due(now) => cache.price,
            _ => {
                let price = self.feed.daily_open(&self.cfg.reference_symbol).await?;
                debug!(%price, "daily anchor refreshed");
                self.ctx.anchor = Some(AnchorCache::new(now, price));
                price
            }
        };

        let closes: Vec<Decimal> = reference[..reference.len() - 1]
            .iter()
            .map(|c| c.close)
            .collect();
        Ok(detect_regime(&closes, anchor_price)?)
    }

    /// Exit chain steps 3 to 5 for an open position.
    async fn run_exit_chain(&mut self, exit_series: &[Candle]) -> DaemonResult<()> {
        match evaluate_open_position(&self.cfg.strategy, &self.ctx.state, exit_series) {
            ExitAction::Hold => Ok(()),
            ExitAction::AbortInconsistent => {
                warn!("position fields inconsistent, ending cycle without action");
                self.ctx.just_exited = true;
                Ok(())
            }
            ExitAction::Close { reason, .. } => self.close_position(reason).await,
            ExitAction::PartialClose { qty } => self.take_partial_profit(qty).await,
            ExitAction::UpdateStopLine { stop_line } => {
                self.ctx.state.stop_line = Some(stop_line);
                self.store.save(&self.ctx.state).await?;
                debug!(%stop_line, "trailing stop line updated");
                Ok(())
            }
        }
    }

    /// Entry evaluation for a flat engine.
    async fn run_entry(&mut self, entry_series: &[Candle]) -> DaemonResult<()> {
        if self.ctx.boot_skip_entry {
            // One flat cycle of fresh context after a positioned restart.
            self.ctx.boot_skip_entry = false;
            debug!("boot skip: entry evaluation suppressed this cycle");
            return Ok(());
        }
        if self.ctx.just_exited {
            return Ok(());
        }
        if self.cfg.strategy.regime_filter_enabled && self.ctx.state.regime != Regime::On {
            return Ok(());
        }

        let signal = match evaluate_entry(
            &self.cfg.strategy,
            entry_series,
            self.ctx.state.last_entry_candle_id,
        )? {
            Some(signal) => signal,
            None => return Ok(()),
        };

        let Some(qty) = self.cfg.strategy.invest_usdt.checked_div(signal.price) else {
            return Ok(());
        };
        if qty <= Decimal::ZERO {
            return Ok(());
        }

        match self.exec.place_market_order(OrderSide::Sell, qty, false).await {
            Ok(filled) if filled > Decimal::ZERO => {
                self.ctx.state = PositionState::opened(
                    signal.price,
                    filled,
                    &self.cfg.strategy,
                    signal.candle_id,
                    self.ctx.state.regime,
                )?;
                self.store.save(&self.ctx.state).await?;
                info!(price = %signal.price, qty = %filled, "short opened");
            }
            Ok(_) => {}
            Err(e) => {
                // Nothing is at risk while flat; log and wait for the next
                // cycle.
                warn!(error = %e, "entry order rejected, no position opened");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Exits
    // =========================================================================

    /// Full reduce-only close plus wholesale state reset, as one unit.
    async fn close_position(&mut self, reason: ExitReason) -> DaemonResult<()> {
        let qty = self.ctx.state.remaining_qty;
        self.exec.place_market_order(OrderSide::Buy, qty, true).await?;

        let last_id = self.ctx.state.last_entry_candle_id;
        self.ctx.state = PositionState::reset(reason, last_id);
        self.store.save(&self.ctx.state).await?;
        self.ctx.just_exited = true;
        info!(%reason, %qty, "position closed");
        Ok(())
    }

    /// TP1 partial exit. Order failure must not move the books; the same
    /// condition simply re-evaluates next cycle.
    async fn take_partial_profit(&mut self, qty: Decimal) -> DaemonResult<()> {
        match self.exec.place_market_order(OrderSide::Buy, qty, true).await {
            Ok(filled) => {
                self.ctx
                    .state
                    .apply_tp1_fill(filled, self.cfg.strategy.trailing_enabled);
                self.store.save(&self.ctx.state).await?;
                info!(
                    %filled,
                    remaining = %self.ctx.state.remaining_qty,
                    "tp1 partial exit filled"
                );
            }
            Err(e) => {
                warn!(error = %e, "tp1 order failed, state unchanged");
            }
        }
        Ok(())
    }

    /// Exit chain step 1: fail closed on any reference-side failure.
    async fn fail_reference(&mut self, why: &str) -> DaemonResult<()> {
        warn!(why, "failing closed: regime forced OFF");
        self.ctx.state.regime = Regime::Off;
        self.ctx.prev_regime = Regime::Off;

        if self.ctx.state.has_position && self.ctx.state.remaining_qty > Decimal::ZERO {
            return self.close_position(ExitReason::BtcDataFail).await;
        }
        self.store.save(&self.ctx.state).await?;
        Ok(())
    }

    /// Best-effort recovery after an error escaped the cycle.
    ///
    /// With a position on the books this tries one full close and reset. If
    /// that close itself fails, the position stays recorded for the next
    /// cycle's retry and only the regime and failure reason are forced.
    async fn fail_safe(&mut self) {
        if self.ctx.state.has_position && self.ctx.state.remaining_qty > Decimal::ZERO {
            match self
                .exec
                .place_market_order(OrderSide::Buy, self.ctx.state.remaining_qty, true)
                .await
            {
                Ok(_) => {
                    let last_id = self.ctx.state.last_entry_candle_id;
                    self.ctx.state = PositionState::reset(ExitReason::EngineException, last_id);
                    self.ctx.just_exited = true;
                    warn!("fail-safe close executed");
                    if let Err(e) = self.store.save(&self.ctx.state).await {
                        error!(error = %e, "failed to persist state after fail-safe close");
                    }
                    return;
                }
                Err(e) => {
                    error!(error = %e, "fail-safe close failed, keeping position on the books");
                }
            }
        }

        self.ctx.state.regime = Regime::Off;
        self.ctx.prev_regime = Regime::Off;
        self.ctx.state.exit_reason = Some(ExitReason::EngineException);
        if let Err(e) = self.store.save(&self.ctx.state).await {
            error!(error = %e, "failed to persist state after cycle failure");
        }
    }
}

// =============================================================================
// Freshness
// =============================================================================

/// A series is unusable when it has fewer than two bars or its last closed
/// bar is older than the staleness threshold. The in-progress bar never
/// counts towards freshness.
fn is_stale(candles: &[Candle], stale_ms: i64, now_ms: i64) -> bool {
    if candles.len() < 2 {
        return true;
    }
    let closed = &candles[candles.len() - 2];
    now_ms - closed.close_time > stale_ms
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle_at(close_time: i64) -> Candle {
        Candle {
            open: dec!(100),
            high: dec!(100),
            low: dec!(100),
            close: dec!(100),
            volume: dec!(1),
            close_time,
        }
    }

    #[test]
    fn test_staleness_uses_last_closed_bar() {
        let now_ms = 1_700_000_000_000;
        // Closed bar right at now, in-progress bar in the future.
        let fresh = vec![candle_at(now_ms - 180_000), candle_at(now_ms), candle_at(now_ms + 180_000)];
        assert!(!is_stale(&fresh, 600_000, now_ms));

        // Closed bar too old even though the in-progress bar looks current.
        let stale = vec![candle_at(now_ms - 900_000), candle_at(now_ms + 180_000)];
        assert!(is_stale(&stale, 600_000, now_ms));
    }

    #[test]
    fn test_short_series_is_stale() {
        let now_ms = 1_700_000_000_000;
        assert!(is_stale(&[], 600_000, now_ms));
        assert!(is_stale(&[candle_at(now_ms)], 600_000, now_ms));
    }

    #[test]
    fn test_staleness_boundary_is_exclusive() {
        let now_ms = 1_700_000_000_000;
        let series = vec![candle_at(now_ms - 600_000), candle_at(now_ms + 180_000)];
        // Exactly at the threshold still counts as fresh.
        assert!(!is_stale(&series, 600_000, now_ms));
        assert!(is_stale(&series, 599_999, now_ms));
    }
}
