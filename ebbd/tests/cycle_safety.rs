//! Full-cycle safety properties: fail-closed reference handling, exit and
//! entry ordering, dedup, and partial-exit atomicity.

mod common;

use common::*;
use ebb_domain::{ExitReason, OrderSide, Regime};
use ebb_store::MemoryStateStore;
use ebbd::Config;
use rust_decimal_macros::dec;

#[tokio::test]
async fn reference_failure_flattens_with_one_reduce_only_close() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(5), Regime::On));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_trade(dec!(100), dec!(99), now);
    // No reference series scripted: the feed signals unavailable.

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    let orders = h.exchange.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].quantity, dec!(5));
    assert!(orders[0].reduce_only);

    let state = engine.state();
    assert!(!state.has_position);
    assert_eq!(state.exit_reason, Some(ExitReason::BtcDataFail));
    assert_eq!(state.regime, Regime::Off);
    assert!(state.invariants_ok());
}

#[tokio::test]
async fn regime_calc_failure_fails_closed_like_missing_data() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(2), Regime::On));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    // Reference klines are fresh, but the daily-anchor fetch fails.
    h.feed.set_series(
        &h.cfg.reference_symbol,
        &h.cfg.reference_timeframe,
        scripted_series(30, dec!(100), now),
    );
    h.script_trade(dec!(100), dec!(99), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    assert_eq!(h.exchange.order_count(), 1);
    let state = engine.state();
    assert!(!state.has_position);
    assert_eq!(state.exit_reason, Some(ExitReason::BtcDataFail));
    assert_eq!(state.regime, Regime::Off);
}

#[tokio::test]
async fn reference_failure_while_flat_only_forces_regime_off() {
    let h = Harness::new(Config::test());
    let now = now_ms();
    h.script_trade(dec!(100), dec!(99), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    assert_eq!(h.exchange.order_count(), 0);
    assert!(!engine.state().has_position);
    assert_eq!(engine.state().regime, Regime::Off);
}

#[tokio::test]
async fn regime_edge_exit_closes_full_position() {
    // Persisted regime On, freshly computed Off: the edge forces a close.
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(3), Regime::On));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    h.script_trade(dec!(100), dec!(99), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    let orders = h.exchange.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].quantity, dec!(3));
    assert!(orders[0].reduce_only);
    assert_eq!(engine.state().exit_reason, Some(ExitReason::RegimeExit));
    assert!(!engine.state().has_position);
}

#[tokio::test]
async fn level_off_regime_without_edge_does_not_exit() {
    // Persisted regime already Off: no On -> Off edge, the position holds.
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(3), Regime::Off));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    h.script_trade(dec!(100), dec!(99), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    assert_eq!(h.exchange.order_count(), 0);
    assert!(engine.state().has_position);
}

#[tokio::test]
async fn stale_trade_feed_means_no_decision() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(2), Regime::Off));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    // Trade series stamped far in the past; the stop is breached on paper,
    // but stale data never drives a decision.
    h.script_trade(dec!(100), dec!(103), now - 10_000_000);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    assert_eq!(h.exchange.order_count(), 0);
    assert!(engine.state().has_position);
    assert_eq!(engine.state().remaining_qty, dec!(2));
}

#[tokio::test]
async fn tp1_rejection_leaves_state_untouched() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(4), Regime::Off));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    // 1.3% unrealized gain, past the 1.2% TP1 threshold.
    h.script_trade(dec!(100), dec!(98.7), now);
    h.exchange.reject_all(true);

    let mut engine = h.boot().await;
    let before = engine.state().clone();
    let saves_before = h.store.save_count();

    engine.run_cycle().await.unwrap();

    assert_eq!(engine.state(), &before);
    assert_eq!(h.store.save_count(), saves_before);
    assert_eq!(h.exchange.order_count(), 0);
}

#[tokio::test]
async fn tp1_fill_reduces_position_and_arms_trailing() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(4), Regime::Off));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    h.script_trade(dec!(100), dec!(98.7), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();

    let orders = h.exchange.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].quantity, dec!(2));
    assert!(orders[0].reduce_only);

    let state = engine.state();
    assert!(state.has_position);
    assert_eq!(state.remaining_qty, dec!(2));
    assert!(state.tp1_filled);
    assert!(state.trailing_active);
    assert_eq!(state.stop_line, None);
    assert!(state.invariants_ok());
}

#[tokio::test]
async fn failed_close_keeps_previous_state_for_retry() {
    let store = MemoryStateStore::seeded(open_short(dec!(100), dec!(2), Regime::Off));
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    // Stop breached, but the venue rejects the close.
    h.script_trade(dec!(100), dec!(103), now);
    h.exchange.reject_all(true);

    let mut engine = h.boot().await;
    assert!(engine.run_cycle().await.is_err());
    assert!(engine.state().has_position);
    assert_eq!(engine.state().remaining_qty, dec!(2));

    // Venue recovers: the next cycle retries the same exit.
    h.exchange.reject_all(false);
    engine.run_cycle().await.unwrap();
    assert!(!engine.state().has_position);
    assert_eq!(engine.state().exit_reason, Some(ExitReason::SlExit));
}

#[tokio::test]
async fn consumed_entry_candle_is_never_reentered() {
    let h = Harness::new(Config::test());
    let now = now_ms();
    h.script_reference(now);
    h.script_trade(dec!(100), dec!(99), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();
    assert!(engine.state().has_position);
    assert_eq!(h.exchange.order_count(), 1);
    let consumed = engine.state().last_entry_candle_id;
    assert!(consumed.is_some());

    // Price spikes through the stop: the short closes, the consumed candle
    // id survives the reset.
    h.script_trade(dec!(100), dec!(103), now);
    engine.run_cycle().await.unwrap();
    assert!(!engine.state().has_position);
    assert_eq!(engine.state().exit_reason, Some(ExitReason::SlExit));
    assert_eq!(engine.state().last_entry_candle_id, consumed);
    assert_eq!(h.exchange.order_count(), 2);

    // Same closed candle set again: every filter passes, the dedup blocks.
    h.script_trade(dec!(100), dec!(99), now);
    engine.run_cycle().await.unwrap();
    assert!(!engine.state().has_position);
    assert_eq!(h.exchange.order_count(), 2);
}

#[tokio::test]
async fn trailing_stop_line_persists_only_on_change() {
    let mut seeded = open_short(dec!(100), dec!(2), Regime::Off);
    seeded.tp1_filled = true;
    seeded.trailing_active = true;
    let store = MemoryStateStore::seeded(seeded);
    let h = Harness::with_store(Config::test(), store);
    let now = now_ms();
    h.script_reference(now);
    // Closed lows sit at 99; live close 98 stays at or below the stop line.
    h.script_trade(dec!(100), dec!(98), now);

    let mut engine = h.boot().await;
    engine.run_cycle().await.unwrap();
    assert_eq!(engine.state().stop_line, Some(dec!(99)));
    assert_eq!(h.store.save_count(), 1);

    // Unchanged stop line: no redundant write.
    engine.run_cycle().await.unwrap();
    assert_eq!(h.store.save_count(), 1);

    // Live close crosses back above the stop line: remainder closes.
    h.script_trade(dec!(100), dec!(99.5), now);
    engine.run_cycle().await.unwrap();
    assert!(!engine.state().has_position);
    assert_eq!(engine.state().exit_reason, Some(ExitReason::TrailingExit));
    assert_eq!(h.exchange.order_count(), 1);
}
