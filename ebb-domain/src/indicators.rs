//! Indicator math (pure functions).
//!
//! All functions are deterministic, allocation-free, and operate on slices of
//! `Decimal`. Callers are responsible for passing closed-bar values only; an
//! in-progress bar must be sliced off before these are applied.

use rust_decimal::Decimal;

use crate::types::DomainError;

/// Exponential moving average over the full series.
///
/// Seeds with the simple average of the first `period` values, then applies
/// the standard recursive smoothing `e = v * k + e * (1 - k)` with
/// `k = 2 / (period + 1)` across the rest.
///
/// # Errors
/// Returns `DomainError::InvalidWindow` for a zero period and
/// `DomainError::InsufficientData` when the series is shorter than the period.
pub fn ema(values: &[Decimal], period: usize) -> Result<Decimal, DomainError> {
    if period == 0 {
        return Err(DomainError::InvalidWindow(period));
    }
    if values.len() < period {
        return Err(DomainError::InsufficientData {
            need: period,
            got: values.len(),
        });
    }

    let n = Decimal::from(period as u64);
    let mut e = values[..period].iter().copied().sum::<Decimal>() / n;
    let k = Decimal::TWO / (n + Decimal::ONE);
    for v in &values[period..] {
        e = *v * k + e * (Decimal::ONE - k);
    }
    Ok(e)
}

/// Minimum of the trailing `window` values.
///
/// # Errors
/// Returns `DomainError::InvalidWindow` for a zero window and
/// `DomainError::InsufficientData` when the series is shorter than the window.
pub fn lowest(values: &[Decimal], window: usize) -> Result<Decimal, DomainError> {
    if window == 0 {
        return Err(DomainError::InvalidWindow(window));
    }
    if values.len() < window {
        return Err(DomainError::InsufficientData {
            need: window,
            got: values.len(),
        });
    }
    values[values.len() - window..]
        .iter()
        .copied()
        .min()
        .ok_or(DomainError::InsufficientData { need: window, got: 0 })
}

/// Arithmetic mean; `None` on an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    sum.checked_div(Decimal::from(values.len() as u64))
}

// =============================================================================
// Tests
// =============================================================================
