//! Engine error types.

use ebb_domain::DomainError;
use thiserror::Error;

/// Errors from pure decision logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Candle series shorter than the evaluation requires
    #[error("insufficient candles: need {need}, got {got}")]
    InsufficientCandles {
        /// Minimum number of candles required
        need: usize,
        /// Number of candles supplied
        got: usize,
    },

    /// Indicator computation failed
    #[error("indicator failure: {0}")]
    Indicator(#[from] DomainError),
}
