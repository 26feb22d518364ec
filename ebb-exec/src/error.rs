//! Execution and feed error types.
//!
//! Every failure class the engine pattern-matches on is a distinct variant;
//! nothing is classified by catching panics.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the market data feed.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Feed returned nothing or fewer candles than the caller needs
    #[error("feed returned {got} candles, need {need}")]
    Unavailable {
        /// Candles delivered
        got: usize,
        /// Candles required
        need: usize,
    },

    /// HTTP transport failure
    #[error("feed transport error: {0}")]
    Transport(String),

    /// Request timed out
    #[error("feed request timed out")]
    Timeout,

    /// Response body did not parse
    #[error("failed to parse feed response: {0}")]
    Parse(String),
}

/// Errors from the order execution venue.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// Venue rejected the order
    #[error("order rejected: {code} - {msg}")]
    Rejected {
        /// Venue error code
        code: i64,
        /// Venue error message
        msg: String,
    },

    /// Normalized quantity fell below the venue minimum
    #[error("quantity {qty} below venue minimum {min}")]
    QuantityTooSmall {
        /// Quantity after lot normalization
        qty: Decimal,
        /// Venue minimum quantity
        min: Decimal,
    },

    /// Requested quantity was not positive
    #[error("invalid order quantity: {0}")]
    InvalidQuantity(Decimal),

    /// HTTP transport failure
    #[error("order transport error: {0}")]
    Transport(String),

    /// Request timed out
    #[error("order request timed out")]
    Timeout,

    /// Response body did not parse
    #[error("failed to parse venue response: {0}")]
    Parse(String),

    /// Request signing failed
    #[error("failed to sign request: {0}")]
    Signature(String),
}
