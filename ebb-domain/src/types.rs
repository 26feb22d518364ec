//! Closed enumerations and validated primitives.
//!
//! Regime, side, and exit cause are fixed enumerations so illegal states are
//! unrepresentable and match arms stay exhaustive. The serialized spellings
//! are part of the durable state-file format and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for validation and invariant checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Symbol must be a non-empty exchange pair
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Strategy parameter out of range
    #[error("invalid strategy config: {0}")]
    InvalidConfig(String),

    /// Indicator input shorter than the required window
    #[error("insufficient data: need {need}, got {got}")]
    InsufficientData {
        /// Minimum number of values required
        need: usize,
        /// Number of values supplied
        got: usize,
    },

    /// Indicator window must be at least 1
    #[error("invalid window: {0}")]
    InvalidWindow(usize),
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol is an exchange trading pair (e.g. SUIUSDT).
///
/// # Invariants
/// - Non-empty, ASCII alphanumeric, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Create a Symbol with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if the pair is empty or contains
    /// non-alphanumeric characters.
    pub fn new(pair: &str) -> Result<Self, DomainError> {
        let trimmed = pair.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidSymbol(pair.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the pair as an uppercase string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Side / OrderSide
// =============================================================================

/// Side represents the position direction. This engine only ever shorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Short position (sell high, buy back low)
    #[serde(rename = "SHORT")]
    Short,
}

impl Side {
    /// Order direction that opens this side.
    pub fn entry_action(&self) -> OrderSide {
        match self {
            Side::Short => OrderSide::Sell,
        }
    }

    /// Order direction that closes this side.
    pub fn exit_action(&self) -> OrderSide {
        match self {
            Side::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// OrderSide represents the order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Regime
// =============================================================================

/// Binary market-direction gate derived from the reference instrument.
///
/// `On` permits new entries; `Off` blocks them and, on an `On -> Off`
/// transition, forces an open position closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Reference trend supports short entries
    #[serde(rename = "ON")]
    On,
    /// Reference trend does not support entries
    #[serde(rename = "OFF")]
    Off,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::On => write!(f, "ON"),
            Regime::Off => write!(f, "OFF"),
        }
    }
}

// =============================================================================
// ExitReason
// =============================================================================

/// Cause of the most recent position flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Reference feed unavailable/stale or regime computation failed
    BtcDataFail,
    /// Regime flipped from On to Off while positioned
    RegimeExit,
    /// Stop-loss level breached
    SlExit,
    /// Price closed back above the trailing stop line
    TrailingExit,
    /// Uncaught cycle failure triggered the fail-safe close
    EngineException,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::BtcDataFail => "BTC_DATA_FAIL",
            ExitReason::RegimeExit => "REGIME_EXIT",
            ExitReason::SlExit => "SL_EXIT",
            ExitReason::TrailingExit => "TRAILING_EXIT",
            ExitReason::EngineException => "ENGINE_EXCEPTION",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_validation() {
        let symbol = Symbol::new("suiusdt").unwrap();
        assert_eq!(symbol.as_str(), "SUIUSDT");
        assert_eq!(symbol.to_string(), "SUIUSDT");

        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("   ").is_err());
        assert!(Symbol::new("BTC/USDT").is_err());
    }

    #[test]
    fn test_side_actions() {
        assert_eq!(Side::Short.entry_action(), OrderSide::Sell);
        assert_eq!(Side::Short.exit_action(), OrderSide::Buy);
    }

    #[test]
    fn test_regime_wire_format() {
        assert_eq!(serde_json::to_string(&Regime::On).unwrap(), "\"ON\"");
        assert_eq!(serde_json::to_string(&Regime::Off).unwrap(), "\"OFF\"");
        assert_eq!(serde_json::from_str::<Regime>("\"ON\"").unwrap(), Regime::On);
    }

    #[test]
    fn test_exit_reason_wire_format() {
        assert_eq!(
            serde_json::to_string(&ExitReason::BtcDataFail).unwrap(),
            "\"BTC_DATA_FAIL\""
        );
        assert_eq!(
            serde_json::to_string(&ExitReason::TrailingExit).unwrap(),
            "\"TRAILING_EXIT\""
        );
        assert_eq!(ExitReason::SlExit.to_string(), "SL_EXIT");
        assert_eq!(ExitReason::EngineException.to_string(), "ENGINE_EXCEPTION");
    }
}
