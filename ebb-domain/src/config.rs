//! Strategy parameters.
//!
//! Loaded once at startup and never mutated afterwards. The daemon owns the
//! environment plumbing; this type only owns the values and their bounds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::DomainError;

/// Immutable strategy parameters for the short engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Gate entries on the reference-instrument regime
    pub regime_filter_enabled: bool,
    /// Require the mother trigger before entering
    pub entry_filter_enabled: bool,
    /// Require a minimum previous-bar range
    pub volatility_filter_enabled: bool,
    /// Require a previous-bar volume spike
    pub volume_filter_enabled: bool,
    /// EMA proximity tolerance, in percent of the EMA
    pub ema_entry_tolerance_pct: Decimal,
    /// Minimum previous-bar range, in percent of its close
    pub volatility_min_pct: Decimal,
    /// Minimum previous-bar volume over the 20-bar closed mean
    pub volume_spike_ratio: Decimal,
    /// Quote-currency notional committed per entry
    pub invest_usdt: Decimal,
    /// Stop-loss distance above entry, in percent
    pub sl_pct: Decimal,
    /// First take-profit stage on/off
    pub tp1_enabled: bool,
    /// Unrealized gain in percent that triggers TP1
    pub tp1_pct: Decimal,
    /// Fraction of the remaining quantity closed at TP1, in (0, 1]
    pub tp1_split: Decimal,
    /// Trailing-stop stage on/off
    pub trailing_enabled: bool,
    /// Closed-bar lookback for the trailing stop line
    pub trailing_lookback: usize,
}

impl StrategyConfig {
    /// Validate parameter bounds.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidConfig` on the first out-of-range value.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.invest_usdt <= Decimal::ZERO {
            return Err(DomainError::InvalidConfig(
                "invest_usdt must be positive".to_string(),
            ));
        }
        if self.sl_pct <= Decimal::ZERO {
            return Err(DomainError::InvalidConfig("sl_pct must be positive".to_string()));
        }
        if self.ema_entry_tolerance_pct < Decimal::ZERO {
            return Err(DomainError::InvalidConfig(
                "ema_entry_tolerance_pct cannot be negative".to_string(),
            ));
        }
        if self.volatility_min_pct < Decimal::ZERO {
            return Err(DomainError::InvalidConfig(
                "volatility_min_pct cannot be negative".to_string(),
            ));
        }
        if self.volume_spike_ratio < Decimal::ZERO {
            return Err(DomainError::InvalidConfig(
                "volume_spike_ratio cannot be negative".to_string(),
            ));
        }
        if self.tp1_pct <= Decimal::ZERO {
            return Err(DomainError::InvalidConfig("tp1_pct must be positive".to_string()));
        }
        if self.tp1_split <= Decimal::ZERO || self.tp1_split > Decimal::ONE {
            return Err(DomainError::InvalidConfig(
                "tp1_split must be within (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            regime_filter_enabled: true,
            entry_filter_enabled: true,
            volatility_filter_enabled: true,
            volume_filter_enabled: true,
            ema_entry_tolerance_pct: dec!(0.3),
            volatility_min_pct: dec!(0.35),
            volume_spike_ratio: dec!(1.8),
            invest_usdt: dec!(50),
            sl_pct: dec!(2),
            tp1_enabled: true,
            tp1_pct: dec!(1.2),
            tp1_split: dec!(0.5),
            trailing_enabled: true,
            trailing_lookback: 3,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_invest() {
        let cfg = StrategyConfig {
            invest_usdt: Decimal::ZERO,
            ..StrategyConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_sl_pct() {
        let cfg = StrategyConfig {
            sl_pct: dec!(-1),
            ..StrategyConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_split_outside_unit_interval() {
        let too_big = StrategyConfig {
            tp1_split: dec!(1.5),
            ..StrategyConfig::default()
        };
        assert!(too_big.validate().is_err());

        let zero = StrategyConfig {
            tp1_split: Decimal::ZERO,
            ..StrategyConfig::default()
        };
        assert!(zero.validate().is_err());

        let full = StrategyConfig {
            tp1_split: Decimal::ONE,
            ..StrategyConfig::default()
        };
        assert!(full.validate().is_ok());
    }
}
