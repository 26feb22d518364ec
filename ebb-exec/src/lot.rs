//! Venue lot-size normalization.
//!
//! Order quantities are floored to the venue's step grid before submission.
//! A result below the venue minimum is a typed rejection, never a silent
//! clamp to zero.

use rust_decimal::Decimal;

use crate::error::ExecError;

/// Venue lot-size constraints for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotSizeFilter {
    /// Minimum tradable increment
    pub step_size: Decimal,
    /// Minimum order quantity
    pub min_qty: Decimal,
}

/// Floor a quantity to the step grid and rescale to the step's precision.
///
/// # Errors
/// - `ExecError::InvalidQuantity` for a non-positive request or step
/// - `ExecError::QuantityTooSmall` when the floored quantity is below the
///   venue minimum
pub fn normalize_qty(qty: Decimal, filter: &LotSizeFilter) -> Result<Decimal, ExecError> {
    if qty <= Decimal::ZERO {
        return Err(ExecError::InvalidQuantity(qty));
    }
    if filter.step_size <= Decimal::ZERO {
        return Err(ExecError::InvalidQuantity(filter.step_size));
    }

    let steps = (qty / filter.step_size).floor();
    let mut normalized = steps * filter.step_size;
    normalized.rescale(filter.step_size.scale());

    if normalized < filter.min_qty {
        return Err(ExecError::QuantityTooSmall {
            qty: normalized,
            min: filter.min_qty,
        });
    }
    Ok(normalized)
}

// =============================================================================
// Tests
// =============================================================================
