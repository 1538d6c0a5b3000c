//! Stock level arithmetic.
//!
//! The authoritative update happens in the `adjust_stock` remote procedure;
//! these helpers only compute the delta to send and reject changes that
//! would obviously take a level below zero.

use thiserror::Error;

/// Stock change that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("stock cannot go below zero (current {current}, change {delta})")]
    WouldGoNegative { current: i32, delta: i32 },
    #[error("stock level {0} is negative")]
    NegativeTarget(i32),
    #[error("stock change overflows")]
    Overflow,
}

/// Delta that moves `current` to `target`.
///
/// # Errors
///
/// Returns [`StockError::NegativeTarget`] for a negative target and
/// [`StockError::Overflow`] if the difference does not fit in an `i32`.
pub fn delta_to_target(current: i32, target: i32) -> Result<i32, StockError> {
    if target < 0 {
        return Err(StockError::NegativeTarget(target));
    }
    target.checked_sub(current).ok_or(StockError::Overflow)
}

/// Level after applying `delta` to `current`.
///
/// # Errors
///
/// Returns [`StockError::WouldGoNegative`] when the result is below zero.
pub fn apply(current: i32, delta: i32) -> Result<i32, StockError> {
    let next = current.checked_add(delta).ok_or(StockError::Overflow)?;
    if next < 0 {
        return Err(StockError::WouldGoNegative { current, delta });
    }
    Ok(next)
}

/// Whether a level counts as low stock for `threshold`.
#[must_use]
pub const fn is_low(stock: i32, threshold: i32) -> bool {
    stock <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_to_target() {
        assert_eq!(delta_to_target(10, 25), Ok(15));
        assert_eq!(delta_to_target(10, 3), Ok(-7));
        assert_eq!(delta_to_target(10, 10), Ok(0));
        assert_eq!(delta_to_target(10, -1), Err(StockError::NegativeTarget(-1)));
    }

    #[test]
    fn test_apply_rejects_negative_result() {
        assert_eq!(apply(5, -5), Ok(0));
        assert_eq!(
            apply(5, -6),
            Err(StockError::WouldGoNegative {
                current: 5,
                delta: -6
            })
        );
    }

    #[test]
    fn test_apply_overflow() {
        assert_eq!(apply(i32::MAX, 1), Err(StockError::Overflow));
    }

    #[test]
    fn test_target_then_apply_lands_on_target() {
        for (current, target) in [(0, 0), (3, 40), (40, 3), (7, 0)] {
            let delta = delta_to_target(current, target).unwrap_or_default();
            assert_eq!(apply(current, delta), Ok(target));
        }
    }

    #[test]
    fn test_is_low() {
        assert!(is_low(5, 5));
        assert!(!is_low(6, 5));
    }
}
