//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Rupiah                                           │
//! │    Prices, totals, costs and debts are all whole-rupiah i64 values.    │
//! │    The one place a float appears is the margin rate, and the result    │
//! │    is immediately rounded back onto the 500-rupiah grid.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lumbung_core::money::Money;
//!
//! let price = Money::new(12_500);
//! let total = price * 3;
//! assert_eq!(total.amount(), 37_500);
//!
//! // Stock-in price suggestion rounds UP to the nearest 500
//! assert_eq!(Money::new(10_400).round_up_to(500).amount(), 10_500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole rupiah.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and balances
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole rupiah.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount in rupiah.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Rounds **up** to the nearest multiple of `step`.
    ///
    /// Used by the stock-in price suggestion: customers are quoted prices on
    /// a 500-rupiah grid, and rounding down would eat the margin.
    ///
    /// ## Example
    /// ```rust
    /// use lumbung_core::money::Money;
    ///
    /// assert_eq!(Money::new(10_001).round_up_to(500).amount(), 10_500);
    /// assert_eq!(Money::new(10_500).round_up_to(500).amount(), 10_500);
    /// ```
    ///
    /// ## Panics
    /// Panics in debug builds if `step <= 0`.
    #[inline]
    pub fn round_up_to(self, step: i64) -> Self {
        debug_assert!(step > 0, "rounding step must be positive");
        Money(self.0.div_euclid(step) * step + if self.0.rem_euclid(step) > 0 { step } else { 0 })
    }

    /// Clamps negative values to zero. Used for balances due: overpayment
    /// never produces a negative debt.
    #[inline]
    pub const fn max_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// =============================================================================
// Arithmetic Operators
// =============================================================================

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    #[inline]
    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl fmt::Display for Money {
    /// Formats as `Rp12.500` (Indonesian thousands separator).
    /// Display only - never parse money back from this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.0 < 0;
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        if negative {
            write!(f, "-Rp{grouped}")
        } else {
            write!(f, "Rp{grouped}")
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::new(10_000);
        let b = Money::new(2_500);
        assert_eq!((a + b).amount(), 12_500);
        assert_eq!((a - b).amount(), 7_500);
        assert_eq!((b * 4).amount(), 10_000);
    }

    #[test]
    fn test_round_up_to_500() {
        assert_eq!(Money::new(0).round_up_to(500).amount(), 0);
        assert_eq!(Money::new(1).round_up_to(500).amount(), 500);
        assert_eq!(Money::new(499).round_up_to(500).amount(), 500);
        assert_eq!(Money::new(500).round_up_to(500).amount(), 500);
        assert_eq!(Money::new(10_440).round_up_to(500).amount(), 10_500);
        assert_eq!(Money::new(12_000).round_up_to(500).amount(), 12_000);
    }

    #[test]
    fn test_max_zero() {
        assert_eq!(Money::new(-250).max_zero().amount(), 0);
        assert_eq!(Money::new(250).max_zero().amount(), 250);
    }

    #[test]
    fn test_display_grouping() {
        assert_eq!(Money::new(12_500).to_string(), "Rp12.500");
        assert_eq!(Money::new(1_000_000).to_string(), "Rp1.000.000");
        assert_eq!(Money::new(999).to_string(), "Rp999");
        assert_eq!(Money::new(-5_500).to_string(), "-Rp5.500");
    }
}
