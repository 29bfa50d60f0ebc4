//! # Money Module
//!
//! Provides the `Money` type for prices, debts and payment amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Debt = Σ product prices − Σ payments                                  │
//! │                                                                         │
//! │  In f64:  41957.00 + 38402.00 − 10000.00 may print as 70358.99999...   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    4195700 + 3840200 − 1000000 = 7035900  →  "70359.00"                │
//! │                                                                         │
//! │  Float input (exchange rates, weights) is rounded to cents ONCE per    │
//! │  computed figure, then every sum is exact.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price = Money::from_cents(4195700);
//! let paid = Money::from_amount(10000.0);
//! assert_eq!((price - paid).to_string(), "31957.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::MAX_DISCOUNT_PERCENT;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (kopecks for roubles, cents for euro).
///
/// The currency is implied by the field holding the value: allocation
/// `sum_euro` is euro, everything derived after the exchange rate is roubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount, rounding half away
    /// from zero to the nearest minor unit.
    ///
    /// This is the single place where float arithmetic enters money.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_amount(419.57).cents(), 41957);
    /// assert_eq!(Money::from_amount(0.005).cents(), 1);
    /// assert_eq!(Money::from_amount(f64::NAN).cents(), 0);
    /// ```
    pub fn from_amount(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        // Nudge by a tiny epsilon so 0.005 stored as 0.00499999... still
        // rounds the way a human reads it.
        let scaled = amount * 100.0;
        let nudged = scaled + scaled.signum() * 1e-7;
        Money(nudged.round() as i64)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal amount (for ratios and display only).
    #[inline]
    pub fn to_amount(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Applies a percentage discount, clamped to 0..=100%.
    ///
    /// The percentage is used at full precision and the result is rounded
    /// to the minor unit once. Non-finite percentages apply no discount.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000000);
    /// assert_eq!(subtotal.apply_percentage_discount(12.345).to_string(), "87655.00");
    /// assert_eq!(subtotal.apply_percentage_discount(250.0), Money::zero());
    /// ```
    pub fn apply_percentage_discount(&self, percent: f64) -> Money {
        let percent = clamp_discount(percent);
        Money::from_amount(self.to_amount() * (1.0 - percent / 100.0))
    }

    /// Divides by a positive quantity (e.g. price per kg).
    ///
    /// Returns zero when the divisor is zero, negative or not finite.
    pub fn per(&self, quantity: f64) -> Money {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Money::zero();
        }
        Money::from_amount(self.to_amount() / quantity)
    }
}

/// Clamps a discount percentage to 0..=100; non-finite input means none.
pub fn clamp_discount(percent: f64) -> f64 {
    if !percent.is_finite() {
        return 0.0;
    }
    percent.clamp(0.0, MAX_DISCOUNT_PERCENT)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Always two decimal digits, no currency symbol: `"41957.00"`, `"-12.50"`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_amount_rounding() {
        assert_eq!(Money::from_amount(419.57).cents(), 41957);
        assert_eq!(Money::from_amount(1.005).cents(), 101);
        assert_eq!(Money::from_amount(-1.005).cents(), -101);
        assert_eq!(Money::from_amount(0.0).cents(), 0);
        assert_eq!(Money::from_amount(f64::INFINITY).cents(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(4195700).to_string(), "41957.00");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-1250).to_string(), "-12.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_debt_scenario_is_exact() {
        let products = [Money::from_amount(41957.0), Money::from_amount(38402.0)];
        let paid = Money::from_amount(10000.0);
        let debt = products.iter().sum::<Money>() - paid;
        assert_eq!(debt.to_string(), "70359.00");
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.apply_percentage_discount(10.0).cents(), 9000);
        assert_eq!(subtotal.apply_percentage_discount(0.0).cents(), 10000);
        assert_eq!(subtotal.apply_percentage_discount(100.0).cents(), 0);
    }

    #[test]
    fn test_fractional_discount_is_not_truncated() {
        let subtotal = Money::from_cents(10000000);
        assert_eq!(subtotal.apply_percentage_discount(12.345).cents(), 8765500);
        assert_eq!(subtotal.apply_percentage_discount(0.001).cents(), 9999900);
    }

    #[test]
    fn test_clamp_discount() {
        assert_eq!(clamp_discount(10.0), 10.0);
        assert_eq!(clamp_discount(-1.0), 0.0);
        assert_eq!(clamp_discount(101.0), 100.0);
        assert_eq!(clamp_discount(f64::NAN), 0.0);
    }

    #[test]
    fn test_per_quantity() {
        let total = Money::from_cents(10000);
        assert_eq!(total.per(4.0).cents(), 2500);
        assert_eq!(total.per(3.0).cents(), 3333);
        assert_eq!(total.per(0.0), Money::zero());
    }
}
