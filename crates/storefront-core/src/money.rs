//! # Money Module
//!
//! The `Money` type: an amount in cents, never a float.
//!
//! Amounts are stored, summed and serialized as whole cents. Rounding
//! happens in two places only, both half-up:
//!
//! ```text
//! unit price × discount × qty ──► line total   (pricing::line_total)
//! subtotal × tax rate         ──► tax          (Money::apply_rate)
//! ```
//!
//! Everything downstream of those two points is integer addition, so
//! `total == subtotal + shipping + tax` holds exactly.
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2;             // $21.98
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.to_string(), "$15.99");
//! assert_eq!(doubled.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding halves away from zero.
///
/// For the non-negative amounts the storefront deals in this is plain
/// round-half-up: 0.5 → 1, 1.5 → 2, 2.5 → 3.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// CatalogItem.price_cents ──► OrderLine.unit_price ──► OrderLine.line_total
///                                                            │
///                                            Σ ──► subtotal ─┤
///                                                            ├─► shipping tier
///                                                            ├─► tax
///                                                            ▼
///                                                          total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, `None` on `i64` overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a rate (tax) to this amount, rounding half-up to the cent.
    ///
    /// Computed in i128; `None` when the result does not fit in `i64`.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::TaxRate;
    ///
    /// // $10.05 × 10% = $1.005 → $1.01
    /// let tax = Money::from_cents(1005).apply_rate(TaxRate::from_bps(1000));
    /// assert_eq!(tax.map(|m| m.cents()), Some(101));
    /// ```
    pub fn apply_rate(&self, rate: TaxRate) -> Option<Money> {
        let scaled = i128::from(self.0) * i128::from(rate.bps());
        i64::try_from(div_round_half_up(scaled, 10_000)).ok().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `$12.34` (debugging and error messages only).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_and_parts() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_checked_add() {
        let sum = Money::from_cents(100).checked_add(Money::from_cents(250));
        assert_eq!(sum, Some(Money::from_cents(350)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // $18.05 × 10% = $1.805 → $1.81
        let tax = Money::from_cents(1805).apply_rate(TaxRate::from_bps(1000)).unwrap();
        assert_eq!(tax.cents(), 181);

        // $18.04 × 10% = $1.804 → $1.80
        let tax = Money::from_cents(1804).apply_rate(TaxRate::from_bps(1000)).unwrap();
        assert_eq!(tax.cents(), 180);
    }

    #[test]
    fn test_apply_rate_reports_overflow() {
        // 10_000 bps is 100%, anything above grows the amount.
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.apply_rate(TaxRate::from_bps(10_000)), Some(huge));
        assert_eq!(huge.apply_rate(TaxRate::from_bps(30_000)), None);
    }

    #[test]
    fn test_div_round_half_up() {
        assert_eq!(div_round_half_up(5, 10), 1);
        assert_eq!(div_round_half_up(4, 10), 0);
        assert_eq!(div_round_half_up(15, 10), 2);
        assert_eq!(div_round_half_up(25, 10), 3);
        assert_eq!(div_round_half_up(-25, 10), -3);
    }
}
