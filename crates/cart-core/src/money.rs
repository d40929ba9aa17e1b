//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing 0.10 thirty times as f64 gives 3.0000000000000013             │
//! │  A cart that re-sums its lines on every render drifts.                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    "10.00" is parsed once into 1000 cents and never leaves integers    │
//! │    Rounding happens exactly once per line (tax, percentage coupons)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cart_core::money::Money;
//!
//! let price = Money::parse("10.99").unwrap();
//! assert_eq!(price.cents(), 1099);
//!
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.to_string(), "$21.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts may exceed a subtotal when the cart is
///   configured to allow negative totals
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as cents**: persisted blobs never contain floats
/// - **Saturating arithmetic**: operators clamp at the i64 bounds rather
///   than panic or wrap
///
/// ## Where Money is Used
/// ```text
/// CartItem.unit_price ──► CartItem.subtotal ──► Cart.sub_total
///                                                    │
///                     Coupon.discount ──► Cart.total_discount
///                                                    │
///                                                    ▼
///                                               Cart.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal amount such as `"10.00"`, `"3.5"` or `"-2.25"`.
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - Digits, optionally followed by `.` and fractional digits
    /// - Two fractional digits are kept; a third rounds half-up
    ///   (`"0.125"` → 13 cents), anything after it is ignored
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::money::Money;
    ///
    /// assert_eq!(Money::parse("10.00").unwrap().cents(), 1000);
    /// assert_eq!(Money::parse("7").unwrap().cents(), 700);
    /// assert!(Money::parse("ten").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (major_str, minor_str) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if major_str.is_empty() && minor_str.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !major_str.bytes().all(|b| b.is_ascii_digit())
            || !minor_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected a decimal amount like 10.00"));
        }

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            major_str
                .parse()
                .map_err(|_| invalid("amount is too large"))?
        };

        let mut fraction = minor_str.bytes().map(|b| i64::from(b - b'0'));
        let tens = fraction.next().unwrap_or(0);
        let ones = fraction.next().unwrap_or(0);
        let round_up = fraction.next().is_some_and(|d| d >= 5);
        let minor = tens * 10 + ones + i64::from(round_up);

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns zero for negative values, the value itself otherwise.
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-300).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(300).clamp_non_negative().cents(), 300);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Calculates tax on this amount, rounding half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides
    /// rounding (5000/10000 = 0.5). i128 keeps large carts from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::money::Money;
    /// use cart_core::types::TaxRate;
    ///
    /// let line = Money::from_cents(1000); // $10.00
    /// let tax = line.calculate_tax(TaxRate::from_bps(825)); // 8.25%
    /// assert_eq!(tax.cents(), 83); // $0.825 → $0.83
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage_of(rate.bps())
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// Used by percentage coupons: `percentage_of(1000)` is 10%.
    pub fn percentage_of(&self, bps: u32) -> Money {
        let scaled = self.0 as i128 * bps as i128;
        let rounded = if scaled < 0 {
            (scaled - 5000) / 10000
        } else {
            (scaled + 5000) / 10000
        };
        Money::from_cents(clamp_i128(rounded))
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

fn clamp_i128(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-grade display (`$10.99`).
///
/// ## Note
/// Locale-aware rendering goes through a `MoneyFormatter` in cart-store.
/// This is the fallback when no currency metadata is available.
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
