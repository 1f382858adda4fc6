//! Whole-unit price representation.
//!
//! Prices are stored in the smallest currency unit actually shown to the
//! shopper (whole Colombian pesos), never as a fractional minor unit.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative price in whole pesos.
///
/// ## Examples
///
/// ```
/// use vivero_core::Price;
///
/// assert_eq!(Price::from_amount(24_999.6).as_i64(), 25_000);
/// assert_eq!(Price::from_amount(-3.0), Price::ZERO);
/// assert_eq!(Price::new(25_000).to_string(), "$ 25.000");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero pesos.
    pub const ZERO: Self = Self(0);

    /// Create a price, clamping negative values to zero.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        if amount < 0 { Self(0) } else { Self(amount) }
    }

    /// Create a price from a loosely typed amount.
    ///
    /// Rounds to the nearest whole peso; negative, NaN and infinite inputs
    /// become zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // rounded and finite, `as` saturates
    pub fn from_amount(amount: f64) -> Self {
        if !amount.is_finite() || amount <= 0.0 {
            return Self::ZERO;
        }
        Self(amount.round() as i64)
    }

    /// Get the underlying amount in whole pesos.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// Sum of two prices.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

/// Formats as Colombian pesos without decimals, e.g. `$ 1.250.000`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "$ {grouped}")
    }
}
