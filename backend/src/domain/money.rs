//! Monetary amounts in Brazilian reais.
//!
//! Amounts are held as integer centavos so arithmetic on prices, discounts
//! and payment history never accumulates floating-point drift. Conversion to
//! decimal reais happens only at the edges (gateway payloads and JSON
//! responses).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An amount of money in centavos (1/100 BRL).
///
/// # Examples
/// ```
/// use streamflix::domain::Money;
///
/// let price = Money::from_centavos(1490);
/// assert_eq!(price.times(12), Money::from_centavos(17_880));
/// assert_eq!(price.to_reais(), 14.9);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero reais.
    pub const ZERO: Self = Self(0);

    /// Construct from a whole number of centavos.
    #[must_use]
    pub const fn from_centavos(centavos: i64) -> Self {
        Self(centavos)
    }

    /// Convert a decimal amount in reais, rounding to the nearest centavo.
    ///
    /// Used for gateway payloads, which carry `transaction_amount` as a
    /// decimal number.
    #[must_use]
    pub fn from_reais(reais: f64) -> Self {
        Self((reais * 100.0).round() as i64)
    }

    /// Amount in centavos.
    #[must_use]
    pub const fn centavos(self) -> i64 {
        self.0
    }

    /// Amount as decimal reais.
    #[must_use]
    pub fn to_reais(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiply by a whole quantity (for example a number of months).
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    /// The given percentage of this amount, rounded half-up to the centavo.
    ///
    /// # Examples
    /// ```
    /// use streamflix::domain::Money;
    ///
    /// // 15% of R$ 0,10 is 1.5 centavos, rounded up to 2.
    /// assert_eq!(Money::from_centavos(10).percentage(15), Money::from_centavos(2));
    /// ```
    #[must_use]
    pub fn percentage(self, percent: u8) -> Self {
        let scaled = self.0.saturating_mul(i64::from(percent));
        if scaled >= 0 {
            Self((scaled + 50) / 100)
        } else {
            Self((scaled - 50) / 100)
        }
    }

    /// Subtract, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self((self.0 - other.0).max(0))
    }

    /// Returns `true` when the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::domain::br::format_brl(*self))
    }
}
