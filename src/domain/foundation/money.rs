//! Money value objects.
//!
//! Amounts are integer minor units. Mobile-money currencies such as XAF and
//! XOF have no minor unit, so for them one unit is one franc.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Non-negative monetary amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates an amount, rejecting negative values.
    pub fn new(minor_units: i64) -> Result<Self, ValidationError> {
        if minor_units < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, minor_units));
        }
        Ok(Self(minor_units))
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Multiplies by a quantity.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` when the product does not fit in an amount
    pub fn times(&self, quantity: u32) -> Result<Money, ValidationError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Money)
            .ok_or_else(overflow)
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, ValidationError> {
        self.0.checked_add(rhs.0).map(Money).ok_or_else(overflow)
    }

    /// Adds up amounts, failing on the first overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Money, ValidationError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }

    /// Running totals such as lifetime spend stop at the maximum.
    pub fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    /// Applies a rate expressed in basis points (1/100 of a percent), rounding half up.
    pub fn basis_points(&self, bps: u32) -> Result<Money, ValidationError> {
        let scaled = (i128::from(self.0) * i128::from(bps) + 5_000) / 10_000;
        i64::try_from(scaled).map(Money).map_err(|_| overflow())
    }
}

fn overflow() -> ValidationError {
    ValidationError::invalid_format("amount", "exceeds the largest representable amount")
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-4217 currency code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a three-letter code, case-insensitively.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected a three-letter code, got '{}'", code),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
