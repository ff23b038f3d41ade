//! Order pricing defaults

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::{Currency, Money};
use crate::domain::order::Charges;

/// Defaults applied when chat orders are priced.
///
/// Amounts are integer minor units of `default_currency`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
    /// ISO 4217 code used when a merchant record carries none
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Unit price for products missing from the merchant's catalog
    #[serde(default)]
    pub default_unit_price: i64,

    /// Tax rate in basis points (1925 = 19.25%)
    #[serde(default)]
    pub tax_bps: u32,

    /// Flat shipping added to every order
    #[serde(default)]
    pub shipping: i64,
}

impl OrdersConfig {
    pub fn currency(&self) -> Result<Currency, ValidationError> {
        Currency::new(&self.default_currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.default_currency.clone()))
    }

    pub fn default_unit_price(&self) -> Result<Money, ValidationError> {
        Money::new(self.default_unit_price).map_err(|_| ValidationError::NegativeAmount)
    }

    pub fn charges(&self) -> Result<Charges, ValidationError> {
        Ok(Charges {
            tax_bps: self.tax_bps,
            shipping: Money::new(self.shipping).map_err(|_| ValidationError::NegativeAmount)?,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.currency()?;
        self.default_unit_price()?;
        if self.tax_bps > 10_000 {
            return Err(ValidationError::InvalidTaxRate);
        }
        self.charges()?;
        Ok(())
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            default_unit_price: 0,
            tax_bps: 0,
            shipping: 0,
        }
    }
}

fn default_currency() -> String {
    "XAF".to_string()
}
