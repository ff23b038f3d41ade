//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Mobile-money aggregator settings.
///
/// `site_id` and `shared_secret` authenticate provider notifications; a
/// notification for any other site is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Provider name stamped on payment rows
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Merchant-account site id issued by the provider
    pub site_id: String,

    /// Secret used to sign notifications
    pub shared_secret: SecretString,

    /// Minutes a pending attempt stays payable
    #[serde(default = "default_payment_ttl")]
    pub payment_ttl_minutes: i64,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__PROVIDER"));
        }
        if self.site_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__SITE_ID"));
        }
        if self.shared_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__SHARED_SECRET"));
        }
        if !(1..=1440).contains(&self.payment_ttl_minutes) {
            return Err(ValidationError::InvalidPaymentTtl);
        }
        Ok(())
    }
}

fn default_provider() -> String {
    "cinetpay".to_string()
}

fn default_payment_ttl() -> i64 {
    30
}
