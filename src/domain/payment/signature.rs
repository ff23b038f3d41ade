//! Payment provider signature verification.
//!
//! The provider signs [`ProviderNotification::signing_payload`] with
//! HMAC-SHA256 under the shared secret and sends it hex-encoded in the
//! `signature` field.

use secrecy::{ExposeSecret, SecretString};

use super::ProviderNotification;
use crate::domain::webhook::{hmac_sha256_hex, verify_hex, WebhookError};

/// Verifier for provider notifications.
#[derive(Clone)]
pub struct ProviderSignatureVerifier {
    site_id: String,
    secret: SecretString,
}

impl ProviderSignatureVerifier {
    pub fn new(site_id: impl Into<String>, secret: SecretString) -> Self {
        Self {
            site_id: site_id.into(),
            secret,
        }
    }

    /// Checks the site id, then the signature.
    ///
    /// # Errors
    ///
    /// - `UnknownSite` - notification addressed to another site
    /// - `InvalidSignature` - signature does not match
    pub fn verify(&self, notification: &ProviderNotification) -> Result<(), WebhookError> {
        if notification.site_id != self.site_id {
            return Err(WebhookError::UnknownSite(notification.site_id.clone()));
        }

        let payload = notification.signing_payload();
        if !verify_hex(
            self.secret.expose_secret().as_bytes(),
            payload.as_bytes(),
            &notification.signature,
        ) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Produces the signature the provider would send. Used by tests and
    /// local tooling that replays notifications.
    pub fn sign(&self, notification: &ProviderNotification) -> String {
        hmac_sha256_hex(
            self.secret.expose_secret().as_bytes(),
            notification.signing_payload().as_bytes(),
        )
    }
}
