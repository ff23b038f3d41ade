//! Chat platform configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Token echoed back during the subscription handshake
    pub verify_token: SecretString,

    /// App secret behind `X-Hub-Signature-256`. Unset disables the check,
    /// which production refuses.
    pub app_secret: Option<SecretString>,
}

impl ChatConfig {
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.verify_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("CHAT__VERIFY_TOKEN"));
        }
        let has_secret = self
            .app_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());
        if *environment == Environment::Production && !has_secret {
            return Err(ValidationError::AppSecretRequired);
        }
        Ok(())
    }

    /// The app secret, treating an empty value as unset.
    pub fn signing_secret(&self) -> Option<SecretString> {
        self.app_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty())
            .cloned()
    }
}
