//! Contact handle value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Normalized phone handle as the chat platform reports it.
///
/// Keeps digits and an optional leading `+`; spaces, dashes and dots are
/// dropped so `+237 6 99-00-11-22` and `+237699001122` are the same customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactHandle(String);

impl ContactHandle {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = raw.as_ref().trim();
        let plus = raw.starts_with('+');
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() {
            return Err(ValidationError::empty_field("handle"));
        }
        if raw
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')')))
        {
            return Err(ValidationError::invalid_format(
                "handle",
                "only digits and phone punctuation are allowed",
            ));
        }
        if digits.len() < 6 || digits.len() > 15 {
            return Err(ValidationError::out_of_range(
                "handle",
                6,
                15,
                digits.len() as i64,
            ));
        }

        Ok(Self(if plus { format!("+{}", digits) } else { digits }))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
