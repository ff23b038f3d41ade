//! Payment status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Internal status of a payment attempt.
///
/// Provider deliveries can arrive late or out of order; a status that is not
/// a valid next step from the current one leaves the row unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, not yet seen by the provider.
    Pending,
    /// The provider is waiting on the payer.
    Processing,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }
}

impl StateMachine for PaymentStatus {
    const ALL: &'static [Self] = &[
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
    ];

    fn valid_transitions(&self) -> &'static [Self] {
        use PaymentStatus::*;
        match self {
            Pending => &[Processing, Completed, Failed],
            Processing => &[Completed, Failed],
            Completed | Failed => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_every_other_status() {
        for target in [PaymentStatus::Processing, PaymentStatus::Completed, PaymentStatus::Failed] {
            assert!(PaymentStatus::Pending.can_transition_to(&target));
        }
    }

    #[test]
    fn processing_cannot_go_back_to_pending() {
        assert!(!PaymentStatus::Processing.can_transition_to(&PaymentStatus::Pending));
    }

    #[test]
    fn completed_and_failed_are_final() {
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Completed.can_transition_to(&PaymentStatus::Failed));
    }

    #[test]
    fn string_forms_roundtrip() {
        for status in PaymentStatus::ALL {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(PaymentStatus::parse("ACCEPTED"), None);
    }
}
