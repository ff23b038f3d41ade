//! Order status state machines.
//!
//! An order carries two coupled fields: the fulfilment `status` and the
//! `payment_status`. Each has its own allow-list here; the coupling rules
//! between them live on the aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }

    /// Whether a payment may still be marked as paid in this status.
    pub fn accepts_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl StateMachine for OrderStatus {
    const ALL: &'static [Self] = &[
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    fn valid_transitions(&self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Paid, Cancelled, Refunded],
            Confirmed => &[Paid, Processing, Cancelled, Refunded],
            Paid => &[Processing, Shipped, Cancelled, Refunded],
            Processing => &[Shipped, Cancelled, Refunded],
            // Pre-receipt cancellation is still allowed once shipped.
            Shipped => &[Delivered, Cancelled, Refunded],
            Delivered => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status as tracked on the order itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Paid => "paid",
            OrderPaymentStatus::Failed => "failed",
            OrderPaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }
}

impl StateMachine for OrderPaymentStatus {
    const ALL: &'static [Self] = &[
        OrderPaymentStatus::Pending,
        OrderPaymentStatus::Paid,
        OrderPaymentStatus::Failed,
        OrderPaymentStatus::Refunded,
    ];

    fn valid_transitions(&self) -> &'static [Self] {
        use OrderPaymentStatus::*;
        match self {
            Pending => &[Paid, Failed],
            // A failed attempt may be retried or settle late.
            Failed => &[Pending, Paid],
            Paid => &[Refunded],
            Refunded => &[],
        }
    }
}

impl fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // OrderStatus
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn happy_path_is_allowed() {
        use OrderStatus::*;
        let path = [Pending, Confirmed, Paid, Processing, Shipped, Delivered];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn delivered_can_only_be_refunded() {
        assert_eq!(OrderStatus::Delivered.valid_transitions(), &[OrderStatus::Refunded]);
        assert!(!OrderStatus::Delivered.can_transition_to(&OrderStatus::Cancelled));
    }

    #[test]
    fn shipped_can_still_be_cancelled() {
        assert!(OrderStatus::Shipped.can_transition_to(&OrderStatus::Cancelled));
    }

    #[test]
    fn cancelled_and_refunded_are_terminal() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status), "{}", status);
        }
    }

    #[test]
    fn only_pending_and_confirmed_accept_payment() {
        let accepting: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.accepts_payment())
            .copied()
            .collect();
        assert_eq!(accepting, vec![OrderStatus::Pending, OrderStatus::Confirmed]);
    }

    #[test]
    fn status_string_forms_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(OrderStatus::parse("draft"), None);
    }

    // ══════════════════════════════════════════════════════════════
    // OrderPaymentStatus
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn failed_payment_can_be_retried() {
        assert!(OrderPaymentStatus::Failed.can_transition_to(&OrderPaymentStatus::Pending));
        assert!(OrderPaymentStatus::Failed.can_transition_to(&OrderPaymentStatus::Paid));
    }

    #[test]
    fn only_paid_can_be_refunded() {
        for status in OrderPaymentStatus::ALL {
            let allowed = status.can_transition_to(&OrderPaymentStatus::Refunded);
            assert_eq!(allowed, *status == OrderPaymentStatus::Paid, "{}", status);
        }
    }

    #[test]
    fn payment_string_forms_roundtrip() {
        for status in OrderPaymentStatus::ALL {
            assert_eq!(OrderPaymentStatus::parse(status.as_str()), Some(*status));
        }
    }
}
