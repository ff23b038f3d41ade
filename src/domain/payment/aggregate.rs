//! Payment aggregate.
//!
//! A payment is one attempt to collect an order's amount. An order may
//! accumulate several attempts; each new one records the attempt it
//! supersedes.

use serde::{Deserialize, Serialize};

use super::PaymentStatus;
use crate::domain::foundation::{
    Currency, MerchantId, Money, OrderId, PaymentId, StateMachine, Timestamp,
};

/// Whether a reconciliation step changed the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// Status moved `from -> to`.
    Transitioned { from: PaymentStatus, to: PaymentStatus },
    /// Same status redelivered, or a stale status that is not a valid next step.
    Unchanged,
}

impl PaymentUpdate {
    pub fn is_transition(&self) -> bool {
        matches!(self, PaymentUpdate::Transitioned { .. })
    }
}

/// A payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub amount: Money,
    pub currency: Currency,
    pub provider: String,
    /// Generated here, echoed back by the provider.
    pub transaction_id: String,
    /// Assigned by the provider, unknown until its first notification.
    pub external_transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payer_phone: Option<String>,
    pub expires_at: Timestamp,
    pub failure_reason: Option<String>,
    pub provider_payload: Option<serde_json::Value>,
    pub supersedes: Option<PaymentId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for a new attempt.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub amount: Money,
    pub currency: Currency,
    pub provider: String,
    pub payment_method: Option<String>,
    pub payer_phone: Option<String>,
    pub ttl_minutes: i64,
    pub supersedes: Option<PaymentId>,
}

impl Payment {
    /// Creates a pending attempt with a fresh internal transaction id.
    pub fn initiate(new: NewPayment) -> Self {
        let now = Timestamp::now();
        let id = PaymentId::new();
        Self {
            transaction_id: Self::transaction_id_for(&id, &now),
            id,
            order_id: new.order_id,
            merchant_id: new.merchant_id,
            amount: new.amount,
            currency: new.currency,
            provider: new.provider,
            external_transaction_id: None,
            status: PaymentStatus::Pending,
            payment_method: new.payment_method,
            payer_phone: new.payer_phone,
            expires_at: now.add_minutes(new.ttl_minutes),
            failure_reason: None,
            provider_payload: None,
            supersedes: new.supersedes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the row for a notification that arrived with no prior attempt.
    pub fn backfill(new: NewPayment, external_transaction_id: impl Into<String>) -> Self {
        let mut payment = Self::initiate(new);
        payment.external_transaction_id = Some(external_transaction_id.into());
        payment
    }

    fn transaction_id_for(id: &PaymentId, at: &Timestamp) -> String {
        let suffix: String = id.as_uuid().simple().to_string().chars().take(12).collect();
        format!("PAY-{}-{}", at.compact_date(), suffix.to_ascii_uppercase())
    }

    /// Records the provider's report.
    ///
    /// Only valid transitions touch the row; anything else leaves it
    /// byte-for-byte as it was, so redelivery converges.
    pub fn reconcile(
        &mut self,
        reported: PaymentStatus,
        failure_reason: Option<String>,
        snapshot: serde_json::Value,
    ) -> PaymentUpdate {
        let from = self.status;
        if from == reported || !from.can_transition_to(&reported) {
            return PaymentUpdate::Unchanged;
        }

        self.status = reported;
        self.failure_reason = match reported {
            PaymentStatus::Failed => failure_reason,
            _ => None,
        };
        self.provider_payload = Some(snapshot);
        self.updated_at = Timestamp::now();

        PaymentUpdate::Transitioned { from, to: reported }
    }

    /// Pending past its expiry. Read paths display this as abandoned.
    pub fn is_abandoned_at(&self, now: &Timestamp) -> bool {
        self.status == PaymentStatus::Pending && now.is_after(&self.expires_at)
    }
}
