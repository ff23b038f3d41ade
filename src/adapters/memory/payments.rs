use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::{PaymentRepository, SaveResult};

/// In-memory payment store.
#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
    outage: Outage,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
            outage,
        }
    }

    pub async fn count(&self) -> usize {
        self.payments.read().await.len()
    }
}

fn matches_transaction(p: &Payment, transaction_id: &str) -> bool {
    p.transaction_id == transaction_id
        || p.external_transaction_id.as_deref() == Some(transaction_id)
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        self.outage.check()?;
        let mut payments = self.payments.write().await;
        let taken = payments.values().any(|p| {
            matches_transaction(p, &payment.transaction_id)
                || payment
                    .external_transaction_id
                    .as_deref()
                    .is_some_and(|ext| matches_transaction(p, ext))
        });
        if taken {
            return Ok(SaveResult::AlreadyExists);
        }
        payments.insert(payment.id, payment.clone());
        Ok(SaveResult::Inserted)
    }

    async fn update(
        &self,
        payment: &Payment,
        expected_status: PaymentStatus,
    ) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("payment {} not found", payment.id),
            )
        })?;
        if stored.status != expected_status {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "payment {} is {}, expected {}",
                    payment.id, stored.status, expected_status
                ),
            ));
        }
        *stored = payment.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        self.outage.check()?;
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.outage.check()?;
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| matches_transaction(p, transaction_id))
            .cloned())
    }

    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, DomainError> {
        self.outage.check()?;
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.order_id == *order_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        self.outage.check()?;
        let mut payments: Vec<_> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.order_id == *order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, MerchantId, Money};
    use crate::domain::payment::NewPayment;

    fn payment() -> Payment {
        Payment::initiate(NewPayment {
            order_id: OrderId::new(),
            merchant_id: MerchantId::new(),
            amount: Money::new(15_000).unwrap(),
            currency: Currency::new("XAF").unwrap(),
            provider: "cinetpay".to_string(),
            payment_method: None,
            payer_phone: None,
            ttl_minutes: 30,
            supersedes: None,
        })
    }

    #[tokio::test]
    async fn update_from_stale_status_is_refused() {
        let repo = InMemoryPaymentRepository::new();
        let original = payment();
        repo.insert(&original).await.unwrap();

        let mut completed = original.clone();
        completed.status = PaymentStatus::Completed;
        repo.update(&completed, PaymentStatus::Pending).await.unwrap();

        let mut stale = original.clone();
        stale.status = PaymentStatus::Processing;
        let err = repo.update(&stale, PaymentStatus::Pending).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ConcurrentModification);
        let stored = repo.find_by_id(&original.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn update_of_unknown_payment_is_not_found() {
        let repo = InMemoryPaymentRepository::new();
        let err = repo.update(&payment(), PaymentStatus::Pending).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotFound);
    }
}
