use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::customer::{ContactHandle, Customer};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, MerchantId, Money, Timestamp};
use crate::ports::{CustomerRepository, SaveResult};

/// In-memory customer store. The write lock plays the role of the
/// `(merchant_id, handle)` unique index.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<CustomerId, Customer>>,
    outage: Outage,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            customers: RwLock::new(HashMap::new()),
            outage,
        }
    }

    pub async fn count(&self) -> usize {
        self.customers.read().await.len()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_handle(
        &self,
        merchant_id: &MerchantId,
        handle: &ContactHandle,
    ) -> Result<Option<Customer>, DomainError> {
        self.outage.check()?;
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.merchant_id == *merchant_id && c.handle == *handle)
            .cloned())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        self.outage.check()?;
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn insert(&self, customer: &Customer) -> Result<SaveResult, DomainError> {
        self.outage.check()?;
        let mut customers = self.customers.write().await;
        let taken = customers
            .values()
            .any(|c| c.merchant_id == customer.merchant_id && c.handle == customer.handle);
        if taken {
            return Ok(SaveResult::AlreadyExists);
        }
        customers.insert(customer.id, customer.clone());
        Ok(SaveResult::Inserted)
    }

    async fn record_order(
        &self,
        id: &CustomerId,
        amount: Money,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut customers = self.customers.write().await;
        let customer = customers.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::CustomerNotFound, format!("customer {} not found", id))
        })?;
        customer.record_order(amount, at);
        Ok(())
    }
}
