//! EntityResolver - maps external identities to merchants and customers.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::customer::{ContactHandle, Customer, Merchant};
use crate::domain::foundation::{DomainError, ErrorCode, MerchantId};
use crate::ports::{CustomerRepository, MerchantDirectory, SaveResult};

/// Resolves chat-side identities into stored entities.
pub struct EntityResolver {
    merchants: Arc<dyn MerchantDirectory>,
    customers: Arc<dyn CustomerRepository>,
}

impl EntityResolver {
    pub fn new(
        merchants: Arc<dyn MerchantDirectory>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            merchants,
            customers,
        }
    }

    /// Maps the chat channel id to its merchant.
    pub async fn resolve_merchant(&self, channel_id: &str) -> Result<Merchant, DomainError> {
        self.merchants
            .find_by_channel_id(channel_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MerchantNotFound,
                    format!("no merchant for channel {}", channel_id),
                )
                .with_detail("channel_id", channel_id)
            })
    }

    pub async fn merchant(&self, merchant_id: &MerchantId) -> Result<Merchant, DomainError> {
        self.merchants.find_by_id(merchant_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::MerchantNotFound,
                format!("merchant {} not found", merchant_id),
            )
        })
    }

    /// Finds the customer for `(merchant, handle)`, creating it on first
    /// contact.
    ///
    /// Two first messages racing for the same handle both end up with the
    /// single stored row: the loser of the insert re-reads.
    pub async fn resolve_customer(
        &self,
        merchant_id: &MerchantId,
        raw_handle: &str,
        name_hint: Option<String>,
    ) -> Result<Customer, DomainError> {
        let handle = ContactHandle::new(raw_handle)?;

        if let Some(existing) = self.customers.find_by_handle(merchant_id, &handle).await? {
            debug!(customer_id = %existing.id, "customer resolved");
            return Ok(existing);
        }

        let candidate = Customer::first_contact(*merchant_id, handle.clone(), name_hint);
        match self.customers.insert(&candidate).await? {
            SaveResult::Inserted => {
                info!(
                    merchant_id = %merchant_id,
                    customer_id = %candidate.id,
                    "customer created on first contact"
                );
                Ok(candidate)
            }
            SaveResult::AlreadyExists => self
                .customers
                .find_by_handle(merchant_id, &handle)
                .await?
                .ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::InternalError,
                        format!("customer {} vanished after conflict", handle),
                    )
                }),
        }
    }
}
