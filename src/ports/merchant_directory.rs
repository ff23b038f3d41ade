//! MerchantDirectory port - read-only merchant lookup.

use async_trait::async_trait;

use crate::domain::customer::Merchant;
use crate::domain::foundation::{DomainError, MerchantId};

/// Port for resolving merchants. Merchant records are owned elsewhere.
#[async_trait]
pub trait MerchantDirectory: Send + Sync {
    async fn find_by_id(&self, id: &MerchantId) -> Result<Option<Merchant>, DomainError>;

    /// Maps the chat platform's business phone-number id to a merchant.
    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Merchant>, DomainError>;
}
