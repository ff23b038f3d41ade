use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::customer::Merchant;
use crate::domain::foundation::{DomainError, MerchantId};
use crate::ports::MerchantDirectory;

/// In-memory merchant directory, seeded by the caller.
#[derive(Debug, Default)]
pub struct InMemoryMerchantDirectory {
    merchants: RwLock<HashMap<MerchantId, Merchant>>,
    outage: Outage,
}

impl InMemoryMerchantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            merchants: RwLock::new(HashMap::new()),
            outage,
        }
    }

    pub async fn add(&self, merchant: Merchant) {
        self.merchants.write().await.insert(merchant.id, merchant);
    }
}

#[async_trait]
impl MerchantDirectory for InMemoryMerchantDirectory {
    async fn find_by_id(&self, id: &MerchantId) -> Result<Option<Merchant>, DomainError> {
        self.outage.check()?;
        Ok(self.merchants.read().await.get(id).cloned())
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Merchant>, DomainError> {
        self.outage.check()?;
        Ok(self
            .merchants
            .read()
            .await
            .values()
            .find(|m| m.channel_id == channel_id)
            .cloned())
    }
}
