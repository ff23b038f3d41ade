//! PriceResolver port - catalog lookup for interpreted chat items.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MerchantId, Money};

#[async_trait]
pub trait PriceResolver: Send + Sync {
    /// Unit price for a free-text item name. Unknown names get the
    /// merchant's default price, so this never fails for a miss.
    async fn lookup_price(&self, merchant_id: &MerchantId, item_name: &str)
        -> Result<Money, DomainError>;
}
