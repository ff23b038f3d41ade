//! Catalog-backed price lookup with a configured fallback.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, MerchantId, Money};
use crate::ports::PriceResolver;

/// Per-merchant price list keyed by lower-cased item name.
///
/// Names not in the list resolve to the default unit price, which the
/// merchant corrects later if needed.
#[derive(Debug)]
pub struct CatalogPriceResolver {
    prices: RwLock<HashMap<(MerchantId, String), Money>>,
    default_price: Money,
}

impl CatalogPriceResolver {
    pub fn new(default_price: Money) -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            default_price,
        }
    }

    pub async fn set_price(&self, merchant_id: MerchantId, name: &str, price: Money) {
        self.prices
            .write()
            .await
            .insert((merchant_id, normalize(name)), price);
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[async_trait]
impl PriceResolver for CatalogPriceResolver {
    async fn lookup_price(
        &self,
        merchant_id: &MerchantId,
        item_name: &str,
    ) -> Result<Money, DomainError> {
        Ok(self
            .prices
            .read()
            .await
            .get(&(*merchant_id, normalize(item_name)))
            .copied()
            .unwrap_or(self.default_price))
    }
}
