//! PostgreSQL implementation of MerchantDirectory.
//!
//! Merchants are provisioned outside the engine; this adapter only reads.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, currency_from, db_error};
use crate::domain::customer::{ContactHandle, Merchant};
use crate::domain::foundation::{Currency, DomainError, MerchantId};
use crate::ports::MerchantDirectory;

pub struct PostgresMerchantDirectory {
    pool: PgPool,
    /// Used for merchants whose record carries no currency.
    fallback_currency: Currency,
}

impl PostgresMerchantDirectory {
    pub fn new(pool: PgPool, fallback_currency: Currency) -> Self {
        Self {
            pool,
            fallback_currency,
        }
    }

    fn to_merchant(&self, row: MerchantRow) -> Result<Merchant, DomainError> {
        let contact = row
            .contact
            .as_deref()
            .map(|raw| ContactHandle::new(raw).map_err(|_| corrupt("contact", raw)))
            .transpose()?;
        let default_currency = match row.default_currency.as_deref() {
            Some(code) => currency_from("default_currency", code)?,
            None => self.fallback_currency.clone(),
        };
        Ok(Merchant {
            id: MerchantId::from_uuid(row.id),
            display_name: row.display_name,
            channel_id: row.channel_id,
            contact,
            default_currency,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MerchantRow {
    id: Uuid,
    display_name: String,
    channel_id: String,
    contact: Option<String>,
    default_currency: Option<String>,
}

#[async_trait]
impl MerchantDirectory for PostgresMerchantDirectory {
    async fn find_by_id(&self, id: &MerchantId) -> Result<Option<Merchant>, DomainError> {
        let row: Option<MerchantRow> = sqlx::query_as(
            "SELECT id, display_name, channel_id, contact, default_currency FROM merchants WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load merchant"))?;
        row.map(|r| self.to_merchant(r)).transpose()
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Merchant>, DomainError> {
        let row: Option<MerchantRow> = sqlx::query_as(
            "SELECT id, display_name, channel_id, contact, default_currency FROM merchants WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to resolve merchant channel"))?;
        row.map(|r| self.to_merchant(r)).transpose()
    }
}
