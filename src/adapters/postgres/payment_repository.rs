//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{currency_from, db_error, money_from, parse_with, violates};
use crate::domain::foundation::{
    DomainError, ErrorCode, MerchantId, OrderId, PaymentId, Timestamp,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::{PaymentRepository, SaveResult};

const TRANSACTION_KEY: &str = "payments_transaction_id_key";
const EXTERNAL_TRANSACTION_KEY: &str = "payments_external_transaction_id_key";

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    merchant_id: Uuid,
    amount: i64,
    currency: String,
    provider: String,
    transaction_id: String,
    external_transaction_id: Option<String>,
    status: String,
    payment_method: Option<String>,
    payer_phone: Option<String>,
    expires_at: DateTime<Utc>,
    failure_reason: Option<String>,
    provider_payload: Option<serde_json::Value>,
    supersedes: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            amount: money_from("amount", row.amount)?,
            currency: currency_from("currency", row.currency.trim())?,
            provider: row.provider,
            transaction_id: row.transaction_id,
            external_transaction_id: row.external_transaction_id,
            status: parse_with("status", &row.status, PaymentStatus::parse)?,
            payment_method: row.payment_method,
            payer_phone: row.payer_phone,
            expires_at: Timestamp::from_datetime(row.expires_at),
            failure_reason: row.failure_reason,
            provider_payload: row.provider_payload,
            supersedes: row.supersedes.map(PaymentId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, order_id, merchant_id, amount, currency, provider, transaction_id,
           external_transaction_id, status, payment_method, payer_phone, expires_at,
           failure_reason, provider_payload, supersedes, created_at, updated_at
    FROM payments
"#;

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, merchant_id, amount, currency, provider, transaction_id,
                external_transaction_id, status, payment_method, payer_phone, expires_at,
                failure_reason, provider_payload, supersedes, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
            )
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.merchant_id.as_uuid())
        .bind(payment.amount.minor_units())
        .bind(payment.currency.as_str())
        .bind(&payment.provider)
        .bind(&payment.transaction_id)
        .bind(&payment.external_transaction_id)
        .bind(payment.status.as_str())
        .bind(&payment.payment_method)
        .bind(&payment.payer_phone)
        .bind(payment.expires_at.as_datetime())
        .bind(&payment.failure_reason)
        .bind(&payment.provider_payload)
        .bind(payment.supersedes.map(|id| *id.as_uuid()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(SaveResult::Inserted),
            Err(e) if violates(&e, TRANSACTION_KEY) || violates(&e, EXTERNAL_TRANSACTION_KEY) => {
                Ok(SaveResult::AlreadyExists)
            }
            Err(e) => Err(db_error("Failed to insert payment")(e)),
        }
    }

    async fn update(
        &self,
        payment: &Payment,
        expected_status: PaymentStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                external_transaction_id = $2,
                status = $3,
                payment_method = $4,
                payer_phone = $5,
                failure_reason = $6,
                provider_payload = $7,
                updated_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.external_transaction_id)
        .bind(payment.status.as_str())
        .bind(&payment.payment_method)
        .bind(&payment.payer_phone)
        .bind(&payment.failure_reason)
        .bind(&payment.provider_payload)
        .bind(payment.updated_at.as_datetime())
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update payment"))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.find_by_id(&payment.id).await? {
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("payment {} not found", payment.id),
            )),
            Some(stored) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "payment {} is {}, expected {}",
                    payment.id, stored.status, expected_status
                ),
            )),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load payment"))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE transaction_id = $1 OR external_transaction_id = $1 LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find payment by transaction"))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load latest payment"))?;
        row.map(Payment::try_from).transpose()
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE order_id = $1 ORDER BY created_at ASC",
            SELECT_PAYMENT
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list payments"))?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}
