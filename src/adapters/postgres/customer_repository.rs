//! PostgreSQL implementation of CustomerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt, count_from, count_to, db_error, money_from, violates};
use crate::domain::customer::{ContactHandle, Customer};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, MerchantId, Money, Timestamp};
use crate::ports::{CustomerRepository, SaveResult};

const HANDLE_KEY: &str = "customers_merchant_handle_key";

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    merchant_id: Uuid,
    handle: String,
    display_name: Option<String>,
    order_count: i32,
    lifetime_spend: i64,
    last_order_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            handle: ContactHandle::new(&row.handle).map_err(|_| corrupt("handle", &row.handle))?,
            display_name: row.display_name,
            order_count: count_from("order_count", row.order_count)?,
            lifetime_spend: money_from("lifetime_spend", row.lifetime_spend)?,
            last_order_at: row.last_order_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_CUSTOMER: &str = r#"
    SELECT id, merchant_id, handle, display_name, order_count, lifetime_spend,
           last_order_at, created_at, updated_at
    FROM customers
"#;

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_by_handle(
        &self,
        merchant_id: &MerchantId,
        handle: &ContactHandle,
    ) -> Result<Option<Customer>, DomainError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "{} WHERE merchant_id = $1 AND handle = $2",
            SELECT_CUSTOMER
        ))
        .bind(merchant_id.as_uuid())
        .bind(handle.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find customer by handle"))?;
        row.map(Customer::try_from).transpose()
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_CUSTOMER))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load customer"))?;
        row.map(Customer::try_from).transpose()
    }

    async fn insert(&self, customer: &Customer) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (
                id, merchant_id, handle, display_name, order_count, lifetime_spend,
                last_order_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(customer.merchant_id.as_uuid())
        .bind(customer.handle.as_str())
        .bind(&customer.display_name)
        .bind(count_to(customer.order_count))
        .bind(customer.lifetime_spend.minor_units())
        .bind(customer.last_order_at.as_ref().map(|t| *t.as_datetime()))
        .bind(customer.created_at.as_datetime())
        .bind(customer.updated_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(SaveResult::Inserted),
            Err(e) if violates(&e, HANDLE_KEY) => Ok(SaveResult::AlreadyExists),
            Err(e) => Err(db_error("Failed to insert customer")(e)),
        }
    }

    async fn record_order(
        &self,
        id: &CustomerId,
        amount: Money,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        // Increment in place so concurrent orders never lose an update.
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                order_count = order_count + 1,
                lifetime_spend = lifetime_spend + $2,
                last_order_at = GREATEST(COALESCE(last_order_at, $3), $3),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(amount.minor_units())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record customer order"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::CustomerNotFound,
                format!("customer {} not found", id),
            ));
        }
        Ok(())
    }
}
