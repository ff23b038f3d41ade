//! PostgreSQL implementation of OrderRepository.
//!
//! Line items are stored as JSONB on the order row; an order is always read
//! and written whole.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{currency_from, db_error, money_from, parse_with, violates};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, MerchantId, OrderId, Timestamp};
use crate::domain::order::{
    LineItem, Order, OrderNumber, OrderPaymentStatus, OrderSource, OrderStatus,
};
use crate::ports::{OrderInsert, OrderRepository};

const NUMBER_KEY: &str = "orders_order_number_key";
const SOURCE_MESSAGE_KEY: &str = "orders_merchant_source_message_key";

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    merchant_id: Uuid,
    customer_id: Uuid,
    order_number: String,
    items: Json<Vec<LineItem>>,
    subtotal: i64,
    tax: i64,
    shipping: i64,
    total: i64,
    currency: String,
    status: String,
    payment_status: String,
    source: String,
    source_message_id: Option<String>,
    delivery_address: Option<String>,
    note: Option<String>,
    needs_clarification: bool,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            order_number: OrderNumber::from_stored(row.order_number),
            items: row.items.0,
            subtotal: money_from("subtotal", row.subtotal)?,
            tax: money_from("tax", row.tax)?,
            shipping: money_from("shipping", row.shipping)?,
            total: money_from("total", row.total)?,
            currency: currency_from("currency", row.currency.trim())?,
            status: parse_with("status", &row.status, OrderStatus::parse)?,
            payment_status: parse_with(
                "payment_status",
                &row.payment_status,
                OrderPaymentStatus::parse,
            )?,
            source: parse_with("source", &row.source, OrderSource::parse)?,
            source_message_id: row.source_message_id,
            delivery_address: row.delivery_address,
            note: row.note,
            needs_clarification: row.needs_clarification,
            created_at: Timestamp::from_datetime(row.created_at),
            modified_at: Timestamp::from_datetime(row.modified_at),
            version: row.version,
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, merchant_id, customer_id, order_number, items, subtotal, tax, shipping,
           total, currency, status, payment_status, source, source_message_id,
           delivery_address, note, needs_clarification, created_at, modified_at, version
    FROM orders
"#;

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<OrderInsert, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, merchant_id, customer_id, order_number, items, subtotal, tax, shipping,
                total, currency, status, payment_status, source, source_message_id,
                delivery_address, note, needs_clarification, created_at, modified_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.merchant_id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(Json(&order.items))
        .bind(order.subtotal.minor_units())
        .bind(order.tax.minor_units())
        .bind(order.shipping.minor_units())
        .bind(order.total.minor_units())
        .bind(order.currency.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.source.as_str())
        .bind(&order.source_message_id)
        .bind(&order.delivery_address)
        .bind(&order.note)
        .bind(order.needs_clarification)
        .bind(order.created_at.as_datetime())
        .bind(order.modified_at.as_datetime())
        .bind(order.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(OrderInsert::Inserted),
            Err(e) if violates(&e, SOURCE_MESSAGE_KEY) => {
                let message_id = order.source_message_id.as_deref().unwrap_or_default();
                match self.find_by_source_message(&order.merchant_id, message_id).await? {
                    Some(existing) => Ok(OrderInsert::DuplicateMessage(existing.id)),
                    None => Err(db_error("Source message conflict without a stored order")(e)),
                }
            }
            Err(e) if violates(&e, NUMBER_KEY) => Ok(OrderInsert::DuplicateNumber),
            Err(e) => Err(db_error("Failed to insert order")(e)),
        }
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                items = $3,
                subtotal = $4,
                tax = $5,
                shipping = $6,
                total = $7,
                status = $8,
                payment_status = $9,
                delivery_address = $10,
                note = $11,
                needs_clarification = $12,
                modified_at = $13,
                version = $14
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(expected_version)
        .bind(Json(&order.items))
        .bind(order.subtotal.minor_units())
        .bind(order.tax.minor_units())
        .bind(order.shipping.minor_units())
        .bind(order.total.minor_units())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.delivery_address)
        .bind(&order.note)
        .bind(order.needs_clarification)
        .bind(order.modified_at.as_datetime())
        .bind(order.version)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update order"))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.find_by_id(&order.id).await? {
            None => Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("order {} not found", order.id),
            )),
            Some(stored) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "order {} is at version {}, expected {}",
                    order.id, stored.version, expected_version
                ),
            )),
        }
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ORDER))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load order"))?;
        row.map(Order::try_from).transpose()
    }

    async fn find_by_source_message(
        &self,
        merchant_id: &MerchantId,
        message_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "{} WHERE merchant_id = $1 AND source_message_id = $2",
            SELECT_ORDER
        ))
        .bind(merchant_id.as_uuid())
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find order by source message"))?;
        row.map(Order::try_from).transpose()
    }
}
