//! PostgreSQL implementation of SubscriptionRepository.
//!
//! The usage counter is only ever changed by single conditional UPDATEs, so
//! concurrent reservations serialize on the row lock and the quota holds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{count_from, count_to, db_error, parse_with, violates};
use crate::domain::foundation::{DomainError, ErrorCode, MerchantId, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    BillingCycle, Feature, PlanTier, Subscription, SubscriptionStatus,
};
use crate::ports::SubscriptionRepository;

const ONE_ACTIVE_KEY: &str = "subscriptions_one_active_per_merchant";

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_exists(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM subscriptions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up subscription"))?;
        match found {
            Some(_) => Ok(()),
            None => Err(not_found(id)),
        }
    }
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("subscription {} not found", id),
    )
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    merchant_id: Uuid,
    plan: String,
    status: String,
    orders_quota: Option<i32>,
    orders_used: i32,
    billing_cycle: String,
    current_period_start: DateTime<Utc>,
    next_billing_date: DateTime<Utc>,
    features: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            plan: parse_with("plan", &row.plan, PlanTier::parse)?,
            status: parse_with("status", &row.status, SubscriptionStatus::parse)?,
            orders_quota: row
                .orders_quota
                .map(|q| count_from("orders_quota", q))
                .transpose()?,
            orders_used: count_from("orders_used", row.orders_used)?,
            billing_cycle: parse_with("billing_cycle", &row.billing_cycle, BillingCycle::parse)?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            next_billing_date: Timestamp::from_datetime(row.next_billing_date),
            features: row
                .features
                .iter()
                .map(|f| parse_with("features", f, Feature::parse))
                .collect::<Result<_, _>>()?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn feature_names(subscription: &Subscription) -> Vec<String> {
    subscription
        .features
        .iter()
        .map(|f| f.as_str().to_string())
        .collect()
}

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT id, merchant_id, plan, status, orders_quota, orders_used, billing_cycle,
           current_period_start, next_billing_date, features, created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_active(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE merchant_id = $1 AND status = 'active'",
            SELECT_SUBSCRIPTION
        ))
        .bind(merchant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load active subscription"))?;
        row.map(Subscription::try_from).transpose()
    }

    async fn find_latest(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE merchant_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_SUBSCRIPTION
        ))
        .bind(merchant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load latest subscription"))?;
        row.map(Subscription::try_from).transpose()
    }

    async fn try_increment_usage(&self, id: &SubscriptionId) -> Result<Option<u32>, DomainError> {
        let used: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE subscriptions SET
                orders_used = orders_used + 1,
                updated_at = now()
            WHERE id = $1
              AND status = 'active'
              AND (orders_quota IS NULL OR orders_used < orders_quota)
            RETURNING orders_used
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to reserve order slot"))?;

        match used {
            Some((used,)) => Ok(Some(count_from("orders_used", used)?)),
            None => {
                self.ensure_exists(id).await?;
                Ok(None)
            }
        }
    }

    async fn release_usage(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                orders_used = GREATEST(orders_used - 1, 0),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to release order slot"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, merchant_id, plan, status, orders_quota, orders_used, billing_cycle,
                current_period_start, next_billing_date, features, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.merchant_id.as_uuid())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.orders_quota.map(count_to))
        .bind(count_to(subscription.orders_used))
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.next_billing_date.as_datetime())
        .bind(feature_names(subscription))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, ONE_ACTIVE_KEY) {
                return DomainError::new(
                    ErrorCode::AlreadyExists,
                    format!(
                        "merchant {} already has an active subscription",
                        subscription.merchant_id
                    ),
                );
            }
            db_error("Failed to insert subscription")(e)
        })?;
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        // orders_used is left to the counter statements above.
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                status = $3,
                orders_quota = $4,
                billing_cycle = $5,
                current_period_start = $6,
                next_billing_date = $7,
                features = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.orders_quota.map(count_to))
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.next_billing_date.as_datetime())
        .bind(feature_names(subscription))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, ONE_ACTIVE_KEY) {
                return DomainError::new(
                    ErrorCode::AlreadyExists,
                    format!(
                        "merchant {} already has an active subscription",
                        subscription.merchant_id
                    ),
                );
            }
            db_error("Failed to update subscription")(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(not_found(&subscription.id));
        }
        Ok(())
    }
}
