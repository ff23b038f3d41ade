//! PostgreSQL implementation of EventLogRepository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_with};
use crate::domain::event_log::{
    EventOutcome, EventSource, FailureKind, InboundEvent, ProcessingStatus, SignatureCheck,
};
use crate::domain::foundation::{DomainError, ErrorCode, InboundEventId, Timestamp};
use crate::ports::EventLogRepository;

pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &InboundEventId) -> Result<bool, DomainError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM inbound_events WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up inbound event"))?;
        Ok(found.is_some())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InboundEventRow {
    id: Uuid,
    source: String,
    raw_payload: Vec<u8>,
    headers: Json<BTreeMap<String, String>>,
    received_at: DateTime<Utc>,
    signature_check: String,
    status: String,
    failure_kind: Option<String>,
    linked_entity_id: Option<String>,
    error_detail: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<InboundEventRow> for InboundEvent {
    type Error = DomainError;

    fn try_from(row: InboundEventRow) -> Result<Self, Self::Error> {
        Ok(InboundEvent {
            id: InboundEventId::from_uuid(row.id),
            source: parse_with("source", &row.source, EventSource::parse)?,
            raw_payload: row.raw_payload,
            headers: row.headers.0,
            received_at: Timestamp::from_datetime(row.received_at),
            signature_check: parse_with(
                "signature_check",
                &row.signature_check,
                SignatureCheck::parse,
            )?,
            status: parse_with("status", &row.status, ProcessingStatus::parse)?,
            failure_kind: row
                .failure_kind
                .as_deref()
                .map(|kind| parse_with("failure_kind", kind, FailureKind::parse))
                .transpose()?,
            linked_entity_id: row.linked_entity_id,
            error_detail: row.error_detail,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_EVENT: &str = r#"
    SELECT id, source, raw_payload, headers, received_at, signature_check,
           status, failure_kind, linked_entity_id, error_detail, completed_at
    FROM inbound_events
"#;

fn not_found(id: &InboundEventId) -> DomainError {
    DomainError::new(
        ErrorCode::EventNotFound,
        format!("inbound event {} not found", id),
    )
}

#[async_trait]
impl EventLogRepository for PostgresEventLog {
    async fn append(&self, event: &InboundEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO inbound_events (
                id, source, raw_payload, headers, received_at, signature_check, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.source.as_str())
        .bind(&event.raw_payload)
        .bind(Json(&event.headers))
        .bind(event.received_at.as_datetime())
        .bind(event.signature_check.as_str())
        .bind(event.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to append inbound event"))?;
        Ok(())
    }

    async fn mark_signature(
        &self,
        id: &InboundEventId,
        check: SignatureCheck,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE inbound_events SET signature_check = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(check.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to record signature check"))?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn mark_outcome(
        &self,
        id: &InboundEventId,
        outcome: &EventOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        // Only the first terminal outcome sticks.
        let result = sqlx::query(
            r#"
            UPDATE inbound_events SET
                status = $2,
                failure_kind = $3,
                linked_entity_id = $4,
                error_detail = $5,
                completed_at = $6
            WHERE id = $1 AND status = 'received'
            "#,
        )
        .bind(id.as_uuid())
        .bind(outcome.status.as_str())
        .bind(outcome.failure_kind.map(|k| k.as_str()))
        .bind(&outcome.linked_entity_id)
        .bind(&outcome.detail)
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to write inbound event outcome"))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        if self.exists(id).await? {
            Ok(false)
        } else {
            Err(not_found(id))
        }
    }

    async fn find_by_id(&self, id: &InboundEventId) -> Result<Option<InboundEvent>, DomainError> {
        let row: Option<InboundEventRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_EVENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load inbound event"))?;
        row.map(InboundEvent::try_from).transpose()
    }

    async fn list_recent(
        &self,
        source: EventSource,
        limit: u32,
    ) -> Result<Vec<InboundEvent>, DomainError> {
        let rows: Vec<InboundEventRow> = sqlx::query_as(&format!(
            "{} WHERE source = $1 ORDER BY received_at DESC LIMIT $2",
            SELECT_EVENT
        ))
        .bind(source.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list inbound events"))?;
        rows.into_iter().map(InboundEvent::try_from).collect()
    }
}
