//! EventLogRepository port - durable record of every inbound webhook call.
//!
//! The log is written before any interpretation, so a crash or store outage
//! later in processing never loses the event. Updates are keyed by id and
//! are idempotent: an outcome is written once, later writes are ignored.

use async_trait::async_trait;

use crate::domain::event_log::{EventOutcome, EventSource, InboundEvent, SignatureCheck};
use crate::domain::foundation::{DomainError, InboundEventId, Timestamp};

/// Port for the append-only inbound event log.
#[async_trait]
pub trait EventLogRepository: Send + Sync {
    /// Appends a newly received event.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` when the write is not durable; callers answer 5xx
    async fn append(&self, event: &InboundEvent) -> Result<(), DomainError>;

    /// Stores the outcome of the sender authentication step.
    async fn mark_signature(
        &self,
        id: &InboundEventId,
        check: SignatureCheck,
    ) -> Result<(), DomainError>;

    /// Stores the terminal outcome. A second outcome for the same id is a no-op.
    ///
    /// Returns `false` when an outcome was already recorded.
    async fn mark_outcome(
        &self,
        id: &InboundEventId,
        outcome: &EventOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Find an event by id.
    async fn find_by_id(&self, id: &InboundEventId) -> Result<Option<InboundEvent>, DomainError>;

    /// Most recent events for one source, newest first. Used for triage.
    async fn list_recent(
        &self,
        source: EventSource,
        limit: u32,
    ) -> Result<Vec<InboundEvent>, DomainError>;
}
