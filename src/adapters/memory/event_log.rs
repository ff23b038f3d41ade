use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::event_log::{EventOutcome, EventSource, InboundEvent, SignatureCheck};
use crate::domain::foundation::{DomainError, ErrorCode, InboundEventId, Timestamp};
use crate::ports::EventLogRepository;

/// In-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<HashMap<InboundEventId, InboundEvent>>,
    outage: Outage,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            outage,
        }
    }

    /// Every stored event, oldest first.
    pub async fn all(&self) -> Vec<InboundEvent> {
        let mut events: Vec<_> = self.events.read().await.values().cloned().collect();
        events.sort_by_key(|e| e.received_at);
        events
    }
}

fn not_found(id: &InboundEventId) -> DomainError {
    DomainError::new(ErrorCode::EventNotFound, format!("event {} not found", id))
}

#[async_trait]
impl EventLogRepository for InMemoryEventLog {
    async fn append(&self, event: &InboundEvent) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut events = self.events.write().await;
        events.entry(event.id).or_insert_with(|| event.clone());
        Ok(())
    }

    async fn mark_signature(
        &self,
        id: &InboundEventId,
        check: SignatureCheck,
    ) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut events = self.events.write().await;
        let event = events.get_mut(id).ok_or_else(|| not_found(id))?;
        event.mark_signature(check);
        Ok(())
    }

    async fn mark_outcome(
        &self,
        id: &InboundEventId,
        outcome: &EventOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        self.outage.check()?;
        let mut events = self.events.write().await;
        let event = events.get_mut(id).ok_or_else(|| not_found(id))?;
        Ok(event.mark_outcome(outcome.clone(), at))
    }

    async fn find_by_id(&self, id: &InboundEventId) -> Result<Option<InboundEvent>, DomainError> {
        self.outage.check()?;
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn list_recent(
        &self,
        source: EventSource,
        limit: u32,
    ) -> Result<Vec<InboundEvent>, DomainError> {
        self.outage.check()?;
        let mut events: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.source == source)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        events.truncate(limit as usize);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_log::{FailureKind, ProcessingStatus};
    use std::collections::BTreeMap;

    fn event() -> InboundEvent {
        InboundEvent::received(EventSource::Chat, "{}".to_string(), BTreeMap::new())
    }

    #[tokio::test]
    async fn append_then_mark_outcome_once() {
        let log = InMemoryEventLog::new();
        let e = event();
        log.append(&e).await.unwrap();
        log.mark_signature(&e.id, SignatureCheck::Verified).await.unwrap();

        let first = log
            .mark_outcome(&e.id, &EventOutcome::processed(None, None), Timestamp::now())
            .await
            .unwrap();
        let second = log
            .mark_outcome(
                &e.id,
                &EventOutcome::failed(FailureKind::MalformedInput, "late"),
                Timestamp::now(),
            )
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let stored = log.find_by_id(&e.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProcessingStatus::Processed);
        assert_eq!(stored.signature_check, SignatureCheck::Verified);
    }

    #[tokio::test]
    async fn outage_fails_append() {
        let outage = Outage::new();
        let log = InMemoryEventLog::with_outage(outage.clone());
        outage.set(true);
        let err = log.append(&event()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn list_recent_filters_by_source() {
        let log = InMemoryEventLog::new();
        log.append(&event()).await.unwrap();
        log.append(&InboundEvent::received(
            EventSource::PaymentProvider,
            "{}".to_string(),
            BTreeMap::new(),
        ))
        .await
        .unwrap();

        let chat = log.list_recent(EventSource::Chat, 10).await.unwrap();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].source, EventSource::Chat);
    }
}
