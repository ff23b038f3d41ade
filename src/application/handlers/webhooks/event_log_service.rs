//! EventLogService - durable record of every inbound webhook call.
//!
//! `record` runs before any parsing. Later writes are keyed by id and
//! converge: the first terminal outcome wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::event_log::{EventOutcome, EventSource, InboundEvent, SignatureCheck};
use crate::domain::foundation::{DomainError, InboundEventId, Timestamp};
use crate::domain::webhook::WebhookError;
use crate::ports::EventLogRepository;

/// A webhook call that ended without being processed.
///
/// `event_id` is `None` when the call could not even be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRejection {
    pub event_id: Option<InboundEventId>,
    pub error: WebhookError,
}

pub struct EventLogService {
    log: Arc<dyn EventLogRepository>,
}

impl EventLogService {
    pub fn new(log: Arc<dyn EventLogRepository>) -> Self {
        Self { log }
    }

    /// Appends the raw call. A failure here is retriable for the sender.
    pub async fn record(
        &self,
        source: EventSource,
        raw_payload: &[u8],
        headers: BTreeMap<String, String>,
    ) -> Result<InboundEventId, WebhookRejection> {
        let event = InboundEvent::received(source, raw_payload, headers);
        match self.log.append(&event).await {
            Ok(()) => Ok(event.id),
            Err(e) => {
                error!(source = %source, error = %e, "failed to record inbound event");
                Err(WebhookRejection {
                    event_id: None,
                    error: WebhookError::Database(e.message),
                })
            }
        }
    }

    pub async fn mark_signature(
        &self,
        id: &InboundEventId,
        check: SignatureCheck,
    ) -> Result<(), DomainError> {
        self.log.mark_signature(id, check).await
    }

    /// Writes a processed outcome.
    pub async fn succeed(&self, id: &InboundEventId, outcome: EventOutcome) {
        self.write_outcome(id, outcome).await;
    }

    /// Writes the failure and turns it into a rejection for the caller.
    ///
    /// Authentication failures are logged as security events along with the
    /// stored headers.
    pub async fn fail(&self, id: &InboundEventId, err: WebhookError) -> WebhookRejection {
        if err.is_security_event() {
            let headers = match self.log.find_by_id(id).await {
                Ok(Some(event)) => event.headers,
                _ => BTreeMap::new(),
            };
            warn!(
                event_id = %id,
                security_event = true,
                headers = ?headers,
                error = %err,
                "webhook signature rejected"
            );
        } else if err.is_retryable() {
            error!(event_id = %id, error = %err, "webhook processing failed, sender will retry");
        } else {
            warn!(event_id = %id, error = %err, "webhook processing failed");
        }

        let outcome = match err.failure_kind() {
            Some(kind) => EventOutcome::failed(kind, err.to_string()),
            None => EventOutcome::processed(None, Some(err.to_string())),
        };
        self.write_outcome(id, outcome).await;

        WebhookRejection {
            event_id: Some(*id),
            error: err,
        }
    }

    async fn write_outcome(&self, id: &InboundEventId, outcome: EventOutcome) {
        let status = outcome.status;
        match self.log.mark_outcome(id, &outcome, Timestamp::now()).await {
            Ok(true) => info!(event_id = %id, status = %status.as_str(), "inbound event concluded"),
            Ok(false) => {}
            Err(e) => error!(event_id = %id, error = %e, "failed to write event outcome"),
        }
    }
}
