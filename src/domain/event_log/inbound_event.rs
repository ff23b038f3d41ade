//! InboundEvent - append-only audit record of one webhook call.
//!
//! The raw payload is written before anything tries to interpret it, so an
//! event is never lost even when processing blows up halfway. After creation
//! only two things may change: the signature check and the terminal outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::{InboundEventId, Timestamp};

/// Which external system delivered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Chat,
    PaymentProvider,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Chat => "chat",
            EventSource::PaymentProvider => "payment_provider",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(EventSource::Chat),
            "payment_provider" => Some(EventSource::PaymentProvider),
            _ => None,
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of authenticating the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureCheck {
    /// Not checked yet.
    Pending,
    Verified,
    Rejected,
    /// No secret is configured for this source, so nothing was checked.
    NotConfigured,
}

impl SignatureCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureCheck::Pending => "pending",
            SignatureCheck::Verified => "verified",
            SignatureCheck::Rejected => "rejected",
            SignatureCheck::NotConfigured => "not_configured",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SignatureCheck::Pending),
            "verified" => Some(SignatureCheck::Verified),
            "rejected" => Some(SignatureCheck::Rejected),
            "not_configured" => Some(SignatureCheck::NotConfigured),
            _ => None,
        }
    }

    pub fn from_result<E>(result: &Result<(), E>) -> Self {
        if result.is_ok() {
            SignatureCheck::Verified
        } else {
            SignatureCheck::Rejected
        }
    }
}

impl fmt::Display for SignatureCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Received,
    Processed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Received => "received",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(ProcessingStatus::Received),
            "processed" => Some(ProcessingStatus::Processed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingStatus::Received)
    }
}

/// Error taxonomy shared by both webhook consumers.
///
/// Every failure is translated into one of these before it reaches the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad JSON or a missing required field.
    MalformedInput,
    /// Signature, token or site check failed.
    Authentication,
    /// The event points at something we cannot find and cannot infer.
    UnresolvableReference,
    /// A human-driven transition that the lifecycle rejects.
    InvalidTransition,
    /// Subscription or quota refused the action.
    QuotaDenied,
    /// The record store did not answer.
    StoreUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedInput => "malformed_input",
            FailureKind::Authentication => "authentication",
            FailureKind::UnresolvableReference => "unresolvable_reference",
            FailureKind::InvalidTransition => "invalid_transition",
            FailureKind::QuotaDenied => "quota_denied",
            FailureKind::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "malformed_input" => Some(FailureKind::MalformedInput),
            "authentication" => Some(FailureKind::Authentication),
            "unresolvable_reference" => Some(FailureKind::UnresolvableReference),
            "invalid_transition" => Some(FailureKind::InvalidTransition),
            "quota_denied" => Some(FailureKind::QuotaDenied),
            "store_unavailable" => Some(FailureKind::StoreUnavailable),
            _ => None,
        }
    }

    /// Only store outages are worth a provider redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::StoreUnavailable)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome written once processing finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub status: ProcessingStatus,
    pub failure_kind: Option<FailureKind>,
    pub linked_entity_id: Option<String>,
    pub detail: Option<String>,
}

impl EventOutcome {
    /// Successful processing, optionally pointing at the entity it touched.
    pub fn processed(linked_entity_id: Option<String>, detail: Option<String>) -> Self {
        Self {
            status: ProcessingStatus::Processed,
            failure_kind: None,
            linked_entity_id,
            detail,
        }
    }

    /// Failed processing with its taxonomy kind.
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            status: ProcessingStatus::Failed,
            failure_kind: Some(kind),
            linked_entity_id: None,
            detail: Some(detail.into()),
        }
    }

    /// Links the failure to an entity, when one was identified before failing.
    pub fn linked_to(mut self, entity_id: impl Into<String>) -> Self {
        self.linked_entity_id = Some(entity_id.into());
        self
    }
}

/// One recorded webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub id: InboundEventId,
    pub source: EventSource,
    /// Body bytes exactly as received, valid UTF-8 or not. Never modified.
    pub raw_payload: Vec<u8>,
    /// Allow-listed request headers.
    pub headers: BTreeMap<String, String>,
    pub received_at: Timestamp,
    pub signature_check: SignatureCheck,
    pub status: ProcessingStatus,
    pub failure_kind: Option<FailureKind>,
    pub linked_entity_id: Option<String>,
    pub error_detail: Option<String>,
    pub completed_at: Option<Timestamp>,
}

impl InboundEvent {
    /// Creates a freshly received event.
    pub fn received(
        source: EventSource,
        raw_payload: impl Into<Vec<u8>>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: InboundEventId::new(),
            source,
            raw_payload: raw_payload.into(),
            headers,
            received_at: Timestamp::now(),
            signature_check: SignatureCheck::Pending,
            status: ProcessingStatus::Received,
            failure_kind: None,
            linked_entity_id: None,
            error_detail: None,
            completed_at: None,
        }
    }

    pub fn mark_signature(&mut self, check: SignatureCheck) {
        self.signature_check = check;
    }

    /// The payload as text, when it is valid UTF-8.
    pub fn payload_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.raw_payload).ok()
    }

    /// Writes the terminal outcome once.
    ///
    /// Returns false, leaving the event untouched, when an outcome was already
    /// written; repeated calls therefore converge on the first outcome.
    pub fn mark_outcome(&mut self, outcome: EventOutcome, at: Timestamp) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status;
        self.failure_kind = outcome.failure_kind;
        self.linked_entity_id = outcome.linked_entity_id;
        self.error_detail = outcome.detail;
        self.completed_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> InboundEvent {
        InboundEvent::received(EventSource::Chat, "{\"object\":\"x\"}", BTreeMap::new())
    }

    #[test]
    fn received_event_starts_unverified_and_open() {
        let e = event();
        assert_eq!(e.status, ProcessingStatus::Received);
        assert_eq!(e.signature_check, SignatureCheck::Pending);
        assert!(e.completed_at.is_none());
    }

    #[test]
    fn mark_outcome_writes_once() {
        let mut e = event();
        let now = Timestamp::now();

        assert!(e.mark_outcome(EventOutcome::processed(Some("ord".into()), None), now));
        assert!(!e.mark_outcome(
            EventOutcome::failed(FailureKind::MalformedInput, "late"),
            now
        ));

        assert_eq!(e.status, ProcessingStatus::Processed);
        assert_eq!(e.linked_entity_id.as_deref(), Some("ord"));
        assert!(e.failure_kind.is_none());
    }

    #[test]
    fn failed_outcome_keeps_kind_and_detail() {
        let mut e = event();
        e.mark_outcome(
            EventOutcome::failed(FailureKind::UnresolvableReference, "no order id")
                .linked_to("pay-1"),
            Timestamp::now(),
        );

        assert_eq!(e.status, ProcessingStatus::Failed);
        assert_eq!(e.failure_kind, Some(FailureKind::UnresolvableReference));
        assert_eq!(e.error_detail.as_deref(), Some("no order id"));
        assert_eq!(e.linked_entity_id.as_deref(), Some("pay-1"));
    }

    #[test]
    fn payload_survives_outcome_updates() {
        let mut e = event();
        let raw = e.raw_payload.clone();
        e.mark_signature(SignatureCheck::Verified);
        e.mark_outcome(EventOutcome::processed(None, None), Timestamp::now());
        assert_eq!(e.raw_payload, raw);
    }

    #[test]
    fn non_utf8_payload_is_kept_byte_for_byte() {
        let raw = vec![b'{', 0xff, 0xfe, b'}'];
        let e = InboundEvent::received(EventSource::PaymentProvider, raw.clone(), BTreeMap::new());
        assert_eq!(e.raw_payload, raw);
        assert!(e.payload_text().is_none());
    }

    #[test]
    fn signature_check_round_trips_through_text() {
        for check in [
            SignatureCheck::Pending,
            SignatureCheck::Verified,
            SignatureCheck::Rejected,
            SignatureCheck::NotConfigured,
        ] {
            assert_eq!(SignatureCheck::parse(check.as_str()), Some(check));
        }
    }

    #[test]
    fn only_store_unavailable_is_retryable() {
        for kind in [
            FailureKind::MalformedInput,
            FailureKind::Authentication,
            FailureKind::UnresolvableReference,
            FailureKind::InvalidTransition,
            FailureKind::QuotaDenied,
        ] {
            assert!(!kind.is_retryable(), "{} should not be retryable", kind);
        }
        assert!(FailureKind::StoreUnavailable.is_retryable());
    }

    #[test]
    fn string_forms_roundtrip() {
        for kind in [FailureKind::MalformedInput, FailureKind::StoreUnavailable] {
            assert_eq!(FailureKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventSource::parse("chat"), Some(EventSource::Chat));
        assert_eq!(ProcessingStatus::parse("failed"), Some(ProcessingStatus::Failed));
    }
}
