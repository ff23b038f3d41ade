//! Event log domain module.
//!
//! Append-only persistence model for every inbound webhook call, plus the
//! error taxonomy used to describe processing failures.

mod inbound_event;

pub use inbound_event::{
    EventOutcome, EventSource, FailureKind, InboundEvent, ProcessingStatus, SignatureCheck,
};
