//! Payment domain module.
//!
//! - `aggregate` - Payment attempt and its reconciliation step
//! - `status` - PaymentStatus state machine
//! - `status_mapping` - provider vocabulary to PaymentStatus
//! - `notification` - provider webhook payload validation
//! - `signature` - provider signature verification

mod aggregate;
mod notification;
mod signature;
mod status;
mod status_mapping;

pub use aggregate::{NewPayment, Payment, PaymentUpdate};
pub use notification::{ProviderNotification, RawProviderNotification};
pub use signature::ProviderSignatureVerifier;
pub use status::PaymentStatus;
pub use status_mapping::{map_provider_status, RESULT_CODES, TRANS_STATUSES};
