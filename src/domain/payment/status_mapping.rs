//! Provider status vocabulary to internal payment status.
//!
//! The provider reports a `(resultCode, transStatus)` pair. The mapping is
//! total: any pair, documented or not, resolves to exactly one status.

use super::PaymentStatus;

/// Result code the provider sends with a settled payment.
pub const RESULT_SUCCESS: &str = "00";

/// Result code for a freshly created payment.
pub const RESULT_CREATED: &str = "201";

/// Result codes meaning the provider is still waiting on the payer.
pub const RESULT_WAITING: &[&str] = &["623", "662"];

/// Documented `transStatus` values.
pub const TRANS_STATUSES: &[&str] = &["ACCEPTED", "REFUSED", "PENDING", "CREATED"];

/// Documented `resultCode` values.
pub const RESULT_CODES: &[&str] = &[
    "00", "201", "600", "602", "603", "604", "623", "627", "662", "-1",
];

/// Maps a provider `(resultCode, transStatus)` pair to an internal status.
///
/// | resultCode | transStatus | status |
/// |---|---|---|
/// | `00` | `ACCEPTED` | completed |
/// | any | `PENDING` | processing |
/// | `623`, `662` | any | processing |
/// | any | `CREATED` | pending |
/// | `201` | any | pending |
/// | anything else | | failed |
pub fn map_provider_status(result_code: &str, trans_status: &str) -> PaymentStatus {
    let code = result_code.trim();
    let status = trans_status.trim().to_ascii_uppercase();

    if code == RESULT_SUCCESS && status == "ACCEPTED" {
        return PaymentStatus::Completed;
    }
    if status == "PENDING" || RESULT_WAITING.contains(&code) {
        return PaymentStatus::Processing;
    }
    if status == "CREATED" || code == RESULT_CREATED {
        return PaymentStatus::Pending;
    }
    PaymentStatus::Failed
}
