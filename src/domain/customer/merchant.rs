//! Merchant reference data, read-only for the engine.

use serde::{Deserialize, Serialize};

use super::ContactHandle;
use crate::domain::foundation::{Currency, MerchantId};

/// A business account as the engine needs to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub display_name: String,
    /// Business phone-number id reported by the chat platform.
    pub channel_id: String,
    /// Where merchant-facing notifications go.
    pub contact: Option<ContactHandle>,
    pub default_currency: Currency,
}
