//! Payment provider notification payload.
//!
//! The wire shape is loose: every field is optional, `amount` may be a JSON
//! number or a string, and `customData` is a JSON document serialized into a
//! string. [`ProviderNotification::parse`] turns it into a strict record or
//! rejects it before any business logic runs.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::{Currency, Money, OrderId};
use crate::domain::webhook::WebhookError;

/// Notification exactly as the provider posts it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderNotification {
    pub transaction_id: Option<String>,
    pub site_id: Option<Value>,
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub result_code: Option<Value>,
    pub trans_status: Option<String>,
    pub custom_data: Option<Value>,
    pub payment_method: Option<String>,
    pub phone: Option<String>,
    pub signature: Option<String>,
    pub description: Option<String>,
}

/// A validated provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderNotification {
    pub transaction_id: String,
    pub site_id: String,
    pub amount: Money,
    pub currency: Currency,
    pub result_code: String,
    pub trans_status: String,
    pub order_id_hint: Option<OrderId>,
    pub payment_method: Option<String>,
    pub phone: Option<String>,
    pub signature: String,
}

impl ProviderNotification {
    /// Parses and validates a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawProviderNotification = serde_json::from_slice(body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Validates required fields, failing on the first one missing.
    pub fn from_raw(raw: RawProviderNotification) -> Result<Self, WebhookError> {
        let transaction_id = required_text(raw.transaction_id, "transactionId")?;
        let site_id = required_scalar(raw.site_id, "siteId")?;
        let amount = parse_amount(raw.amount.ok_or(WebhookError::MissingField("amount"))?)?;
        let currency = Currency::new(required_text(raw.currency, "currency")?).map_err(|e| {
            WebhookError::InvalidField {
                field: "currency",
                reason: e.to_string(),
            }
        })?;
        let result_code = required_scalar(raw.result_code, "resultCode")?;
        let trans_status = required_text(raw.trans_status, "transStatus")?;
        let signature = required_text(raw.signature, "signature")?;

        Ok(Self {
            transaction_id,
            site_id,
            amount,
            currency,
            result_code,
            trans_status,
            order_id_hint: raw.custom_data.as_ref().and_then(order_id_from_custom_data),
            payment_method: optional_text(raw.payment_method),
            phone: optional_text(raw.phone),
            signature,
        })
    }

    /// Canonical string the provider signs.
    ///
    /// Field order: `siteId`, `transactionId`, `amount`, `currency`,
    /// `resultCode`, `transStatus`.
    pub fn signing_payload(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.site_id,
            self.transaction_id,
            self.amount.minor_units(),
            self.currency,
            self.result_code,
            self.trans_status
        )
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, WebhookError> {
    optional_text(value).ok_or(WebhookError::MissingField(field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts a string or a number, since providers are inconsistent about codes.
fn required_scalar(value: Option<Value>, field: &'static str) -> Result<String, WebhookError> {
    match value {
        Some(Value::String(s)) => required_text(Some(s), field),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Err(WebhookError::MissingField(field)),
        Some(other) => Err(WebhookError::InvalidField {
            field,
            reason: format!("expected string or number, got {}", other),
        }),
    }
}

/// Parses an amount sent as `1500`, `"1500"` or `"1500.00"`.
///
/// Fractional minor units are rejected rather than rounded.
fn parse_amount(value: Value) -> Result<Money, WebhookError> {
    let invalid = |reason: String| WebhookError::InvalidField {
        field: "amount",
        reason,
    };

    let units = match &value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => f as i64,
                _ => return Err(invalid(format!("not a whole amount: {}", n))),
            },
        },
        Value::String(s) => {
            let s = s.trim();
            let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
            if !frac.chars().all(|c| c == '0') {
                return Err(invalid(format!("not a whole amount: {}", s)));
            }
            whole
                .parse::<i64>()
                .map_err(|_| invalid(format!("not a number: {}", s)))?
        }
        Value::Null => return Err(WebhookError::MissingField("amount")),
        other => return Err(invalid(format!("expected number or string, got {}", other))),
    };

    Money::new(units).map_err(|e| invalid(e.to_string()))
}

/// Pulls `orderId` out of the `customData` echo.
///
/// The provider echoes whatever was sent at initiation, normally a JSON
/// object serialized to a string; a bare object is accepted as well.
fn order_id_from_custom_data(custom: &Value) -> Option<OrderId> {
    let doc = match custom {
        Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
        Value::Object(_) => custom.clone(),
        _ => return None,
    };
    let id = doc
        .get("orderId")
        .or_else(|| doc.get("order_id"))?
        .as_str()?;
    id.trim().parse().ok()
}
