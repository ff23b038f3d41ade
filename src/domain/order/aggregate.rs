//! Order aggregate.
//!
//! The order owns its line items and both status fields. Every mutation goes
//! through [`Order::apply`], which enforces the allow-lists and the coupling
//! between fulfilment and payment status.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{OrderError, OrderPaymentStatus, OrderStatus};
use crate::domain::foundation::{
    Currency, CustomerId, MerchantId, Money, OrderId, StateMachine, Timestamp, ValidationError,
};

/// Human-readable order reference, `ORD-YYYYMMDD-XXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derives a number from the creation date and the order id.
    pub fn generate(id: &OrderId, at: &Timestamp) -> Self {
        let suffix: String = id
            .as_uuid()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect::<String>()
            .to_ascii_uppercase();
        Self(format!("ORD-{}-{}", at.compact_date(), suffix))
    }

    /// Wraps a stored value without re-deriving it.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Chat,
    Api,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Chat => "chat",
            OrderSource::Api => "api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(OrderSource::Chat),
            "api" => Some(OrderSource::Api),
            _ => None,
        }
    }
}

/// One line of an order. `total` is always `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("item.name"));
        }
        if quantity == 0 {
            return Err(ValidationError::out_of_range(
                "item.quantity",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(Self {
            total: unit_price.times(quantity)?,
            name,
            quantity,
            unit_price,
        })
    }
}

/// Per-merchant pricing applied on top of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charges {
    pub tax_bps: u32,
    pub shipping: Money,
}

impl Charges {
    pub const NONE: Charges = Charges {
        tax_bps: 0,
        shipping: Money::ZERO,
    };
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    pub currency: Currency,
    pub source: OrderSource,
    pub source_message_id: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,
    pub needs_clarification: bool,
}

/// Both status fields at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
}

/// A requested change to one of the status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    Status(OrderStatus),
    PaymentStatus(OrderPaymentStatus),
}

impl fmt::Display for OrderChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderChange::Status(s) => write!(f, "status={}", s),
            OrderChange::PaymentStatus(s) => write!(f, "payment_status={}", s),
        }
    }
}

/// Who asked for the change.
///
/// Webhook deliveries may repeat a change that is already applied; that is
/// reported as [`TransitionOutcome::Unchanged`] instead of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOrigin {
    Api,
    Webhook,
}

/// Result of applying a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { before: OrderState, after: OrderState },
    Unchanged,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// Order aggregate.
///
/// # Invariants
///
/// - every line `total = quantity * unit_price`
/// - `subtotal = Σ line totals`, `total = subtotal + tax + shipping`
/// - `version` grows by one per applied transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub order_number: OrderNumber,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub currency: Currency,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub source: OrderSource,
    pub source_message_id: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,
    pub needs_clarification: bool,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
    pub version: i64,
}

impl Order {
    /// Builds a new pending order and computes its totals.
    pub fn place(request: PlaceOrder, charges: Charges) -> Result<Self, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let subtotal = Money::try_sum(request.items.iter().map(|item| item.total))?;
        let tax = subtotal.basis_points(charges.tax_bps)?;
        let total = subtotal.checked_add(tax)?.checked_add(charges.shipping)?;
        let now = Timestamp::now();
        let id = OrderId::new();

        Ok(Self {
            order_number: OrderNumber::generate(&id, &now),
            id,
            merchant_id: request.merchant_id,
            customer_id: request.customer_id,
            items: request.items,
            subtotal,
            tax,
            shipping: charges.shipping,
            total,
            currency: request.currency,
            status: OrderStatus::Pending,
            payment_status: OrderPaymentStatus::Pending,
            source: request.source,
            source_message_id: request.source_message_id,
            delivery_address: clean(request.delivery_address),
            note: clean(request.note),
            needs_clarification: request.needs_clarification,
            created_at: now,
            modified_at: now,
            version: 1,
        })
    }

    /// Re-derives a fresh order number, used after a number collision.
    pub fn renumber(&mut self) {
        self.id = OrderId::new();
        self.order_number = OrderNumber::generate(&self.id, &self.created_at);
    }

    pub fn state(&self) -> OrderState {
        OrderState {
            status: self.status,
            payment_status: self.payment_status,
        }
    }

    /// Checks the arithmetic invariants.
    pub fn totals_consistent(&self) -> bool {
        let lines_ok = self
            .items
            .iter()
            .all(|item| item.unit_price.times(item.quantity) == Ok(item.total));
        let subtotal = Money::try_sum(self.items.iter().map(|item| item.total));
        let total = self
            .subtotal
            .checked_add(self.tax)
            .and_then(|t| t.checked_add(self.shipping));
        lines_ok && subtotal == Ok(self.subtotal) && total == Ok(self.total)
    }

    /// Applies one requested change against the current state.
    ///
    /// - `payment_status = paid` needs `status` pending or confirmed, and
    ///   advances a pending order to paid
    /// - `status = refunded` moves a paid payment to refunded
    /// - a webhook repeating the current value is `Unchanged`
    pub fn apply(
        &mut self,
        change: OrderChange,
        origin: TransitionOrigin,
    ) -> Result<TransitionOutcome, OrderError> {
        let before = self.state();

        match change {
            OrderChange::Status(target) => {
                if target == self.status && origin == TransitionOrigin::Webhook {
                    return Ok(TransitionOutcome::Unchanged);
                }
                self.status = self.status.transition_to(target)?;
                if target == OrderStatus::Refunded
                    && self.payment_status == OrderPaymentStatus::Paid
                {
                    self.payment_status = OrderPaymentStatus::Refunded;
                }
            }
            OrderChange::PaymentStatus(target) => {
                if target == self.payment_status && origin == TransitionOrigin::Webhook {
                    return Ok(TransitionOutcome::Unchanged);
                }
                let next = self.payment_status.transition_to(target)?;
                if next == OrderPaymentStatus::Paid {
                    if !self.status.accepts_payment() {
                        return Err(OrderError::PaymentNotAccepted {
                            status: self.status,
                        });
                    }
                    if self.status == OrderStatus::Pending {
                        self.status = OrderStatus::Paid;
                    }
                }
                self.payment_status = next;
            }
        }

        self.modified_at = Timestamp::now();
        self.version += 1;

        Ok(TransitionOutcome::Applied {
            before,
            after: self.state(),
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
