//! HandlePaymentWebhookHandler - the payment reconciler.
//!
//! Provider notification to payment row to order transition. Every step
//! converges under redelivery: the payment only moves along valid
//! transitions, and the order step is re-applied from the payment's
//! effective status so a half-finished earlier delivery completes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::{EventLogService, WebhookRejection};
use crate::application::handlers::order::OrderLifecycleManager;
use crate::domain::event_log::{EventOutcome, EventSource, SignatureCheck};
use crate::domain::foundation::{ErrorCode, InboundEventId, OrderId, PaymentId};
use crate::domain::order::{
    Order, OrderChange, OrderPaymentStatus, TransitionOrigin, TransitionOutcome,
};
use crate::domain::payment::{
    map_provider_status, NewPayment, Payment, PaymentStatus, PaymentUpdate, ProviderNotification,
    ProviderSignatureVerifier,
};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    CustomerRepository, MerchantDirectory, Notification, NotificationKind, Notifier,
    OrderRepository, PaymentRepository, Recipient, SaveResult,
};

/// Attempts before a concurrent payment write is reported as retriable.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlePaymentWebhookResult {
    pub event_id: InboundEventId,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    /// Status after reconciliation.
    pub payment_status: PaymentStatus,
    pub payment_changed: bool,
    pub order_changed: bool,
}

pub struct HandlePaymentWebhookHandler {
    events: Arc<EventLogService>,
    verifier: ProviderSignatureVerifier,
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    lifecycle: Arc<OrderLifecycleManager>,
    merchants: Arc<dyn MerchantDirectory>,
    customers: Arc<dyn CustomerRepository>,
    notifier: Arc<dyn Notifier>,
    provider: String,
    ttl_minutes: i64,
}

/// Collaborators of the reconciler, grouped to keep `new` readable.
pub struct PaymentReconcilerDeps {
    pub events: Arc<EventLogService>,
    pub payments: Arc<dyn PaymentRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub lifecycle: Arc<OrderLifecycleManager>,
    pub merchants: Arc<dyn MerchantDirectory>,
    pub customers: Arc<dyn CustomerRepository>,
    pub notifier: Arc<dyn Notifier>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        deps: PaymentReconcilerDeps,
        verifier: ProviderSignatureVerifier,
        provider: impl Into<String>,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            events: deps.events,
            verifier,
            payments: deps.payments,
            orders: deps.orders,
            lifecycle: deps.lifecycle,
            merchants: deps.merchants,
            customers: deps.customers,
            notifier: deps.notifier,
            provider: provider.into(),
            ttl_minutes,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookRejection> {
        let event_id = self
            .events
            .record(EventSource::PaymentProvider, &cmd.body, cmd.headers)
            .await?;

        match self.reconcile(&event_id, &cmd.body).await {
            Ok(result) => {
                let detail = format!(
                    "payment {}{}",
                    result.payment_status,
                    if result.payment_changed { "" } else { " (unchanged)" }
                );
                self.events
                    .succeed(
                        &event_id,
                        EventOutcome::processed(Some(result.payment_id.to_string()), Some(detail)),
                    )
                    .await;
                Ok(result)
            }
            Err(err) => Err(self.events.fail(&event_id, err).await),
        }
    }

    async fn reconcile(
        &self,
        event_id: &InboundEventId,
        body: &[u8],
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let notification = ProviderNotification::parse(body)?;

        let verified = self.verifier.verify(&notification);
        self.events
            .mark_signature(event_id, SignatureCheck::from_result(&verified))
            .await?;
        verified?;

        let snapshot: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let (payment, update) = self.apply_report(event_id, &notification, snapshot).await?;

        let order_changed = self.drive_order(&payment).await?;

        Ok(HandlePaymentWebhookResult {
            event_id: *event_id,
            payment_id: payment.id,
            order_id: payment.order_id,
            payment_status: payment.status,
            payment_changed: update.is_transition(),
            order_changed,
        })
    }

    /// Reconciles the stored payment against the report and writes it if the
    /// status is still the one read. A concurrent delivery that moved the
    /// payment first forces a re-read, and the report is re-checked against
    /// the fresh status.
    async fn apply_report(
        &self,
        event_id: &InboundEventId,
        notification: &ProviderNotification,
        snapshot: serde_json::Value,
    ) -> Result<(Payment, PaymentUpdate), WebhookError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut payment = self.find_or_backfill(notification).await?;
            let expected_status = payment.status;

            let (reported, failure_reason) = self.effective_report(notification, &payment);
            let update = payment.reconcile(reported, failure_reason, snapshot.clone());

            if !update.is_transition() {
                info!(
                    event_id = %event_id,
                    payment_id = %payment.id,
                    status = %payment.status,
                    reported = %reported,
                    "payment unchanged"
                );
                return Ok((payment, update));
            }

            if notification.payment_method.is_some() && payment.payment_method.is_none() {
                payment.payment_method = notification.payment_method.clone();
            }
            if notification.phone.is_some() && payment.payer_phone.is_none() {
                payment.payer_phone = notification.phone.clone();
            }
            if payment.external_transaction_id.is_none()
                && payment.transaction_id != notification.transaction_id
            {
                payment.external_transaction_id = Some(notification.transaction_id.clone());
            }

            match self.payments.update(&payment, expected_status).await {
                Ok(()) => {
                    info!(
                        event_id = %event_id,
                        payment_id = %payment.id,
                        transaction_id = %notification.transaction_id,
                        update = ?update,
                        "payment reconciled"
                    );
                    return Ok((payment, update));
                }
                Err(e) if e.code == ErrorCode::ConcurrentModification && attempt < MAX_ATTEMPTS => {
                    warn!(
                        event_id = %event_id,
                        payment_id = %payment.id,
                        attempt,
                        "payment moved concurrently, re-reading"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The stored payment for this transaction, or a new row built from the
    /// order named in `customData`.
    async fn find_or_backfill(
        &self,
        notification: &ProviderNotification,
    ) -> Result<Payment, WebhookError> {
        if let Some(existing) = self
            .payments
            .find_by_transaction_id(&notification.transaction_id)
            .await?
        {
            return Ok(existing);
        }

        let order_id = notification.order_id_hint.ok_or_else(|| {
            WebhookError::Unresolvable(format!(
                "transaction {} matches no payment and carries no order id",
                notification.transaction_id
            ))
        })?;
        let order = self.orders.find_by_id(&order_id).await?.ok_or_else(|| {
            WebhookError::Unresolvable(format!(
                "transaction {} names unknown order {}",
                notification.transaction_id, order_id
            ))
        })?;

        let previous = self.payments.find_latest_for_order(&order.id).await?;
        let payment = Payment::backfill(
            NewPayment {
                order_id: order.id,
                merchant_id: order.merchant_id,
                amount: order.total,
                currency: order.currency.clone(),
                provider: self.provider.clone(),
                payment_method: notification.payment_method.clone(),
                payer_phone: notification.phone.clone(),
                ttl_minutes: self.ttl_minutes,
                supersedes: previous.map(|p| p.id),
            },
            notification.transaction_id.clone(),
        );

        match self.payments.insert(&payment).await? {
            SaveResult::Inserted => {
                info!(
                    payment_id = %payment.id,
                    order_id = %order.id,
                    transaction_id = %notification.transaction_id,
                    "payment backfilled from notification"
                );
                Ok(payment)
            }
            SaveResult::AlreadyExists => self
                .payments
                .find_by_transaction_id(&notification.transaction_id)
                .await?
                .ok_or_else(|| {
                    WebhookError::Database(format!(
                        "payment for {} vanished after conflict",
                        notification.transaction_id
                    ))
                }),
        }
    }

    /// Maps the provider's codes, downgrading a completed report whose amount
    /// or currency differs from what was asked.
    fn effective_report(
        &self,
        notification: &ProviderNotification,
        payment: &Payment,
    ) -> (PaymentStatus, Option<String>) {
        let mapped = map_provider_status(&notification.result_code, &notification.trans_status);
        let mismatch = notification.amount != payment.amount || notification.currency != payment.currency;

        match mapped {
            PaymentStatus::Completed if mismatch => {
                warn!(
                    payment_id = %payment.id,
                    expected = %payment.amount,
                    reported = %notification.amount,
                    "amount mismatch on completed payment"
                );
                (
                    PaymentStatus::Failed,
                    Some(format!(
                        "amount mismatch: expected {} {}, reported {} {}",
                        payment.amount, payment.currency, notification.amount, notification.currency
                    )),
                )
            }
            PaymentStatus::Failed => (
                PaymentStatus::Failed,
                Some(format!(
                    "provider result {} / {}",
                    notification.result_code, notification.trans_status
                )),
            ),
            other => (other, None),
        }
    }

    /// Re-applies the order step for the payment's current status.
    ///
    /// Returns whether the order changed. A transition the order no longer
    /// accepts is logged and treated as done.
    async fn drive_order(&self, payment: &Payment) -> Result<bool, WebhookError> {
        let (target, kind) = match payment.status {
            PaymentStatus::Completed => (OrderPaymentStatus::Paid, NotificationKind::PaymentReceived),
            PaymentStatus::Failed => (OrderPaymentStatus::Failed, NotificationKind::PaymentFailed),
            PaymentStatus::Pending | PaymentStatus::Processing => return Ok(false),
        };

        let report = match self
            .lifecycle
            .transition(
                &payment.order_id,
                OrderChange::PaymentStatus(target),
                TransitionOrigin::Webhook,
            )
            .await
        {
            Ok(report) => report,
            Err(e) if e.code == ErrorCode::InvalidStateTransition => {
                warn!(
                    order_id = %payment.order_id,
                    payment_id = %payment.id,
                    error = %e,
                    "order ignores payment outcome"
                );
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        match report.outcome {
            TransitionOutcome::Applied { .. } => {
                self.notify(&report.order, payment, kind).await;
                Ok(true)
            }
            TransitionOutcome::Unchanged => Ok(false),
        }
    }

    async fn notify(&self, order: &Order, payment: &Payment, kind: NotificationKind) {
        let with_details = |n: Notification| {
            n.with("order_number", order.order_number.as_str())
                .with("amount", payment.amount)
                .with("currency", &payment.currency)
        };

        if kind == NotificationKind::PaymentReceived {
            if let Ok(Some(merchant)) = self.merchants.find_by_id(&order.merchant_id).await {
                if let Some(contact) = merchant.contact {
                    self.notifier
                        .notify(with_details(Notification::new(
                            Recipient::Merchant(contact.to_string()),
                            NotificationKind::PaymentReceived,
                        )))
                        .await;
                }
            }
        }

        let customer_kind = match kind {
            NotificationKind::PaymentReceived => NotificationKind::PaymentConfirmation,
            other => other,
        };
        match self.customers.find_by_id(&order.customer_id).await {
            Ok(Some(customer)) => {
                self.notifier
                    .notify(with_details(Notification::new(
                        Recipient::Customer(customer.handle.to_string()),
                        customer_kind,
                    )))
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!(order_id = %order.id, error = %e, "customer lookup failed"),
        }
    }
}
