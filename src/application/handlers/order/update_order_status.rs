//! UpdateOrderStatusHandler - merchant-driven status change.

use std::sync::Arc;

use tracing::warn;

use super::{OrderLifecycleManager, TransitionReport};
use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::order::{OrderChange, OrderStatus, TransitionOrigin, TransitionOutcome};
use crate::ports::{CustomerRepository, Notification, NotificationKind, Notifier, Recipient};

#[derive(Debug, Clone)]
pub struct UpdateOrderStatusCommand {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

pub struct UpdateOrderStatusHandler {
    lifecycle: Arc<OrderLifecycleManager>,
    customers: Arc<dyn CustomerRepository>,
    notifier: Arc<dyn Notifier>,
}

impl UpdateOrderStatusHandler {
    pub fn new(
        lifecycle: Arc<OrderLifecycleManager>,
        customers: Arc<dyn CustomerRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            lifecycle,
            customers,
            notifier,
        }
    }

    /// Rejected transitions surface as `InvalidStateTransition`.
    pub async fn handle(&self, cmd: UpdateOrderStatusCommand) -> Result<TransitionReport, DomainError> {
        let report = self
            .lifecycle
            .transition(
                &cmd.order_id,
                OrderChange::Status(cmd.status),
                TransitionOrigin::Api,
            )
            .await?;

        if let TransitionOutcome::Applied { before, after } = report.outcome {
            match self.customers.find_by_id(&report.order.customer_id).await {
                Ok(Some(customer)) => {
                    self.notifier
                        .notify(
                            Notification::new(
                                Recipient::Customer(customer.handle.to_string()),
                                NotificationKind::OrderStatusChanged,
                            )
                            .with("order_number", report.order.order_number.as_str())
                            .with("from", before.status)
                            .with("to", after.status),
                        )
                        .await;
                }
                Ok(None) => {}
                Err(e) => warn!(order_id = %cmd.order_id, error = %e, "customer lookup failed"),
            }
        }

        Ok(report)
    }
}
