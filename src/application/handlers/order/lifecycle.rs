//! OrderLifecycleManager - the only writer of order status fields.
//!
//! Every change is read-modify-write against the order's `version`. On a
//! version conflict the order is re-read and the change re-checked against
//! the fresh state, so two concurrent deliveries never apply blindly.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::order::{Order, OrderChange, TransitionOrigin, TransitionOutcome};
use crate::ports::OrderRepository;

/// Attempts before a version conflict is reported to the caller.
const MAX_ATTEMPTS: usize = 3;

/// Order as stored after the change, and what the change did.
#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub order: Order,
    pub outcome: TransitionOutcome,
}

pub struct OrderLifecycleManager {
    orders: Arc<dyn OrderRepository>,
}

impl OrderLifecycleManager {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Applies one change.
    ///
    /// Rejections come back as `InvalidStateTransition` with `from`/`to`
    /// details. A webhook repeating the current value is not a rejection.
    pub async fn transition(
        &self,
        order_id: &OrderId,
        change: OrderChange,
        origin: TransitionOrigin,
    ) -> Result<TransitionReport, DomainError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.load(order_id).await?;
            let expected_version = order.version;

            let outcome = order.apply(change, origin).map_err(|e| {
                debug!(order_id = %order_id, change = %change, error = %e, "transition rejected");
                DomainError::from(e).with_detail("order_id", order_id.to_string())
            })?;

            if !outcome.is_applied() {
                return Ok(TransitionReport { order, outcome });
            }

            match self.orders.update(&order, expected_version).await {
                Ok(()) => {
                    info!(
                        order_id = %order_id,
                        change = %change,
                        status = %order.status,
                        payment_status = %order.payment_status,
                        version = order.version,
                        "order transitioned"
                    );
                    return Ok(TransitionReport { order, outcome });
                }
                Err(e) if e.code == ErrorCode::ConcurrentModification && attempt < MAX_ATTEMPTS => {
                    warn!(order_id = %order_id, attempt, "version conflict, re-reading order");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, DomainError> {
        self.orders.find_by_id(order_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("order {} not found", order_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderRepository;
    use crate::domain::foundation::{Currency, CustomerId, MerchantId, Money, StateMachine};
    use crate::domain::order::{
        Charges, LineItem, OrderPaymentStatus, OrderSource, OrderStatus, PlaceOrder,
    };
    use crate::ports::OrderInsert;

    async fn stored_order(repo: &InMemoryOrderRepository) -> Order {
        stored_order_in(repo, OrderStatus::Pending, OrderPaymentStatus::Pending).await
    }

    async fn stored_order_in(
        repo: &InMemoryOrderRepository,
        status: OrderStatus,
        payment_status: OrderPaymentStatus,
    ) -> Order {
        let mut order = Order::place(
            PlaceOrder {
                merchant_id: MerchantId::new(),
                customer_id: CustomerId::new(),
                items: vec![LineItem::new("pagne", 3, Money::new(5_000).unwrap()).unwrap()],
                currency: Currency::new("XAF").unwrap(),
                source: OrderSource::Api,
                source_message_id: None,
                delivery_address: None,
                note: None,
                needs_clarification: false,
            },
            Charges::NONE,
        )
        .unwrap();
        order.status = status;
        order.payment_status = payment_status;
        assert_eq!(repo.insert(&order).await.unwrap(), OrderInsert::Inserted);
        order
    }

    // ══════════════════════════════════════════════════════════════
    // Applying changes
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn applied_change_is_persisted_with_new_version() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let order = stored_order(&repo).await;
        let manager = OrderLifecycleManager::new(repo.clone());

        let report = manager
            .transition(
                &order.id,
                OrderChange::Status(OrderStatus::Confirmed),
                TransitionOrigin::Api,
            )
            .await
            .unwrap();

        assert!(report.outcome.is_applied());
        let stored = repo.find_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(stored.version, order.version + 1);
    }

    #[tokio::test]
    async fn api_rejection_leaves_order_untouched() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let order = stored_order(&repo).await;
        let manager = OrderLifecycleManager::new(repo.clone());

        let err = manager
            .transition(
                &order.id,
                OrderChange::Status(OrderStatus::Delivered),
                TransitionOrigin::Api,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(err.details.get("from").map(String::as_str), Some("pending"));
        assert_eq!(err.details.get("to").map(String::as_str), Some("delivered"));
        assert_eq!(repo.find_by_id(&order.id).await.unwrap().unwrap(), order);
    }

    #[tokio::test]
    async fn webhook_replay_is_unchanged_without_write() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let order = stored_order(&repo).await;
        let manager = OrderLifecycleManager::new(repo.clone());
        let paid = OrderChange::PaymentStatus(OrderPaymentStatus::Paid);

        manager
            .transition(&order.id, paid, TransitionOrigin::Webhook)
            .await
            .unwrap();
        let replay = manager
            .transition(&order.id, paid, TransitionOrigin::Webhook)
            .await
            .unwrap();

        assert_eq!(replay.outcome, TransitionOutcome::Unchanged);
        assert_eq!(replay.order.version, order.version + 1);
        assert_eq!(replay.order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn every_status_pair_through_api_follows_allow_list() {
        for &from in OrderStatus::ALL {
            for &to in OrderStatus::ALL {
                let repo = Arc::new(InMemoryOrderRepository::new());
                let order = stored_order_in(&repo, from, OrderPaymentStatus::Pending).await;
                let manager = OrderLifecycleManager::new(repo.clone());

                let result = manager
                    .transition(&order.id, OrderChange::Status(to), TransitionOrigin::Api)
                    .await;
                let stored = repo.find_by_id(&order.id).await.unwrap().unwrap();

                if from.can_transition_to(&to) {
                    let report = result.unwrap();
                    assert!(report.outcome.is_applied(), "{} -> {}", from, to);
                    assert_eq!(stored.status, to);
                    assert_eq!(stored.version, order.version + 1);
                } else {
                    let err = result.unwrap_err();
                    assert_eq!(err.code, ErrorCode::InvalidStateTransition, "{} -> {}", from, to);
                    assert_eq!(stored, order, "{} -> {} wrote the order", from, to);
                }
            }
        }
    }

    #[tokio::test]
    async fn every_payment_status_pair_through_api_follows_allow_list() {
        for &status in OrderStatus::ALL {
            for &from in OrderPaymentStatus::ALL {
                for &to in OrderPaymentStatus::ALL {
                    let repo = Arc::new(InMemoryOrderRepository::new());
                    let order = stored_order_in(&repo, status, from).await;
                    let manager = OrderLifecycleManager::new(repo.clone());

                    let result = manager
                        .transition(&order.id, OrderChange::PaymentStatus(to), TransitionOrigin::Api)
                        .await;
                    let stored = repo.find_by_id(&order.id).await.unwrap().unwrap();

                    let allowed = from.can_transition_to(&to)
                        && (to != OrderPaymentStatus::Paid || status.accepts_payment());
                    if allowed {
                        assert!(result.unwrap().outcome.is_applied(), "{}/{} -> {}", status, from, to);
                        assert_eq!(stored.payment_status, to);
                        assert_eq!(stored.version, order.version + 1);
                    } else {
                        let err = result.unwrap_err();
                        assert_eq!(
                            err.code,
                            ErrorCode::InvalidStateTransition,
                            "{}/{} -> {}",
                            status,
                            from,
                            to
                        );
                        assert_eq!(stored, order, "{}/{} -> {} wrote the order", status, from, to);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn every_webhook_replay_is_unchanged_without_version_bump() {
        for &status in OrderStatus::ALL {
            for &payment_status in OrderPaymentStatus::ALL {
                let repo = Arc::new(InMemoryOrderRepository::new());
                let order = stored_order_in(&repo, status, payment_status).await;
                let manager = OrderLifecycleManager::new(repo.clone());

                for change in [
                    OrderChange::Status(status),
                    OrderChange::PaymentStatus(payment_status),
                ] {
                    let report = manager
                        .transition(&order.id, change, TransitionOrigin::Webhook)
                        .await
                        .unwrap();
                    assert_eq!(report.outcome, TransitionOutcome::Unchanged, "{}", change);
                }
                assert_eq!(repo.find_by_id(&order.id).await.unwrap().unwrap(), order);
            }
        }
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let manager = OrderLifecycleManager::new(Arc::new(InMemoryOrderRepository::new()));
        let err = manager
            .transition(
                &OrderId::new(),
                OrderChange::Status(OrderStatus::Cancelled),
                TransitionOrigin::Api,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    // ══════════════════════════════════════════════════════════════
    // Concurrency
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn concurrent_paid_deliveries_apply_once() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let order = stored_order(&repo).await;
        let manager = Arc::new(OrderLifecycleManager::new(repo.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let id = order.id;
                tokio::spawn(async move {
                    manager
                        .transition(
                            &id,
                            OrderChange::PaymentStatus(OrderPaymentStatus::Paid),
                            TransitionOrigin::Webhook,
                        )
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(report) if report.outcome.is_applied() => applied += 1,
                Ok(_) => {}
                Err(e) => assert_eq!(e.code, ErrorCode::ConcurrentModification),
            }
        }

        let stored = repo.find_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(applied, 1);
        assert_eq!(stored.version, order.version + 1);
        assert_eq!(stored.payment_status, OrderPaymentStatus::Paid);
    }
}
