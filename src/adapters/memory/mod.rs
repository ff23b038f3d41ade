//! In-memory store adapters for tests and local runs.
//!
//! Every store guards its map with one `tokio::sync::RwLock`, so each port
//! call is atomic exactly as the port requires. Not suitable for multi-server
//! deployments.
//!
//! Stores share an [`Outage`] switch so tests can simulate the database
//! going away mid-flight.

mod customers;
mod event_log;
mod merchants;
mod orders;
mod payments;
mod subscriptions;

pub use customers::InMemoryCustomerRepository;
pub use event_log::InMemoryEventLog;
pub use merchants::InMemoryMerchantDirectory;
pub use orders::InMemoryOrderRepository;
pub use payments::InMemoryPaymentRepository;
pub use subscriptions::InMemorySubscriptionRepository;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::foundation::DomainError;

/// Shared on/off switch simulating store unavailability.
#[derive(Debug, Clone, Default)]
pub struct Outage(Arc<AtomicBool>);

impl Outage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, down: bool) {
        self.0.store(down, Ordering::SeqCst);
    }

    pub fn is_down(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with a database error while the outage is on.
    pub(crate) fn check(&self) -> Result<(), DomainError> {
        if self.is_down() {
            return Err(DomainError::database("store unavailable"));
        }
        Ok(())
    }
}

/// All in-memory stores wired to one outage switch.
#[derive(Clone, Default)]
pub struct InMemoryStores {
    pub outage: Outage,
    pub event_log: Arc<InMemoryEventLog>,
    pub merchants: Arc<InMemoryMerchantDirectory>,
    pub customers: Arc<InMemoryCustomerRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        let outage = Outage::new();
        Self {
            event_log: Arc::new(InMemoryEventLog::with_outage(outage.clone())),
            merchants: Arc::new(InMemoryMerchantDirectory::with_outage(outage.clone())),
            customers: Arc::new(InMemoryCustomerRepository::with_outage(outage.clone())),
            orders: Arc::new(InMemoryOrderRepository::with_outage(outage.clone())),
            payments: Arc::new(InMemoryPaymentRepository::with_outage(outage.clone())),
            subscriptions: Arc::new(InMemorySubscriptionRepository::with_outage(outage.clone())),
            outage,
        }
    }
}
