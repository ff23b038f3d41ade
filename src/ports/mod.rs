//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports and are
//! injected as `Arc<dyn Port>`.
//!
//! Each call is atomic on its own; sequences of calls are not transactional,
//! so the application layer re-applies steps idempotently.
//!
//! ## Store Ports
//!
//! - `EventLogRepository` - append-only inbound webhook log
//! - `MerchantDirectory` - read-only merchant lookup
//! - `CustomerRepository` - find-or-create customers, atomic counters
//! - `OrderRepository` - orders with optimistic versioning
//! - `PaymentRepository` - payment attempts
//! - `SubscriptionRepository` - subscription rows and the usage counter
//!
//! ## Collaborator Ports
//!
//! - `PriceResolver` - catalog price lookup
//! - `Notifier` - notification decisions

mod customer_repository;
mod event_log_repository;
mod merchant_directory;
mod notifier;
mod order_repository;
mod payment_repository;
mod price_resolver;
mod subscription_repository;

pub use customer_repository::{CustomerRepository, SaveResult};
pub use event_log_repository::EventLogRepository;
pub use merchant_directory::MerchantDirectory;
pub use notifier::{Notification, NotificationKind, Notifier, Recipient};
pub use order_repository::{OrderInsert, OrderRepository};
pub use payment_repository::PaymentRepository;
pub use price_resolver::PriceResolver;
pub use subscription_repository::SubscriptionRepository;
