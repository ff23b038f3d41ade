//! PostgreSQL adapters - sqlx implementations of the store ports.
//!
//! Every method is one statement, or a statement plus a read-back on the
//! miss path, so each port call stays atomic without explicit transactions.
//! Uniqueness is enforced by the constraints in `migrations/`; the adapters
//! recognise them by name.
//!
//! - `PostgresEventLog` - inbound webhook audit log
//! - `PostgresMerchantDirectory` - merchant lookup
//! - `PostgresCustomerRepository` - customers and their counters
//! - `PostgresOrderRepository` - orders with optimistic versioning
//! - `PostgresPaymentRepository` - payment attempts
//! - `PostgresSubscriptionRepository` - subscriptions and the usage counter

mod customer_repository;
mod event_log;
mod merchant_directory;
mod order_repository;
mod payment_repository;
mod subscription_repository;

pub use customer_repository::PostgresCustomerRepository;
pub use event_log::PostgresEventLog;
pub use merchant_directory::PostgresMerchantDirectory;
pub use order_repository::PostgresOrderRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;

use crate::domain::foundation::{Currency, DomainError, ErrorCode, Money};

/// Wraps a driver error. Pool timeouts and lost connections land here too,
/// which is what makes the caller report the store as unavailable.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

/// True when `err` violated the named unique constraint or index.
pub(crate) fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// A stored value that no longer parses into its domain type.
pub(crate) fn corrupt(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("invalid {} value in store: {}", column, value),
    )
}

pub(crate) fn money_from(column: &str, minor: i64) -> Result<Money, DomainError> {
    Money::new(minor).map_err(|_| corrupt(column, minor))
}

pub(crate) fn currency_from(column: &str, code: &str) -> Result<Currency, DomainError> {
    Currency::new(code).map_err(|_| corrupt(column, code))
}

pub(crate) fn count_from(column: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}

pub(crate) fn count_to(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn parse_with<T>(
    column: &str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, DomainError> {
    parse(value).ok_or_else(|| corrupt(column, value))
}
