//! Order handlers.
//!
//! ## Lifecycle
//! - `OrderLifecycleManager` - sole owner of the order state machine
//!
//! ## Commands
//! - Creating orders behind the subscription gate
//! - Merchant-driven status updates
//! - Initiating payment attempts
//!
//! ## Queries
//! - Order with payments, expiry-aware

mod create_order;
mod get_order;
mod initiate_payment;
mod lifecycle;
mod update_order_status;

pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use get_order::{GetOrderHandler, GetOrderQuery, OrderView, PaymentView};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, PaymentDefaults};
pub use lifecycle::{OrderLifecycleManager, TransitionReport};
pub use update_order_status::{UpdateOrderStatusCommand, UpdateOrderStatusHandler};
