//! Order domain module.
//!
//! - `aggregate` - Order, line items, totals and the coupled transition rules
//! - `status` - fulfilment and payment status machines
//! - `errors` - OrderError

mod aggregate;
mod errors;
mod status;

pub use aggregate::{
    Charges, LineItem, Order, OrderChange, OrderNumber, OrderSource, OrderState, PlaceOrder,
    TransitionOrigin, TransitionOutcome,
};
pub use errors::OrderError;
pub use status::{OrderPaymentStatus, OrderStatus};
