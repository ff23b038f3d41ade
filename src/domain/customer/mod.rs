//! Customer domain module.
//!
//! - `handle` - normalized phone handle
//! - `customer` - Customer entity and its lifetime counters
//! - `merchant` - Merchant reference data

mod customer;
mod handle;
mod merchant;

pub use customer::Customer;
pub use handle::ContactHandle;
pub use merchant::Merchant;
