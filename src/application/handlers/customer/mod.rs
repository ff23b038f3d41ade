//! Customer handlers.
//!
//! - `EntityResolver` - channel id to merchant, contact handle to customer

mod resolve_customer;

pub use resolve_customer::EntityResolver;
