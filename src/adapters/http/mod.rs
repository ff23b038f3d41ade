//! HTTP adapters - axum routes over the application handlers.
//!
//! Each area has its own `dto`, `handlers` and `routes`; all of them share
//! one [`AppState`].

pub mod error;
pub mod orders;
pub mod router;
pub mod state;
pub mod subscriptions;
pub mod webhooks;

pub use error::{ApiError, ErrorResponse};
pub use router::app_router;
pub use state::{AppSettings, AppState};
