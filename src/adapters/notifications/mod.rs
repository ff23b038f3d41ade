//! Notifier adapters.
//!
//! - `TracingNotifier` - logs each decision; delivery lives in another service
//! - `RecordingNotifier` - captures decisions for test assertions

mod recording;
mod tracing_notifier;

pub use recording::RecordingNotifier;
pub use tracing_notifier::TracingNotifier;
