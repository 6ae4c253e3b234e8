//! Observability for aeroview
//!
//! - Structured JSON logging
//! - Typed view events
//! - Maintenance counters
//!
//! Observability is read-only: it never influences how a view is maintained.

mod events;
mod logger;
mod metrics;

pub use events::ViewEvent;
pub use logger::{Logger, Severity};
pub use metrics::{ViewMetrics, ViewMetricsSnapshot};

/// Log a view event with fields. Fatal events go out at FATAL, others at INFO.
pub fn log_event(event: ViewEvent, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
