//! Observability for PetPort
//!
//! - Structured logging (JSON lines)
//! - Counters
//! - Typed events
//!
//! Observability never fails the operation it observes: log write errors are
//! swallowed and metrics are plain atomics.
//!
//! ```ignore
//! use petport::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::SubscriberSuspended, &[("user_id", "...")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_grace_suspensions();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a typed event; alert events go out at ERROR, everything else at INFO
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_alert() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::BootStart);
        log_event_with_fields(Event::ConfigLoaded, &[("config", "/tmp/petport.json")]);
    }
}
