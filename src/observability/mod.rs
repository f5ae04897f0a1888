//! Observability
//!
//! Structured one-line JSON logs for query translation, descriptor
//! building, batching and configuration loading.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No async or background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aerotable::observability::{Logger, Event, Severity, log_event_with_fields};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::QueryTranslated, &[("filter", "not IsExists")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::ConfigLoaded);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::DescriptorBuilt, &[("type", "Country")]);
    }
}
