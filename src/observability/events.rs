//! Observable events
//!
//! Events are explicit and typed. Each carries a fixed severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Query translation
    /// Query chain compiled into a wire descriptor
    QueryTranslated,
    /// Query chain rejected
    QueryRejected,

    // Record mapping
    /// Record type descriptor built and cached
    DescriptorBuilt,
    /// Record type descriptor failed to build
    DescriptorRejected,

    // Batching
    /// Batch group emitted
    BatchFlushed,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryTranslated => "QUERY_TRANSLATED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::DescriptorBuilt => "DESCRIPTOR_BUILT",
            Event::DescriptorRejected => "DESCRIPTOR_REJECTED",
            Event::BatchFlushed => "BATCH_FLUSHED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryTranslated | Event::BatchFlushed => Severity::Trace,
            Event::QueryRejected => Severity::Warn,
            Event::DescriptorBuilt | Event::ConfigLoaded => Severity::Info,
            Event::DescriptorRejected => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueryTranslated.as_str(), "QUERY_TRANSLATED");
        assert_eq!(Event::DescriptorRejected.to_string(), "DESCRIPTOR_REJECTED");
        assert_eq!(Event::BatchFlushed.as_str(), "BATCH_FLUSHED");
    }

    #[test]
    fn test_hot_path_events_are_trace() {
        assert_eq!(Event::QueryTranslated.severity(), Severity::Trace);
        assert_eq!(Event::BatchFlushed.severity(), Severity::Trace);
        assert_eq!(Event::DescriptorRejected.severity(), Severity::Error);
    }
}
