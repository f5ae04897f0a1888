//! Descriptor build configuration

use std::fmt;
use std::sync::Arc;

use super::record::{JsonSerializer, PayloadSerializer};

/// Settings shared by every descriptor a registry builds
#[derive(Clone)]
pub struct MappingConfig {
    /// Serializer for nested payload fields
    pub serializer: Arc<dyn PayloadSerializer>,
    /// Classify fields named after system properties when a type declares
    /// no key markers and has no registered mapping
    pub conventions: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            serializer: Arc::new(JsonSerializer),
            conventions: true,
        }
    }
}

impl MappingConfig {
    /// Config that only honors explicit markers and registrations
    pub fn strict() -> Self {
        Self {
            conventions: false,
            ..Self::default()
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn PayloadSerializer>) -> Self {
        self.serializer = serializer;
        self
    }
}

impl fmt::Debug for MappingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingConfig")
            .field("conventions", &self.conventions)
            .finish_non_exhaustive()
    }
}
