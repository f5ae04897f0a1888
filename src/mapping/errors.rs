//! Record mapping error types
//!
//! Configuration errors are raised once, when a record type's descriptor
//! is built, and are never cached. Runtime errors are raised per record
//! while converting to or from a wire entity.

use thiserror::Error;

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;

/// Record mapping errors
#[derive(Debug, Error)]
pub enum MappingError {
    /// Type has neither a partition-key nor a row-key field
    #[error("Record type {type_name} defines neither a partition key nor a row key")]
    MissingKey { type_name: String },

    /// Field carries more than one role marker
    #[error("Field {type_name}.{field} carries more than one role marker")]
    ConflictingMarkers { type_name: String, field: String },

    /// Two fields claim the same single-instance role
    #[error("Record type {type_name} maps both '{first}' and '{second}' to {role}")]
    DuplicateRole {
        type_name: String,
        role: &'static str,
        first: String,
        second: String,
    },

    /// Field type with no store slot
    #[error("Field {type_name}.{field} has unsupported type {ty}")]
    UnsupportedFieldType {
        type_name: String,
        field: String,
        ty: String,
    },

    /// Key field whose type cannot be rendered as key text
    #[error("Key field {type_name}.{field} has unsupported type {ty}")]
    UnsupportedKeyType {
        type_name: String,
        field: String,
        ty: String,
    },

    /// Serialized marker without a serde lens, or the other way around
    #[error("Field {type_name}.{field}: {reason}")]
    LensMismatch {
        type_name: String,
        field: String,
        reason: &'static str,
    },

    /// Wire slot tag does not fit the field
    #[error("Field {field}: expected {expected} slot, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Value kind does not convert to the requested Rust type
    #[error("Cannot convert {found} value to {expected}")]
    Conversion {
        expected: &'static str,
        found: &'static str,
    },

    /// Nested payload failed to encode or decode
    #[error("Field {field}: payload serialization failed: {source}")]
    Serialization {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid input at a public entry point
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MappingError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        MappingError::InvalidArgument(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            MappingError::MissingKey { .. } => "TABLE_MAPPING_MISSING_KEY",
            MappingError::ConflictingMarkers { .. } => "TABLE_MAPPING_CONFLICTING_MARKERS",
            MappingError::DuplicateRole { .. } => "TABLE_MAPPING_DUPLICATE_ROLE",
            MappingError::UnsupportedFieldType { .. } => "TABLE_MAPPING_UNSUPPORTED_FIELD_TYPE",
            MappingError::UnsupportedKeyType { .. } => "TABLE_MAPPING_UNSUPPORTED_KEY_TYPE",
            MappingError::LensMismatch { .. } => "TABLE_MAPPING_LENS_MISMATCH",
            MappingError::TypeMismatch { .. } => "TABLE_MAPPING_TYPE_MISMATCH",
            MappingError::Conversion { .. } => "TABLE_MAPPING_CONVERSION",
            MappingError::Serialization { .. } => "TABLE_MAPPING_SERIALIZATION",
            MappingError::InvalidArgument(_) => "TABLE_MAPPING_INVALID_ARGUMENT",
        }
    }

    /// True for errors raised while building a descriptor
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MappingError::MissingKey { .. }
                | MappingError::ConflictingMarkers { .. }
                | MappingError::DuplicateRole { .. }
                | MappingError::UnsupportedFieldType { .. }
                | MappingError::UnsupportedKeyType { .. }
                | MappingError::LensMismatch { .. }
        )
    }

    /// Mapping errors are deterministic; retrying gives the same result
    pub fn is_retryable(&self) -> bool {
        false
    }
}
