//! Batch configuration and errors

use serde::Deserialize;
use thiserror::Error;

use crate::mapping::MappingError;

/// Largest batch the store accepts
pub const MAX_BATCH_OPERATIONS: usize = 100;

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Batch partitioning errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// Cap outside `1..=100`
    #[error("Batch size {0} is outside 1..=100")]
    InvalidMaxOperations(usize),

    /// A record failed to convert to a wire entity
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl BatchError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::InvalidMaxOperations(_) => "TABLE_BATCH_INVALID_SIZE",
            BatchError::Mapping(e) => e.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Configuration for batch partitioning.
///
/// The cap is explicit and fixed for the life of a partitioner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of operations in one group
    pub max_operations: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_operations: MAX_BATCH_OPERATIONS,
        }
    }
}

impl BatchConfig {
    /// Config with an explicit cap
    pub fn with_max_operations(max_operations: usize) -> Self {
        Self { max_operations }
    }

    pub fn validate(&self) -> BatchResult<()> {
        if (1..=MAX_BATCH_OPERATIONS).contains(&self.max_operations) {
            Ok(())
        } else {
            Err(BatchError::InvalidMaxOperations(self.max_operations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cap() {
        let config = BatchConfig::default();
        assert_eq!(config.max_operations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cap_bounds() {
        assert!(BatchConfig::with_max_operations(0).validate().is_err());
        assert!(BatchConfig::with_max_operations(1).validate().is_ok());
        let err = BatchConfig::with_max_operations(101).validate().unwrap_err();
        assert_eq!(err.code(), "TABLE_BATCH_INVALID_SIZE");
        assert_eq!(err.to_string(), "Batch size 101 is outside 1..=100");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: BatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BatchConfig::default());
        let config: BatchConfig = serde_json::from_str(r#"{"max_operations": 20}"#).unwrap();
        assert_eq!(config.max_operations, 20);
    }
}
