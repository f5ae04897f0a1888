//! Query translation error types
//!
//! Error codes:
//! - TABLE_QUERY_UNSUPPORTED (unrecognized node, method or shape)
//! - TABLE_QUERY_UNSUPPORTED_OPERATOR (operator outside the registered set)
//! - TABLE_QUERY_UNSUPPORTED_LITERAL (literal type without a wire form)
//! - TABLE_QUERY_MALFORMED_LITERAL (literal text that does not parse)
//! - TABLE_QUERY_INVALID_ARGUMENT (rejected at a public entry point)
//! - TABLE_QUERY_EVALUATION (captured method failed during folding)
//! - TABLE_QUERY_NO_ELEMENTS / TABLE_QUERY_MORE_THAN_ONE (post-processing)
//!
//! None of these are retryable: a query that fails to translate fails the
//! same way every time.

use thiserror::Error;

use crate::expr::NativeError;
use crate::mapping::MappingError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query translation and post-processing errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Expression node, method or shape the translator does not understand
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Call in the query namespace with no registered translator
    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// Literal of a type that has no filter-grammar form
    #[error("Unsupported literal of type {0}")]
    UnsupportedLiteral(String),

    /// Literal text that does not parse
    #[error("Malformed literal: {0}")]
    MalformedLiteral(String),

    /// Invalid input at a public entry point
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Original failure of a captured method, surfaced as-is
    #[error("{0}")]
    Evaluation(#[source] NativeError),

    /// First/Single over an empty result
    #[error("Sequence contains no elements")]
    NoElements,

    /// Single over more than one row
    #[error("Sequence contains more than one element")]
    MoreThanOneElement,

    /// Row value conversion failed
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl QueryError {
    pub fn unsupported(construct: impl Into<String>) -> Self {
        QueryError::UnsupportedConstruct(construct.into())
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        QueryError::InvalidArgument(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnsupportedConstruct(_) => "TABLE_QUERY_UNSUPPORTED",
            QueryError::UnsupportedOperator(_) => "TABLE_QUERY_UNSUPPORTED_OPERATOR",
            QueryError::UnsupportedLiteral(_) => "TABLE_QUERY_UNSUPPORTED_LITERAL",
            QueryError::MalformedLiteral(_) => "TABLE_QUERY_MALFORMED_LITERAL",
            QueryError::InvalidArgument(_) => "TABLE_QUERY_INVALID_ARGUMENT",
            QueryError::Evaluation(_) => "TABLE_QUERY_EVALUATION",
            QueryError::NoElements => "TABLE_QUERY_NO_ELEMENTS",
            QueryError::MoreThanOneElement => "TABLE_QUERY_MORE_THAN_ONE",
            QueryError::Mapping(e) => e.code(),
        }
    }

    /// Translation never retries
    pub fn is_retryable(&self) -> bool {
        false
    }
}
