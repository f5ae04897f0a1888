//! Query translation
//!
//! Compiles an operator chain such as
//! `Source("Countries").Where(e => !e.IsExists).Take(10)` into a filter
//! string, a select list and a row cap the table store understands, plus
//! client-side transforms for what the filter grammar cannot express.
//!
//! # Supported operators
//!
//! - `Where` merges its predicate into the filter
//! - `Select` narrows the column list and rebuilds the projected shape
//! - `Take` caps the row count
//! - `First`, `FirstOrDefault`, `Single`, `SingleOrDefault`, with or
//!   without a predicate
//!
//! Anything else fails with a named error.

mod compiler;
mod errors;
mod literal;
mod operators;
mod predicate;
mod result;

pub use compiler::QueryCompiler;
pub use errors::{QueryError, QueryResult};
pub use literal::{parse_literal, serialize_literal};
pub use operators::{
    default_translators, ElementTranslator, FilterTranslator, LimitTranslator, OperatorTranslator,
    ProjectionTranslator,
};
pub use predicate::PredicateTranslator;
pub use result::{PostProcess, TranslationResult};
