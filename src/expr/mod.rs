//! Expression trees
//!
//! The query compiler consumes these trees; the evaluator runs them
//! locally for constant folding and post-processing.

mod ast;
mod eval;
mod partial;

pub use ast::{
    BinaryOp, Call, ElementType, Expr, Lambda, Method, NativeError, NativeMethod, QUERY_NAMESPACE,
};
pub use eval::Evaluator;
pub use partial::PartialEvaluator;
