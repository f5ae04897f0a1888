//! Query compiler
//!
//! Walks a left-nested chain of operator calls from the outermost call down
//! to the root source, dispatching each call to the translator registered
//! for its operator name.

use super::errors::{QueryError, QueryResult};
use super::operators::{default_translators, OperatorTranslator};
use super::result::TranslationResult;
use crate::expr::{Expr, Method};
use crate::mapping::NameChanges;
use crate::observability::{log_event_with_fields, Event};

/// Compiles query expressions into `TranslationResult`s
pub struct QueryCompiler {
    translators: Vec<Box<dyn OperatorTranslator>>,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self {
            translators: default_translators(),
        }
    }
}

impl QueryCompiler {
    /// Compiler with the built-in translators
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler with no translators; every operator is rejected until registered
    pub fn empty() -> Self {
        Self {
            translators: Vec::new(),
        }
    }

    /// Registers a translator. Later registrations win for shared names.
    pub fn register(&mut self, translator: Box<dyn OperatorTranslator>) {
        self.translators.insert(0, translator);
    }

    /// True when some translator accepts `operator`
    pub fn supports(&self, operator: &str) -> bool {
        self.translator_for(operator).is_some()
    }

    fn translator_for(&self, operator: &str) -> Option<&dyn OperatorTranslator> {
        self.translators
            .iter()
            .find(|t| t.operators().contains(&operator))
            .map(|t| t.as_ref())
    }

    /// Compiles `query`, renaming columns through `name_changes`
    pub fn compile(&self, query: &Expr, name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        match self.compile_chain(query, name_changes) {
            Ok(result) => {
                let take = result.take_count().map(|t| t.to_string()).unwrap_or_default();
                let select = result
                    .select_columns()
                    .map(|c| c.join(","))
                    .unwrap_or_default();
                log_event_with_fields(
                    Event::QueryTranslated,
                    &[
                        ("filter", result.filter().unwrap_or("")),
                        ("select", select.as_str()),
                        ("take", take.as_str()),
                    ],
                );
                Ok(result)
            }
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::QueryRejected,
                    &[("code", err.code()), ("reason", reason.as_str())],
                );
                Err(err)
            }
        }
    }

    fn compile_chain(&self, query: &Expr, name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        let mut result = TranslationResult::new();
        let mut current = query;

        loop {
            let call = match current {
                Expr::Source(_) => return Ok(result),
                Expr::Call(call) => call,
                other => {
                    return Err(QueryError::unsupported(format!(
                        "{} node in a query chain",
                        other.kind_name()
                    )))
                }
            };

            let operator = match (&call.method, call.operator_name()) {
                (_, Some(name)) => name,
                (Method::Operator { .. }, None) => {
                    return Err(QueryError::UnsupportedOperator(call.method.name()))
                }
                (method, None) => {
                    return Err(QueryError::unsupported(format!(
                        "method {} in a query chain",
                        method.name()
                    )))
                }
            };

            let translator = self
                .translator_for(operator)
                .ok_or_else(|| QueryError::UnsupportedOperator(operator.to_string()))?;
            let contribution = translator.translate(call, name_changes)?;
            result.absorb_upstream(contribution)?;

            current = call.source().ok_or_else(|| {
                QueryError::invalid_argument(format!("{} has no source", operator))
            })?;
        }
    }
}
