//! Query-operator translators
//!
//! Each translator owns a set of operator names and turns one call of
//! those operators into a partial `TranslationResult`. The compiler merges
//! the partial results.

use std::sync::Arc;

use super::errors::{QueryError, QueryResult};
use super::predicate::PredicateTranslator;
use super::result::{strip_outer_parens, TranslationResult};
use crate::expr::{Call, Evaluator, Expr, Lambda, PartialEvaluator};
use crate::mapping::NameChanges;
use crate::value::Value;

/// Translates one family of query operators
pub trait OperatorTranslator: Send + Sync {
    /// Operator names this translator accepts
    fn operators(&self) -> &'static [&'static str];

    /// Translates one operator call; `call.args[0]` is the upstream source
    fn translate(&self, call: &Call, name_changes: &NameChanges) -> QueryResult<TranslationResult>;
}

fn operand<'c>(call: &'c Call, index: usize) -> QueryResult<&'c Expr> {
    call.args.get(index).ok_or_else(|| {
        QueryError::invalid_argument(format!(
            "{} is missing operand {}",
            call.method.name(),
            index
        ))
    })
}

fn lambda_operand<'c>(call: &'c Call, index: usize) -> QueryResult<&'c Lambda> {
    operand(call, index)?.as_lambda().ok_or_else(|| {
        QueryError::unsupported(format!(
            "{} operand {} is not a lambda",
            call.method.name(),
            index
        ))
    })
}

/// Adds the translated predicate to `result`, skipping empty fragments
fn merge_predicate(
    result: &mut TranslationResult,
    predicate: &Lambda,
    name_changes: &NameChanges,
) -> QueryResult<()> {
    let fragment = PredicateTranslator::translate(predicate, name_changes)?;
    let fragment = strip_outer_parens(&fragment);
    if !fragment.is_empty() {
        result.add_filter(fragment)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Where
// ---------------------------------------------------------------------

/// `Where(source, predicate)`
pub struct FilterTranslator;

impl OperatorTranslator for FilterTranslator {
    fn operators(&self) -> &'static [&'static str] {
        &["Where"]
    }

    fn translate(&self, call: &Call, name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        let mut result = TranslationResult::new();
        merge_predicate(&mut result, lambda_operand(call, 1)?, name_changes)?;
        Ok(result)
    }
}

// ---------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------

/// `Select(source, projection)`
///
/// The server only returns flat named columns, so the projection itself is
/// re-applied to each materialized row on the client.
pub struct ProjectionTranslator;

impl ProjectionTranslator {
    /// Collects parameter-bound members in first-seen order.
    ///
    /// Returns false when the whole row is referenced, in which case no
    /// column restriction applies.
    fn collect_members(expr: &Expr, parameter: &str, out: &mut Vec<String>) -> bool {
        if let Some(name) = expr.parameter_member(parameter) {
            if !out.iter().any(|m| m == name) {
                out.push(name.to_string());
            }
            return true;
        }

        match expr {
            Expr::Parameter(p) => p != parameter,
            Expr::Constant(_) | Expr::Source(_) => true,
            Expr::Member { target, .. } => Self::collect_members(target, parameter, out),
            Expr::Not(operand) => Self::collect_members(operand, parameter, out),
            Expr::Binary { left, right, .. } => {
                let l = Self::collect_members(left, parameter, out);
                let r = Self::collect_members(right, parameter, out);
                l && r
            }
            Expr::Call(call) => {
                let mut restricted = match call.receiver.as_deref() {
                    Some(receiver) => Self::collect_members(receiver, parameter, out),
                    None => true,
                };
                for arg in &call.args {
                    restricted &= Self::collect_members(arg, parameter, out);
                }
                restricted
            }
            Expr::NewArray { items, .. } => items
                .iter()
                .fold(true, |acc, item| Self::collect_members(item, parameter, out) && acc),
            Expr::New(members) => members
                .iter()
                .fold(true, |acc, (_, e)| Self::collect_members(e, parameter, out) && acc),
            Expr::Lambda(lambda) => Self::collect_members(&lambda.body, parameter, out),
        }
    }
}

impl OperatorTranslator for ProjectionTranslator {
    fn operators(&self) -> &'static [&'static str] {
        &["Select"]
    }

    fn translate(&self, call: &Call, name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        let projection = lambda_operand(call, 1)?;
        let reduced = Lambda {
            parameter: projection.parameter.clone(),
            body: Box::new(PartialEvaluator::reduce(&projection.body)?),
        };

        let mut result = TranslationResult::new();
        let mut members = Vec::new();
        let restricted = Self::collect_members(&reduced.body, &reduced.parameter, &mut members);
        if restricted && !members.is_empty() {
            result.add_columns(members.iter().map(|m| name_changes.wire_name(m).to_string()))?;
        }

        result.push_post_process(Arc::new(move |rows: Vec<Value>| {
            rows.into_iter()
                .map(|row| Evaluator::apply(&reduced, row))
                .collect::<QueryResult<Vec<_>>>()
        }));
        Ok(result)
    }
}

// ---------------------------------------------------------------------
// Take
// ---------------------------------------------------------------------

/// `Take(source, count)`
pub struct LimitTranslator;

impl OperatorTranslator for LimitTranslator {
    fn operators(&self) -> &'static [&'static str] {
        &["Take"]
    }

    fn translate(&self, call: &Call, _name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        let count_expr = operand(call, 1)?;
        if !count_expr.is_closed() {
            return Err(QueryError::unsupported("Take count must not depend on the row"));
        }
        let count = PartialEvaluator::fold(count_expr)?;
        let count = count.as_i64().ok_or_else(|| {
            QueryError::invalid_argument(format!("Take count must be an integer, got {}", count.kind()))
        })?;

        let mut result = TranslationResult::new();
        result.set_take(count)?;
        Ok(result)
    }
}

// ---------------------------------------------------------------------
// First / Single
// ---------------------------------------------------------------------

/// `First`, `FirstOrDefault`, `Single`, `SingleOrDefault`, each with an
/// optional predicate.
///
/// First-style operators cap the query at one row. Single-style operators
/// must see a second match to report it, so they leave the cap alone.
pub struct ElementTranslator;

#[derive(Debug, Clone, Copy)]
struct ElementContract {
    first: bool,
    or_default: bool,
}

impl ElementContract {
    fn from_name(name: &str) -> Self {
        Self {
            first: name.starts_with("First"),
            or_default: name.ends_with("OrDefault"),
        }
    }

    fn apply(self, mut rows: Vec<Value>) -> QueryResult<Vec<Value>> {
        if rows.is_empty() {
            return if self.or_default {
                Ok(vec![Value::Null])
            } else {
                Err(QueryError::NoElements)
            };
        }
        if !self.first && rows.len() > 1 {
            return Err(QueryError::MoreThanOneElement);
        }
        rows.truncate(1);
        Ok(rows)
    }
}

impl OperatorTranslator for ElementTranslator {
    fn operators(&self) -> &'static [&'static str] {
        &["First", "FirstOrDefault", "Single", "SingleOrDefault"]
    }

    fn translate(&self, call: &Call, name_changes: &NameChanges) -> QueryResult<TranslationResult> {
        let name = call
            .operator_name()
            .ok_or_else(|| QueryError::unsupported(call.method.name()))?;
        let contract = ElementContract::from_name(name);

        let mut result = TranslationResult::new();
        if call.args.len() > 1 {
            merge_predicate(&mut result, lambda_operand(call, 1)?, name_changes)?;
        }
        if contract.first {
            result.set_take(1)?;
        }
        result.push_post_process(Arc::new(move |rows: Vec<Value>| contract.apply(rows)));
        Ok(result)
    }
}

/// The default translator set
pub fn default_translators() -> Vec<Box<dyn OperatorTranslator>> {
    vec![
        Box::new(FilterTranslator),
        Box::new(ProjectionTranslator),
        Box::new(LimitTranslator),
        Box::new(ElementTranslator),
    ]
}
