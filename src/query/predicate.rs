//! Predicate translation
//!
//! Compiles the body of a one-parameter boolean lambda into a filter
//! fragment. Closed subtrees are folded first, so the walk only meets
//! parameter-bound members, connectives, comparisons and literals.
//!
//! Output always has balanced parentheses and can be joined with `and`.
//! An empty fragment means "no constraint".

use super::errors::{QueryError, QueryResult};
use super::literal::serialize_literal;
use super::result::is_grouped;
use crate::expr::{BinaryOp, Call, Expr, Lambda, Method, PartialEvaluator};
use crate::mapping::NameChanges;
use crate::value::Value;

/// Translates predicate lambdas into filter fragments
pub struct PredicateTranslator<'a> {
    parameter: &'a str,
    name_changes: &'a NameChanges,
}

impl<'a> PredicateTranslator<'a> {
    /// Translates `lambda`'s body using `name_changes` for column names
    pub fn translate(lambda: &Lambda, name_changes: &NameChanges) -> QueryResult<String> {
        let body = PartialEvaluator::reduce(&lambda.body)?;
        let translator = PredicateTranslator {
            parameter: &lambda.parameter,
            name_changes,
        };
        translator.visit(&body)
    }

    fn visit(&self, expr: &Expr) -> QueryResult<String> {
        if let Some(field) = expr.parameter_member(self.parameter) {
            return Ok(self.name_changes.wire_name(field).to_string());
        }

        match expr {
            Expr::Constant(value) => serialize_literal(value),
            Expr::Binary { op, left, right } => self.visit_binary(*op, left, right),
            Expr::Not(operand) => self.visit_not(operand),
            Expr::Call(call) if matches!(call.method, Method::Contains) => {
                self.visit_contains(call, false)
            }
            closed if closed.is_closed() => serialize_literal(&PartialEvaluator::fold(closed)?),
            other => Err(QueryError::unsupported(describe(other))),
        }
    }

    fn visit_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> QueryResult<String> {
        if op.is_comparison() {
            if let Some(collapsed) = self.collapse_compare(op, left, right)? {
                return Ok(collapsed);
            }
            // Keep the column on the left: `'F' lt Name` becomes `Name gt 'F'`
            if left.parameter_member(self.parameter).is_none()
                && right.parameter_member(self.parameter).is_some()
            {
                return self.visit_binary(op.mirrored(), right, left);
            }
        }

        let lhs = self.visit(left)?;
        let rhs = self.visit(right)?;

        if op.is_connective() {
            match (lhs.is_empty(), rhs.is_empty(), op) {
                (true, true, _) => return Ok(String::new()),
                (_, _, BinaryOp::Or) if lhs.is_empty() || rhs.is_empty() => {
                    return Ok(String::new())
                }
                (true, false, _) => return Ok(rhs),
                (false, true, _) => return Ok(lhs),
                _ => {}
            }
        } else if lhs.is_empty() || rhs.is_empty() {
            return Err(QueryError::unsupported(format!(
                "'{}' comparison with an empty membership test",
                op.keyword()
            )));
        }

        // A connective is always grouped so a parent of the other kind
        // cannot split it.
        let rendered = format!("{} {} {}", lhs, op.keyword(), rhs);
        if op.is_connective() || is_relational(left) || is_relational(right) {
            Ok(format!("({})", rendered))
        } else {
            Ok(rendered)
        }
    }

    /// `a.CompareTo(b) op 0` becomes `a op b`; `0 op a.CompareTo(b)` mirrors.
    /// When the column is `b`, the operands swap and the operator mirrors again.
    fn collapse_compare(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> QueryResult<Option<String>> {
        let (call, other, op) = match (left, right) {
            (Expr::Call(call), other) if call.method.is_compare() => (call, other, op),
            (other, Expr::Call(call)) if call.method.is_compare() => (call, other, op.mirrored()),
            _ => return Ok(None),
        };

        if !is_zero(other) {
            return Err(QueryError::unsupported(format!(
                "{} result compared with a value other than zero",
                call.method.name()
            )));
        }

        let (a, b) = call
            .compare_operands()
            .ok_or_else(|| QueryError::unsupported(format!("{} call shape", call.method.name())))?;
        self.visit_binary(op, a, b).map(Some)
    }

    fn visit_not(&self, operand: &Expr) -> QueryResult<String> {
        if let Expr::Call(call) = operand {
            if matches!(call.method, Method::Contains) {
                return self.visit_contains(call, true);
            }
        }

        let inner = self.visit(operand)?;
        if inner.is_empty() {
            return Ok(inner);
        }

        let atomic = operand.parameter_member(self.parameter).is_some()
            || matches!(operand, Expr::Constant(_));
        if atomic || is_grouped(&inner) {
            Ok(format!("not {}", inner))
        } else {
            Ok(format!("not ({})", inner))
        }
    }

    /// `values.Contains(e.Field)` expands to one equality per element.
    ///
    /// Under negation the expansion is a conjunction of inequalities. An
    /// empty collection yields an empty fragment.
    fn visit_contains(&self, call: &Call, negated: bool) -> QueryResult<String> {
        let receiver = call
            .receiver
            .as_deref()
            .ok_or_else(|| QueryError::unsupported("Contains without a receiver"))?;
        let [needle] = call.args.as_slice() else {
            return Err(QueryError::unsupported("Contains arity"));
        };

        if !receiver.is_closed() {
            return Err(QueryError::unsupported(
                "Contains on a row member; only captured collections can be searched",
            ));
        }
        let field = needle.parameter_member(self.parameter).ok_or_else(|| {
            QueryError::unsupported("Contains argument must be a member of the queried row")
        })?;
        let column = self.name_changes.wire_name(field);

        let items = match PartialEvaluator::fold(receiver)? {
            Value::List(items) => items,
            other => {
                return Err(QueryError::unsupported(format!(
                    "Contains on a {} value",
                    other.kind()
                )))
            }
        };
        if items.is_empty() {
            return Ok(String::new());
        }

        let (op, joiner) = if negated {
            (BinaryOp::Ne, " and ")
        } else {
            (BinaryOp::Eq, " or ")
        };
        let tests = items
            .iter()
            .map(|item| Ok(format!("{} {} {}", column, op.keyword(), serialize_literal(item)?)))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!("({})", tests.join(joiner)))
    }
}

fn is_relational(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary { .. })
}

fn is_zero(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(value) => value.as_i64() == Some(0),
        _ => false,
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Call(call) => format!("method {}", call.method.name()),
        Expr::Member { name, target } => {
            format!("member access '{}' on {}", name, target.kind_name())
        }
        Expr::Parameter(name) => format!("bare parameter '{}'", name),
        other => format!("{} node", other.kind_name()),
    }
}
