//! Partial evaluation
//!
//! Reduces every maximal closed subtree of a predicate to a constant so the
//! predicate translator only ever sees parameter-bound nodes, connectives
//! and literals.

use super::ast::{Call, Expr, Lambda, Method};
use super::eval::{construct_array, invoke, read_member};
use crate::query::{QueryError, QueryResult};
use crate::value::Value;

/// Folds closed subtrees into `Expr::Constant`
pub struct PartialEvaluator;

impl PartialEvaluator {
    /// Rewrites `expr`, folding every maximal foldable closed subtree.
    ///
    /// Parameter-bound nodes are kept as they are; closed nodes of kinds
    /// that cannot be folded (connectives over constants) are kept with
    /// their children reduced.
    pub fn reduce(expr: &Expr) -> QueryResult<Expr> {
        if expr.is_closed() && Self::is_foldable_kind(expr) {
            return Ok(Expr::Constant(Self::fold(expr)?));
        }

        Ok(match expr {
            Expr::Constant(_) | Expr::Parameter(_) | Expr::Source(_) => expr.clone(),
            Expr::Member { target, name } => Expr::Member {
                target: Box::new(Self::reduce(target)?),
                name: name.clone(),
            },
            Expr::Not(operand) => Expr::Not(Box::new(Self::reduce(operand)?)),
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(Self::reduce(left)?),
                right: Box::new(Self::reduce(right)?),
            },
            Expr::Call(call) => Expr::Call(Call {
                method: call.method.clone(),
                receiver: match call.receiver.as_deref() {
                    Some(r) => Some(Box::new(Self::reduce(r)?)),
                    None => None,
                },
                args: call
                    .args
                    .iter()
                    .map(Self::reduce)
                    .collect::<QueryResult<Vec<_>>>()?,
            }),
            Expr::NewArray { element, items } => Expr::NewArray {
                element: element.clone(),
                items: items.iter().map(Self::reduce).collect::<QueryResult<Vec<_>>>()?,
            },
            Expr::New(members) => Expr::New(
                members
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), Self::reduce(e)?)))
                    .collect::<QueryResult<Vec<_>>>()?,
            ),
            Expr::Lambda(lambda) => Expr::Lambda(Lambda {
                parameter: lambda.parameter.clone(),
                body: Box::new(Self::reduce(&lambda.body)?),
            }),
        })
    }

    /// Evaluates a closed expression to a literal.
    ///
    /// Only literals, member reads, method calls and array constructions
    /// fold; any other node kind is rejected by name.
    pub fn fold(expr: &Expr) -> QueryResult<Value> {
        match expr {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Member { target, name } => read_member(Self::fold(target)?, name),
            Expr::Call(call) => {
                if let Method::Operator { .. } = call.method {
                    return Err(QueryError::unsupported(format!(
                        "query operator {} cannot be folded",
                        call.method.name()
                    )));
                }
                let receiver = call.receiver.as_deref().map(Self::fold).transpose()?;
                let args = call.args.iter().map(Self::fold).collect::<QueryResult<Vec<_>>>()?;
                invoke(&call.method, receiver, args)
            }
            Expr::NewArray { element, items } => {
                let values = items.iter().map(Self::fold).collect::<QueryResult<Vec<_>>>()?;
                construct_array(element, values)
            }
            Expr::Parameter(name) => Err(QueryError::unsupported(format!(
                "parameter '{}' cannot be folded",
                name
            ))),
            other => Err(QueryError::unsupported(format!(
                "{} node cannot be folded",
                other.kind_name()
            ))),
        }
    }

    fn is_foldable_kind(expr: &Expr) -> bool {
        match expr {
            Expr::Constant(_) | Expr::Member { .. } | Expr::NewArray { .. } => true,
            Expr::Call(call) => !matches!(call.method, Method::Operator { .. }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ElementType, NativeMethod};

    #[test]
    fn test_captured_member_folds() {
        let captured = Value::record([("Threshold", Value::Int64(40))]);
        let expr = Expr::param("e")
            .member("Area")
            .gt(Expr::constant(captured).member("Threshold"));

        let reduced = PartialEvaluator::reduce(&expr).unwrap();
        let Expr::Binary { right, .. } = reduced else {
            panic!("expected binary");
        };
        assert!(matches!(*right, Expr::Constant(Value::Int64(40))));
    }

    #[test]
    fn test_parameter_nodes_untouched() {
        let expr = Expr::param("e").member("Name");
        let reduced = PartialEvaluator::reduce(&expr).unwrap();
        assert_eq!(reduced.parameter_member("e"), Some("Name"));
    }

    #[test]
    fn test_byte_array_folds_to_binary() {
        let expr = Expr::byte_array(vec![Expr::constant(1), Expr::constant(255)]);
        assert_eq!(PartialEvaluator::fold(&expr).unwrap(), Value::Binary(vec![1, 255]));
    }

    #[test]
    fn test_non_byte_array_rejected() {
        let expr = Expr::NewArray {
            element: ElementType::Other("String".into()),
            items: vec![Expr::constant("a")],
        };
        let err = PartialEvaluator::fold(&expr).unwrap_err();
        assert!(err.to_string().contains("array of String"));
    }

    #[test]
    fn test_native_call_folds() {
        let upper = NativeMethod::new("ToUpper", |receiver, _| match receiver {
            Some(Value::String(s)) => Ok(Value::String(s.to_uppercase())),
            _ => Err("not a string".into()),
        });
        let expr = Expr::native(upper, Some(Expr::constant("spain")), Vec::new());
        assert_eq!(PartialEvaluator::fold(&expr).unwrap(), Value::from("SPAIN"));
    }

    #[test]
    fn test_unfoldable_kind_is_named() {
        let err = PartialEvaluator::fold(&Expr::shape([("A", Expr::constant(1))])).unwrap_err();
        assert!(err.to_string().contains("New"));
    }
}
