//! Local expression evaluation
//!
//! Used to fold closed subtrees during translation and to re-apply
//! projections to materialized rows after retrieval.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::ast::{BinaryOp, Call, ElementType, Expr, Lambda, Method};
use crate::query::{QueryError, QueryResult};
use crate::value::Value;

/// Evaluates expressions against a set of parameter bindings.
///
/// Member reads are strict: a row without the member fails rather than
/// reading as null.
#[derive(Debug, Default)]
pub struct Evaluator {
    bindings: HashMap<String, Value>,
}

impl Evaluator {
    /// Evaluator with no bindings; only closed expressions evaluate
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `parameter` to `value`
    pub fn bind(mut self, parameter: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(parameter.into(), value);
        self
    }

    /// Applies a lambda to one argument
    pub fn apply(lambda: &Lambda, argument: Value) -> QueryResult<Value> {
        Evaluator::new()
            .bind(lambda.parameter.clone(), argument)
            .evaluate(&lambda.body)
    }

    pub fn evaluate(&self, expr: &Expr) -> QueryResult<Value> {
        match expr {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Parameter(name) => self
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| QueryError::unsupported(format!("unbound parameter '{}'", name))),
            Expr::Source(name) => Err(QueryError::unsupported(format!(
                "query source '{}' in a local expression",
                name
            ))),
            Expr::Member { target, name } => read_member(self.evaluate(target)?, name),
            Expr::Not(operand) => match self.evaluate(operand)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(QueryError::unsupported(format!("negation of {}", other.kind()))),
            },
            Expr::Binary { op, left, right } => self.evaluate_binary(*op, left, right),
            Expr::Call(call) => self.evaluate_call(call),
            Expr::NewArray { element, items } => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<QueryResult<Vec<_>>>()?;
                construct_array(element, values)
            }
            Expr::New(members) => {
                let mut record = BTreeMap::new();
                for (name, member) in members {
                    record.insert(name.clone(), self.evaluate(member)?);
                }
                Ok(Value::Record(record))
            }
            Expr::Lambda(_) => Err(QueryError::unsupported("lambda in a value position")),
        }
    }

    fn evaluate_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> QueryResult<Value> {
        if op.is_connective() {
            let lhs = expect_bool(self.evaluate(left)?)?;
            // Short-circuit like the host language does
            let result = match op {
                BinaryOp::And => lhs && expect_bool(self.evaluate(right)?)?,
                _ => lhs || expect_bool(self.evaluate(right)?)?,
            };
            return Ok(Value::Bool(result));
        }

        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;
        let result = match op {
            BinaryOp::Eq => lhs.loosely_equals(&rhs),
            BinaryOp::Ne => !lhs.loosely_equals(&rhs),
            _ => match lhs.compare(&rhs) {
                Some(ordering) => relational_holds(op, ordering),
                // Lifted comparisons involving null are false
                None if lhs.is_null() || rhs.is_null() => false,
                None => {
                    return Err(QueryError::unsupported(format!(
                        "comparison between {} and {}",
                        lhs.kind(),
                        rhs.kind()
                    )))
                }
            },
        };
        Ok(Value::Bool(result))
    }

    fn evaluate_call(&self, call: &Call) -> QueryResult<Value> {
        let receiver = call
            .receiver
            .as_deref()
            .map(|r| self.evaluate(r))
            .transpose()?;
        let args = call
            .args
            .iter()
            .map(|a| self.evaluate(a))
            .collect::<QueryResult<Vec<_>>>()?;
        invoke(&call.method, receiver, args)
    }
}

/// Whether `ordering` satisfies relational operator `op`
pub(crate) fn relational_holds(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::Ne => ordering.is_ne(),
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        BinaryOp::And | BinaryOp::Or => false,
    }
}

/// Reads `name` off a record. A member the record does not carry is an
/// error; a null target reads as null.
pub(crate) fn read_member(target: Value, name: &str) -> QueryResult<Value> {
    match target {
        Value::Record(mut members) => members
            .remove(name)
            .ok_or_else(|| QueryError::unsupported(format!("member '{}' is not on the row", name))),
        Value::Null => Ok(Value::Null),
        other => Err(QueryError::unsupported(format!(
            "member '{}' on a {} value",
            name,
            other.kind()
        ))),
    }
}

pub(crate) fn construct_array(element: &ElementType, values: Vec<Value>) -> QueryResult<Value> {
    match element {
        ElementType::Byte => values
            .into_iter()
            .map(|v| match v.as_i64() {
                Some(n) => u8::try_from(n)
                    .map_err(|_| QueryError::invalid_argument(format!("{} is not a byte", n))),
                None => Err(QueryError::unsupported(format!(
                    "{} element in a byte array",
                    v.kind()
                ))),
            })
            .collect::<QueryResult<Vec<u8>>>()
            .map(Value::Binary),
        ElementType::Other(name) => Err(QueryError::unsupported(format!("array of {}", name))),
    }
}

/// Invokes a non-operator method on already evaluated operands
pub(crate) fn invoke(method: &Method, receiver: Option<Value>, args: Vec<Value>) -> QueryResult<Value> {
    match (method, receiver) {
        (Method::CompareTo, Some(receiver)) => match args.as_slice() {
            [other] => compare_values(&receiver, other),
            _ => Err(QueryError::unsupported("CompareTo arity")),
        },
        (Method::Compare | Method::CompareOrdinal, None) => match args.as_slice() {
            [a, b] => compare_values(a, b),
            _ => Err(QueryError::unsupported(format!("{} arity", method.name()))),
        },
        (Method::Contains, Some(collection)) => {
            let [needle] = args.as_slice() else {
                return Err(QueryError::unsupported("Contains arity"));
            };
            match (&collection, needle) {
                (Value::List(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|item| item.loosely_equals(needle))))
                }
                (Value::String(haystack), Value::String(needle)) => {
                    Ok(Value::Bool(haystack.contains(needle.as_str())))
                }
                (other, _) => Err(QueryError::unsupported(format!(
                    "Contains on a {} value",
                    other.kind()
                ))),
            }
        }
        (Method::ToStringOrEmpty, Some(receiver)) => Ok(Value::String(receiver.to_string())),
        (Method::Native(native), receiver) => native
            .invoke(receiver.as_ref(), &args)
            .map_err(QueryError::Evaluation),
        (Method::Operator { .. }, _) => Err(QueryError::unsupported(format!(
            "query operator {} inside an expression",
            method.name()
        ))),
        (method, _) => Err(QueryError::unsupported(format!(
            "call shape of {}",
            method.name()
        ))),
    }
}

fn compare_values(a: &Value, b: &Value) -> QueryResult<Value> {
    // Null sorts before everything, matching ordinal string comparison
    let ordering = match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.compare(b).ok_or_else(|| {
            QueryError::unsupported(format!("comparison between {} and {}", a.kind(), b.kind()))
        })?,
    };
    Ok(Value::Int32(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

fn expect_bool(value: Value) -> QueryResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| QueryError::unsupported(format!("{} used as a condition", value.kind())))
}
