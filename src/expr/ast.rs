//! Expression tree
//!
//! A closed tagged union over the node kinds the translator understands.
//! Query chains are left-nested `Operator` calls whose first argument is
//! the upstream source; predicates and projections are lambdas over one
//! parameter that stands for the row.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Namespace that query operators are recognized under
pub const QUERY_NAMESPACE: &str = "Queryable";

/// Error type returned by native (captured) methods
pub type NativeError = Box<dyn std::error::Error + Send + Sync>;

type NativeFn = dyn Fn(Option<&Value>, &[Value]) -> Result<Value, NativeError> + Send + Sync;

/// Binary operators, relational and boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Filter grammar keyword for this operator
    pub fn keyword(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn is_connective(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(&self) -> bool {
        !self.is_connective()
    }

    /// The operator that keeps meaning when both operands swap sides
    pub fn mirrored(&self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Ge => BinaryOp::Le,
            other => *other,
        }
    }
}

/// Element type of an array construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Byte,
    Other(String),
}

/// A host method captured into the tree, invoked during folding
#[derive(Clone)]
pub struct NativeMethod {
    name: String,
    func: Arc<NativeFn>,
}

impl NativeMethod {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> Result<Value, NativeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, receiver: Option<&Value>, args: &[Value]) -> Result<Value, NativeError> {
        (self.func)(receiver, args)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod").field("name", &self.name).finish()
    }
}

/// Methods a call node can target
#[derive(Debug, Clone)]
pub enum Method {
    /// `receiver.CompareTo(other)`, ordinal for strings
    CompareTo,
    /// `Compare(a, b)`
    Compare,
    /// `CompareOrdinal(a, b)`
    CompareOrdinal,
    /// `collection.Contains(needle)`
    Contains,
    /// Null-guarded stringification: null becomes `""`
    ToStringOrEmpty,
    /// Query operator such as `Where` or `Take`
    Operator { namespace: String, name: String },
    /// Captured host method
    Native(NativeMethod),
}

impl Method {
    /// Display name used in error messages
    pub fn name(&self) -> String {
        match self {
            Method::CompareTo => "CompareTo".into(),
            Method::Compare => "Compare".into(),
            Method::CompareOrdinal => "CompareOrdinal".into(),
            Method::Contains => "Contains".into(),
            Method::ToStringOrEmpty => "ToStringOrEmpty".into(),
            Method::Operator { namespace, name } => format!("{}.{}", namespace, name),
            Method::Native(native) => native.name().to_string(),
        }
    }

    pub fn is_compare(&self) -> bool {
        matches!(self, Method::CompareTo | Method::Compare | Method::CompareOrdinal)
    }
}

/// A method call
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub receiver: Option<Box<Expr>>,
    pub args: Vec<Expr>,
}

impl Call {
    /// Operator name if this is a call in the query namespace
    pub fn operator_name(&self) -> Option<&str> {
        match &self.method {
            Method::Operator { namespace, name } if namespace == QUERY_NAMESPACE => Some(name),
            _ => None,
        }
    }

    /// Upstream source of a query operator call
    pub fn source(&self) -> Option<&Expr> {
        self.args.first()
    }

    /// Operands of a comparison-style call as `(left, right)`
    pub fn compare_operands(&self) -> Option<(&Expr, &Expr)> {
        match (&self.method, self.receiver.as_deref(), self.args.as_slice()) {
            (Method::CompareTo, Some(receiver), [other]) => Some((receiver, other)),
            (Method::Compare | Method::CompareOrdinal, None, [a, b]) => Some((a, b)),
            _ => None,
        }
    }
}

/// A one-parameter lambda
#[derive(Debug, Clone)]
pub struct Lambda {
    pub parameter: String,
    pub body: Box<Expr>,
}

/// Expression node
#[derive(Debug, Clone)]
pub enum Expr {
    Constant(Value),
    Parameter(String),
    /// Root reference of a query chain (the table)
    Source(String),
    Member { target: Box<Expr>, name: String },
    Not(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Call(Call),
    NewArray { element: ElementType, items: Vec<Expr> },
    /// Shape construction, e.g. a projection's anonymous record
    New(Vec<(String, Expr)>),
    Lambda(Lambda),
}

impl Expr {
    /// Node kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "Constant",
            Expr::Parameter(_) => "Parameter",
            Expr::Source(_) => "Source",
            Expr::Member { .. } => "MemberAccess",
            Expr::Not(_) => "Not",
            Expr::Binary { .. } => "Binary",
            Expr::Call(_) => "Call",
            Expr::NewArray { .. } => "NewArray",
            Expr::New(_) => "New",
            Expr::Lambda(_) => "Lambda",
        }
    }

    /// True when no node below references a parameter or a query source
    pub fn is_closed(&self) -> bool {
        match self {
            Expr::Constant(_) => true,
            Expr::Parameter(_) | Expr::Source(_) => false,
            Expr::Member { target, .. } => target.is_closed(),
            Expr::Not(operand) => operand.is_closed(),
            Expr::Binary { left, right, .. } => left.is_closed() && right.is_closed(),
            Expr::Call(call) => {
                call.receiver.as_deref().map_or(true, Expr::is_closed)
                    && call.args.iter().all(Expr::is_closed)
            }
            Expr::NewArray { items, .. } => items.iter().all(Expr::is_closed),
            Expr::New(members) => members.iter().all(|(_, e)| e.is_closed()),
            Expr::Lambda(_) => false,
        }
    }

    /// Member name when this node reads directly off `parameter`
    pub fn parameter_member(&self, parameter: &str) -> Option<&str> {
        match self {
            Expr::Member { target, name } => match target.as_ref() {
                Expr::Parameter(p) if p == parameter => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Expr::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // Construction helpers
    // ---------------------------------------------------------------

    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    pub fn source(table: impl Into<String>) -> Self {
        Expr::Source(table.into())
    }

    pub fn lambda(parameter: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda(Lambda {
            parameter: parameter.into(),
            body: Box::new(body),
        })
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Eq, self, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Ne, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Ge, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Self::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Or, self, other)
    }

    pub fn call(method: Method, receiver: Option<Expr>, args: Vec<Expr>) -> Self {
        Expr::Call(Call {
            method,
            receiver: receiver.map(Box::new),
            args,
        })
    }

    pub fn compare_to(self, other: Expr) -> Self {
        Self::call(Method::CompareTo, Some(self), vec![other])
    }

    pub fn compare(a: Expr, b: Expr) -> Self {
        Self::call(Method::Compare, None, vec![a, b])
    }

    pub fn compare_ordinal(a: Expr, b: Expr) -> Self {
        Self::call(Method::CompareOrdinal, None, vec![a, b])
    }

    pub fn contains(self, needle: Expr) -> Self {
        Self::call(Method::Contains, Some(self), vec![needle])
    }

    pub fn to_string_or_empty(self) -> Self {
        Self::call(Method::ToStringOrEmpty, Some(self), Vec::new())
    }

    pub fn native(method: NativeMethod, receiver: Option<Expr>, args: Vec<Expr>) -> Self {
        Self::call(Method::Native(method), receiver, args)
    }

    pub fn byte_array(items: Vec<Expr>) -> Self {
        Expr::NewArray {
            element: ElementType::Byte,
            items,
        }
    }

    pub fn shape<K: Into<String>>(members: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::New(members.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    // ---------------------------------------------------------------
    // Query chain helpers
    // ---------------------------------------------------------------

    /// Wraps `self` as the source of the named query operator
    pub fn operator(self, name: &str, mut args: Vec<Expr>) -> Self {
        args.insert(0, self);
        Self::call(
            Method::Operator {
                namespace: QUERY_NAMESPACE.to_string(),
                name: name.to_string(),
            },
            None,
            args,
        )
    }

    pub fn filter(self, predicate: Expr) -> Self {
        self.operator("Where", vec![predicate])
    }

    pub fn select(self, projection: Expr) -> Self {
        self.operator("Select", vec![projection])
    }

    pub fn take(self, count: Expr) -> Self {
        self.operator("Take", vec![count])
    }

    pub fn first(self) -> Self {
        self.operator("First", Vec::new())
    }

    pub fn first_by(self, predicate: Expr) -> Self {
        self.operator("First", vec![predicate])
    }

    pub fn first_or_default(self) -> Self {
        self.operator("FirstOrDefault", Vec::new())
    }

    pub fn first_or_default_by(self, predicate: Expr) -> Self {
        self.operator("FirstOrDefault", vec![predicate])
    }

    pub fn single(self) -> Self {
        self.operator("Single", Vec::new())
    }

    pub fn single_by(self, predicate: Expr) -> Self {
        self.operator("Single", vec![predicate])
    }

    pub fn single_or_default(self) -> Self {
        self.operator("SingleOrDefault", Vec::new())
    }

    pub fn single_or_default_by(self, predicate: Expr) -> Self {
        self.operator("SingleOrDefault", vec![predicate])
    }
}
