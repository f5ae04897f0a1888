//! Dynamic values shared by expressions, records and accessors
//!
//! A `Value` is what a closed expression folds to, what a record field
//! reads as, and what a materialized row is made of. Wire-level tagged
//! attributes live in `crate::wire`; this type is the record side.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::mapping::{MappingError, MappingResult};

/// Primitive kinds a `Value` can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int32,
    Int64,
    Double,
    String,
    Binary,
    Guid,
    DateTime,
    List,
    Record,
}

impl ValueKind {
    /// Returns the kind name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Binary => "binary",
            ValueKind::Guid => "guid",
            ValueKind::DateTime => "datetime",
            ValueKind::List => "list",
            ValueKind::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
    /// Ordered collection, e.g. a captured list searched by `Contains`
    List(Vec<Value>),
    /// Named members, e.g. a materialized row or a projected shape
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a record value from `(name, value)` pairs
    pub fn record<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::Guid(_) => ValueKind::Guid,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::List(_) => ValueKind::List,
            Value::Record(_) => ValueKind::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widens any integer value to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads a member of a record value
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(members) => members.get(name),
            _ => None,
        }
    }

    /// Compares two values of compatible kinds.
    ///
    /// Integers compare across widths, strings compare ordinally.
    /// Returns `None` for incomparable kinds.
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Double(a), b) => b.as_i64().and_then(|b| a.partial_cmp(&(b as f64))),
            (a, Value::Double(b)) => a.as_i64().and_then(|a| (a as f64).partial_cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }

    /// Converts into an optional field value; `Null` becomes `None`
    pub fn into_optional<T>(self) -> MappingResult<Option<T>>
    where
        T: TryFrom<Value, Error = MappingError>,
    {
        match self {
            Value::Null => Ok(None),
            other => T::try_from(other).map(Some),
        }
    }

    /// Equality with integer widening, used by local evaluation
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => match self.compare(other) {
                Some(ordering) => ordering.is_eq(),
                None => self == other,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Guid(g) => write!(f, "{}", g),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(members) => {
                write!(f, "{{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    String => String,
    Vec<u8> => Binary,
    Uuid => Guid,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

fn mismatch(expected: ValueKind, found: &Value) -> MappingError {
    MappingError::Conversion {
        expected: expected.as_str(),
        found: found.kind().as_str(),
    }
}

impl TryFrom<Value> for bool {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(ValueKind::Bool, &other)),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Int32(n) => Ok(n),
            Value::Int64(n) => i32::try_from(n).map_err(|_| MappingError::Conversion {
                expected: "int32",
                found: "out-of-range int64",
            }),
            other => Err(mismatch(ValueKind::Int32, &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Int32(n) => Ok(i64::from(n)),
            Value::Int64(n) => Ok(n),
            other => Err(mismatch(ValueKind::Int64, &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Double(n) => Ok(n),
            Value::Int32(n) => Ok(f64::from(n)),
            other => Err(mismatch(ValueKind::Double, &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::String(s) => Ok(s),
            other => Err(mismatch(ValueKind::String, &other)),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Binary(b) => Ok(b),
            other => Err(mismatch(ValueKind::Binary, &other)),
        }
    }
}

impl TryFrom<Value> for Uuid {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::Guid(g) => Ok(g),
            other => Err(mismatch(ValueKind::Guid, &other)),
        }
    }
}

impl TryFrom<Value> for DateTime<Utc> {
    type Error = MappingError;

    fn try_from(v: Value) -> MappingResult<Self> {
        match v {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch(ValueKind::DateTime, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_integer_widening_compare() {
        assert_eq!(Value::Int32(5).compare(&Value::Int64(5)), Some(Ordering::Equal));
        assert_eq!(Value::Int64(2).compare(&Value::Double(2.5)), Some(Ordering::Less));
        assert_eq!(Value::String("a".into()).compare(&Value::Int32(1)), None);
    }

    #[test]
    fn test_loose_equality_nulls() {
        assert!(Value::Null.loosely_equals(&Value::Null));
        assert!(!Value::Null.loosely_equals(&Value::Int32(0)));
        assert!(Value::Int32(7).loosely_equals(&Value::Int64(7)));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::Null.into_optional::<i32>().unwrap(), None);
        assert_eq!(Value::Int32(3).into_optional::<i32>().unwrap(), Some(3));
        assert!(Value::from("x").into_optional::<i32>().is_err());
    }

    #[test]
    fn test_record_member_lookup() {
        let row = Value::record([("Name", Value::from("Spain")), ("Area", Value::Double(1.5))]);
        assert_eq!(row.member("Name"), Some(&Value::from("Spain")));
        assert_eq!(row.member("Missing"), None);
    }
}
