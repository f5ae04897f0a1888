//! Tagged entity properties

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// Store-native slot kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    String,
    Binary,
    Boolean,
    Int32,
    Int64,
    Double,
    Guid,
    DateTime,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Binary => "binary",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Int32 => "int32",
            PropertyKind::Int64 => "int64",
            PropertyKind::Double => "double",
            PropertyKind::Guid => "guid",
            PropertyKind::DateTime => "datetime",
        }
    }

    /// A null property of this kind
    pub fn null(self) -> EntityProperty {
        match self {
            PropertyKind::String => EntityProperty::String(None),
            PropertyKind::Binary => EntityProperty::Binary(None),
            PropertyKind::Boolean => EntityProperty::Boolean(None),
            PropertyKind::Int32 => EntityProperty::Int32(None),
            PropertyKind::Int64 => EntityProperty::Int64(None),
            PropertyKind::Double => EntityProperty::Double(None),
            PropertyKind::Guid => EntityProperty::Guid(None),
            PropertyKind::DateTime => EntityProperty::DateTime(None),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed attribute value as the store holds it
///
/// Every kind carries a nullable payload so a typed null survives the
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EntityProperty {
    String(Option<String>),
    Binary(Option<Vec<u8>>),
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Double(Option<f64>),
    Guid(Option<Uuid>),
    DateTime(Option<DateTime<Utc>>),
}

impl EntityProperty {
    pub fn kind(&self) -> PropertyKind {
        match self {
            EntityProperty::String(_) => PropertyKind::String,
            EntityProperty::Binary(_) => PropertyKind::Binary,
            EntityProperty::Boolean(_) => PropertyKind::Boolean,
            EntityProperty::Int32(_) => PropertyKind::Int32,
            EntityProperty::Int64(_) => PropertyKind::Int64,
            EntityProperty::Double(_) => PropertyKind::Double,
            EntityProperty::Guid(_) => PropertyKind::Guid,
            EntityProperty::DateTime(_) => PropertyKind::DateTime,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self,
            EntityProperty::String(None)
                | EntityProperty::Binary(None)
                | EntityProperty::Boolean(None)
                | EntityProperty::Int32(None)
                | EntityProperty::Int64(None)
                | EntityProperty::Double(None)
                | EntityProperty::Guid(None)
                | EntityProperty::DateTime(None)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntityProperty::String(Some(s)) => Some(s),
            _ => None,
        }
    }

    /// The payload as a dynamic value; typed nulls become `Value::Null`
    pub fn to_value(&self) -> Value {
        match self.clone() {
            EntityProperty::String(v) => v.into(),
            EntityProperty::Binary(v) => v.into(),
            EntityProperty::Boolean(v) => v.into(),
            EntityProperty::Int32(v) => v.into(),
            EntityProperty::Int64(v) => v.into(),
            EntityProperty::Double(v) => v.into(),
            EntityProperty::Guid(v) => v.into(),
            EntityProperty::DateTime(v) => v.into(),
        }
    }
}
