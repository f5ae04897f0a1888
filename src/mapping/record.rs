//! Record type declarations
//!
//! A record type describes its fields once through `TableRecord::fields`.
//! Each `FieldDef` names the field, declares its type and role markers and
//! carries a lens that reads and writes the field on an instance.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{MappingError, MappingResult};
use crate::value::Value;

/// A record type that maps to wire entities
pub trait TableRecord: Default + Send + Sync + 'static {
    /// Type name used in error messages and log events
    fn type_name() -> &'static str;

    /// Field declarations in wire order
    fn fields() -> Vec<FieldDef<Self>>;
}

/// Declared type of a record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Binary,
    Int32,
    Int64,
    Double,
    String,
    Guid,
    DateTime,
    Nullable(Box<FieldType>),
    /// Enum stored as its underlying integer type
    Enum { underlying: Box<FieldType> },
    /// Structured value stored as a serialized payload
    Nested,
    /// Anything else; named in the build error
    Other(&'static str),
}

impl FieldType {
    pub fn nullable(inner: FieldType) -> Self {
        FieldType::Nullable(Box::new(inner))
    }

    pub fn enumeration(underlying: FieldType) -> Self {
        FieldType::Enum {
            underlying: Box::new(underlying),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::Nullable(_))
    }

    /// The type the store sees: nullability stripped, enums replaced by
    /// their underlying type
    pub fn storage(&self) -> &FieldType {
        match self {
            FieldType::Nullable(inner) => inner.storage(),
            FieldType::Enum { underlying } => underlying.storage(),
            other => other,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Binary => write!(f, "binary"),
            FieldType::Int32 => write!(f, "int32"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Double => write!(f, "double"),
            FieldType::String => write!(f, "string"),
            FieldType::Guid => write!(f, "guid"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Nullable(inner) => write!(f, "{}?", inner),
            FieldType::Enum { underlying } => write!(f, "enum({})", underlying),
            FieldType::Nested => write!(f, "nested"),
            FieldType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Role marker declared on a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMarker {
    PartitionKey,
    RowKey,
    ETag,
    Timestamp,
    /// Stored under a different wire name
    Named(&'static str),
    /// Not mapped
    Ignore,
    /// Stored as a serialized string payload under the given wire name
    Serialized(&'static str),
}

/// Reads a field as a dynamic value
pub type ValueGetter<R> = fn(&R) -> Value;
/// Writes a dynamic value into a field
pub type ValueSetter<R> = fn(&mut R, Value) -> MappingResult<()>;

type JsonGetter<R> = Arc<dyn Fn(&R) -> MappingResult<serde_json::Value> + Send + Sync>;
type JsonSetter<R> = Arc<dyn Fn(&mut R, serde_json::Value) -> MappingResult<()> + Send + Sync>;

/// How a field is read and written on a record instance
pub enum FieldLens<R> {
    /// Scalar field exchanged as a `Value`
    Value { get: ValueGetter<R>, set: ValueSetter<R> },
    /// Structured field exchanged as a JSON document
    Json { get: JsonGetter<R>, set: JsonSetter<R> },
}

impl<R> Clone for FieldLens<R> {
    fn clone(&self) -> Self {
        match self {
            FieldLens::Value { get, set } => FieldLens::Value { get: *get, set: *set },
            FieldLens::Json { get, set } => FieldLens::Json {
                get: Arc::clone(get),
                set: Arc::clone(set),
            },
        }
    }
}

/// One field of a record type
pub struct FieldDef<R> {
    pub name: &'static str,
    pub ty: FieldType,
    pub markers: Vec<RoleMarker>,
    pub lens: FieldLens<R>,
}

impl<R: 'static> FieldDef<R> {
    /// A scalar field
    pub fn new(name: &'static str, ty: FieldType, get: ValueGetter<R>, set: ValueSetter<R>) -> Self {
        Self {
            name,
            ty,
            markers: Vec::new(),
            lens: FieldLens::Value { get, set },
        }
    }

    /// A structured field stored through serde; pair with `serialized`
    pub fn nested<T>(name: &'static str, get: fn(&R) -> &T, set: fn(&mut R, T)) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let json_get: JsonGetter<R> = Arc::new(move |record: &R| -> MappingResult<serde_json::Value> {
            serde_json::to_value(get(record)).map_err(|source| MappingError::Serialization {
                field: name.to_string(),
                source,
            })
        });
        let json_set: JsonSetter<R> = Arc::new(move |record: &mut R, json: serde_json::Value| -> MappingResult<()> {
            let value: T = serde_json::from_value(json).map_err(|source| {
                MappingError::Serialization {
                    field: name.to_string(),
                    source,
                }
            })?;
            set(record, value);
            Ok(())
        });

        Self {
            name,
            ty: FieldType::Nested,
            markers: Vec::new(),
            lens: FieldLens::Json {
                get: json_get,
                set: json_set,
            },
        }
    }

    pub fn marker(mut self, marker: RoleMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn partition_key(self) -> Self {
        self.marker(RoleMarker::PartitionKey)
    }

    pub fn row_key(self) -> Self {
        self.marker(RoleMarker::RowKey)
    }

    pub fn etag(self) -> Self {
        self.marker(RoleMarker::ETag)
    }

    pub fn timestamp(self) -> Self {
        self.marker(RoleMarker::Timestamp)
    }

    pub fn named(self, wire_name: &'static str) -> Self {
        self.marker(RoleMarker::Named(wire_name))
    }

    pub fn ignore(self) -> Self {
        self.marker(RoleMarker::Ignore)
    }

    pub fn serialized(self, wire_name: &'static str) -> Self {
        self.marker(RoleMarker::Serialized(wire_name))
    }
}

/// Encodes nested payloads to the string stored on the wire
pub trait PayloadSerializer: Send + Sync {
    fn encode(&self, payload: &serde_json::Value) -> Result<String, serde_json::Error>;
    fn decode(&self, text: &str) -> Result<serde_json::Value, serde_json::Error>;
}

/// Compact JSON payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl PayloadSerializer for JsonSerializer {
    fn encode(&self, payload: &serde_json::Value) -> Result<String, serde_json::Error> {
        serde_json::to_string(payload)
    }

    fn decode(&self, text: &str) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Classified role of a field
#[derive(Clone)]
pub enum FieldRole {
    PartitionKey,
    RowKey,
    ETag,
    Timestamp,
    Named(String),
    Ignored,
    NestedSerialized {
        name: String,
        serializer: Arc<dyn PayloadSerializer>,
    },
    Regular,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::PartitionKey => "PartitionKey",
            FieldRole::RowKey => "RowKey",
            FieldRole::ETag => "ETag",
            FieldRole::Timestamp => "Timestamp",
            FieldRole::Named(_) => "Named",
            FieldRole::Ignored => "Ignored",
            FieldRole::NestedSerialized { .. } => "NestedSerialized",
            FieldRole::Regular => "Regular",
        }
    }
}

impl fmt::Debug for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Named(name) => write!(f, "Named({})", name),
            FieldRole::NestedSerialized { name, .. } => write!(f, "NestedSerialized({})", name),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl PartialEq for FieldRole {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldRole::Named(a), FieldRole::Named(b)) => a == b,
            (FieldRole::NestedSerialized { name: a, .. }, FieldRole::NestedSerialized { name: b, .. }) => {
                a == b
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_strips_wrappers() {
        let ty = FieldType::nullable(FieldType::enumeration(FieldType::Int32));
        assert!(ty.is_nullable());
        assert_eq!(ty.storage(), &FieldType::Int32);
        assert_eq!(ty.to_string(), "enum(int32)?");
    }

    #[test]
    fn test_json_serializer_round_trip() {
        let payload = serde_json::json!({"lat": 40.4, "tags": ["capital"]});
        let text = JsonSerializer.encode(&payload).unwrap();
        assert_eq!(JsonSerializer.decode(&text).unwrap(), payload);
    }

    #[test]
    fn test_role_equality_ignores_serializer() {
        let a = FieldRole::NestedSerialized {
            name: "Geo".into(),
            serializer: Arc::new(JsonSerializer),
        };
        let b = FieldRole::NestedSerialized {
            name: "Geo".into(),
            serializer: Arc::new(JsonSerializer),
        };
        assert_eq!(a, b);
        assert_ne!(FieldRole::ETag, FieldRole::Timestamp);
        assert_eq!(format!("{:?}", FieldRole::Named("Size".into())), "Named(Size)");
    }
}
