//! Property accessor compiler
//!
//! Turns one `FieldDef` into a `FieldAccessor`: a getter producing the
//! tagged wire property and a setter reading it back, both bound to a
//! single store slot. Slot classification happens here, once, so an
//! unsupported field type fails the descriptor build and never a record
//! conversion.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use super::errors::{MappingError, MappingResult};
use super::record::{FieldDef, FieldLens, FieldType, PayloadSerializer, ValueGetter, ValueSetter};
use crate::value::Value;
use crate::wire::{EntityProperty, PropertyKind};

type Read<R> = Arc<dyn Fn(&R) -> MappingResult<EntityProperty> + Send + Sync>;
type Write<R> = Arc<dyn Fn(&mut R, Option<&EntityProperty>) -> MappingResult<()> + Send + Sync>;
type RowRead<R> = Arc<dyn Fn(&R) -> MappingResult<Value> + Send + Sync>;

/// Compiled get/set pair for one field
pub struct FieldAccessor<R> {
    field: &'static str,
    wire_name: String,
    kind: PropertyKind,
    read: Read<R>,
    write: Write<R>,
    row: RowRead<R>,
}

impl<R> Clone for FieldAccessor<R> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            wire_name: self.wire_name.clone(),
            kind: self.kind,
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
            row: Arc::clone(&self.row),
        }
    }
}

impl<R> FieldAccessor<R> {
    /// Record field name
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Wire attribute name
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Store slot the field is bound to
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Reads the field as a tagged property
    pub fn get(&self, record: &R) -> MappingResult<EntityProperty> {
        (self.read)(record)
    }

    /// Writes a property into the field; `None` means the slot was absent
    pub fn set(&self, record: &mut R, property: Option<&EntityProperty>) -> MappingResult<()> {
        (self.write)(record, property)
    }

    /// Reads the field as the value a materialized row carries
    pub fn row_value(&self, record: &R) -> MappingResult<Value> {
        (self.row)(record)
    }
}

/// Store slot for a declared type, if it has one
pub fn slot_for(ty: &FieldType) -> Option<PropertyKind> {
    match ty.storage() {
        FieldType::Bool => Some(PropertyKind::Boolean),
        FieldType::Binary => Some(PropertyKind::Binary),
        FieldType::Int32 => Some(PropertyKind::Int32),
        FieldType::Int64 => Some(PropertyKind::Int64),
        FieldType::Double => Some(PropertyKind::Double),
        FieldType::String => Some(PropertyKind::String),
        FieldType::Guid => Some(PropertyKind::Guid),
        FieldType::DateTime => Some(PropertyKind::DateTime),
        FieldType::Nullable(_)
        | FieldType::Enum { .. }
        | FieldType::Nested
        | FieldType::Other(_) => None,
    }
}

/// Value a non-nullable datetime field takes when its slot is absent
pub fn min_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Converts `value` into a property of `kind`.
///
/// Integer and double slots accept each other when the conversion is
/// lossless; any other mismatch names the field.
pub fn coerce(field: &str, kind: PropertyKind, value: Value) -> MappingResult<EntityProperty> {
    let mismatch = |found: &'static str| MappingError::TypeMismatch {
        field: field.to_string(),
        expected: kind.as_str(),
        found,
    };

    let property = match (kind, value) {
        (kind, Value::Null) => kind.null(),
        (PropertyKind::String, Value::String(s)) => EntityProperty::String(Some(s)),
        (PropertyKind::Binary, Value::Binary(b)) => EntityProperty::Binary(Some(b)),
        (PropertyKind::Boolean, Value::Bool(b)) => EntityProperty::Boolean(Some(b)),
        (PropertyKind::Guid, Value::Guid(g)) => EntityProperty::Guid(Some(g)),
        (PropertyKind::DateTime, Value::DateTime(dt)) => EntityProperty::DateTime(Some(dt)),

        (PropertyKind::Int32, Value::Int32(n)) => EntityProperty::Int32(Some(n)),
        (PropertyKind::Int32, Value::Int64(n)) => {
            EntityProperty::Int32(Some(i32::try_from(n).map_err(|_| mismatch("out-of-range int64"))?))
        }
        (PropertyKind::Int32, Value::Double(d)) => {
            let n = integral(d).ok_or_else(|| mismatch("fractional double"))?;
            EntityProperty::Int32(Some(i32::try_from(n).map_err(|_| mismatch("out-of-range double"))?))
        }
        (PropertyKind::Int64, Value::Int32(n)) => EntityProperty::Int64(Some(i64::from(n))),
        (PropertyKind::Int64, Value::Int64(n)) => EntityProperty::Int64(Some(n)),
        (PropertyKind::Int64, Value::Double(d)) => {
            EntityProperty::Int64(Some(integral(d).ok_or_else(|| mismatch("fractional double"))?))
        }
        (PropertyKind::Double, Value::Double(d)) => EntityProperty::Double(Some(d)),
        (PropertyKind::Double, Value::Int32(n)) => EntityProperty::Double(Some(f64::from(n))),
        (PropertyKind::Double, Value::Int64(n)) => EntityProperty::Double(Some(n as f64)),

        (_, other) => return Err(mismatch(other.kind().as_str())),
    };
    Ok(property)
}

/// Whole-number doubles within the i64 range
fn integral(d: f64) -> Option<i64> {
    if d.is_finite() && d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 {
        Some(d as i64)
    } else {
        None
    }
}

fn value_lens<R>(type_name: &str, def: &FieldDef<R>) -> MappingResult<(ValueGetter<R>, ValueSetter<R>)> {
    match &def.lens {
        FieldLens::Value { get, set } => Ok((*get, *set)),
        FieldLens::Json { .. } => Err(MappingError::LensMismatch {
            type_name: type_name.to_string(),
            field: def.name.to_string(),
            reason: "nested field needs a serialized marker",
        }),
    }
}

/// Accessor for a regular, named, etag or timestamp field
pub fn compile_property<R: 'static>(
    type_name: &str,
    def: &FieldDef<R>,
    wire_name: impl Into<String>,
) -> MappingResult<FieldAccessor<R>> {
    let (get, set) = value_lens(type_name, def)?;
    let kind = slot_for(&def.ty).ok_or_else(|| MappingError::UnsupportedFieldType {
        type_name: type_name.to_string(),
        field: def.name.to_string(),
        ty: def.ty.to_string(),
    })?;
    let nullable = def.ty.is_nullable();
    let field = def.name;

    let read: Read<R> = Arc::new(move |record: &R| coerce(field, kind, get(record)));

    let write: Write<R> = Arc::new(move |record: &mut R, property: Option<&EntityProperty>| -> MappingResult<()> {
        let value = match property {
            Some(property) => coerce(field, kind, property.to_value())?.to_value(),
            None => Value::Null,
        };
        match value {
            Value::Null if nullable => set(record, Value::Null),
            Value::Null if kind == PropertyKind::DateTime => {
                set(record, Value::DateTime(min_datetime()))
            }
            // Absent or null slot on a non-nullable field keeps the default
            Value::Null => Ok(()),
            value => set(record, value),
        }
    });

    let row: RowRead<R> = Arc::new(move |record: &R| -> MappingResult<Value> { Ok(get(record)) });

    Ok(FieldAccessor {
        field,
        wire_name: wire_name.into(),
        kind,
        read,
        write,
        row,
    })
}

/// Accessor for a partition-key or row-key field.
///
/// The wire key is always text; string, guid and integer fields are
/// rendered to and parsed from it.
pub fn compile_key<R: 'static>(
    type_name: &str,
    def: &FieldDef<R>,
    wire_name: impl Into<String>,
) -> MappingResult<FieldAccessor<R>> {
    let (get, set) = value_lens(type_name, def)?;
    let kind = match slot_for(&def.ty) {
        Some(kind @ (PropertyKind::String | PropertyKind::Guid | PropertyKind::Int32 | PropertyKind::Int64)) => {
            kind
        }
        _ => {
            return Err(MappingError::UnsupportedKeyType {
                type_name: type_name.to_string(),
                field: def.name.to_string(),
                ty: def.ty.to_string(),
            })
        }
    };
    let field = def.name;

    let read: Read<R> = Arc::new(move |record: &R| {
        key_text(field, get(record)).map(|text| EntityProperty::String(Some(text)))
    });

    let write: Write<R> = Arc::new(move |record: &mut R, property: Option<&EntityProperty>| -> MappingResult<()> {
        let Some(property) = property else {
            return Ok(());
        };
        let text = property.as_str().ok_or_else(|| MappingError::TypeMismatch {
            field: field.to_string(),
            expected: PropertyKind::String.as_str(),
            found: property.kind().as_str(),
        })?;
        set(record, parse_key(kind, text)?)
    });

    let row: RowRead<R> = Arc::new(move |record: &R| -> MappingResult<Value> { Ok(get(record)) });

    Ok(FieldAccessor {
        field,
        wire_name: wire_name.into(),
        kind: PropertyKind::String,
        read,
        write,
        row,
    })
}

fn key_text(field: &str, value: Value) -> MappingResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Guid(g) => Ok(g.hyphenated().to_string()),
        Value::Int32(n) => Ok(n.to_string()),
        Value::Int64(n) => Ok(n.to_string()),
        other => Err(MappingError::TypeMismatch {
            field: field.to_string(),
            expected: "key",
            found: other.kind().as_str(),
        }),
    }
}

fn parse_key(kind: PropertyKind, text: &str) -> MappingResult<Value> {
    let malformed = || MappingError::Conversion {
        expected: kind.as_str(),
        found: "key text",
    };
    match kind {
        PropertyKind::Guid => Uuid::parse_str(text).map(Value::Guid).map_err(|_| malformed()),
        PropertyKind::Int32 => text.parse().map(Value::Int32).map_err(|_| malformed()),
        PropertyKind::Int64 => text.parse().map(Value::Int64).map_err(|_| malformed()),
        _ => Ok(Value::String(text.to_string())),
    }
}

/// Accessor for a nested field stored as a serialized string payload
pub fn compile_nested<R: 'static>(
    type_name: &str,
    def: &FieldDef<R>,
    wire_name: impl Into<String>,
    serializer: Arc<dyn PayloadSerializer>,
) -> MappingResult<FieldAccessor<R>> {
    let (get, set) = match &def.lens {
        FieldLens::Json { get, set } => (Arc::clone(get), Arc::clone(set)),
        FieldLens::Value { .. } => {
            return Err(MappingError::LensMismatch {
                type_name: type_name.to_string(),
                field: def.name.to_string(),
                reason: "serialized marker needs a nested field",
            })
        }
    };
    let field = def.name;

    let encode = {
        let serializer = Arc::clone(&serializer);
        move |record: &R| -> MappingResult<String> {
            let payload = get(record)?;
            serializer
                .encode(&payload)
                .map_err(|source| MappingError::Serialization {
                    field: field.to_string(),
                    source,
                })
        }
    };
    let encode = Arc::new(encode);

    let read: Read<R> = {
        let encode = Arc::clone(&encode);
        Arc::new(move |record: &R| encode(record).map(|text| EntityProperty::String(Some(text))))
    };

    let write: Write<R> = Arc::new(move |record: &mut R, property: Option<&EntityProperty>| -> MappingResult<()> {
        let text = match property {
            None | Some(EntityProperty::String(None)) => return Ok(()),
            Some(EntityProperty::String(Some(text))) => text,
            Some(other) => {
                return Err(MappingError::TypeMismatch {
                    field: field.to_string(),
                    expected: PropertyKind::String.as_str(),
                    found: other.kind().as_str(),
                })
            }
        };
        let payload = serializer
            .decode(text)
            .map_err(|source| MappingError::Serialization {
                field: field.to_string(),
                source,
            })?;
        set(record, payload)
    });

    let row: RowRead<R> = Arc::new(move |record: &R| encode(record).map(Value::String));

    Ok(FieldAccessor {
        field,
        wire_name: wire_name.into(),
        kind: PropertyKind::String,
        read,
        write,
        row,
    })
}
