//! Record type descriptor builder
//!
//! Classifies every field of a record type once, compiles its accessor
//! and asserts the key presence invariant. The resulting descriptor is
//! immutable and converts records to and from wire entities.

use std::fmt;

use super::accessor::{compile_key, compile_nested, compile_property, slot_for, FieldAccessor};
use super::config::MappingConfig;
use super::errors::{MappingError, MappingResult};
use super::name_changes::{NameChanges, ETAG, PARTITION_KEY, ROW_KEY, TIMESTAMP};
use super::record::{FieldDef, FieldRole, RoleMarker, TableRecord};
use crate::value::Value;
use crate::wire::{EntityProperty, PropertyKind, WireEntity};

/// Cached mapping metadata and compiled accessors for one record type
pub struct RecordTypeDescriptor<R> {
    type_name: &'static str,
    partition_key: Option<FieldAccessor<R>>,
    row_key: Option<FieldAccessor<R>>,
    etag: Option<FieldAccessor<R>>,
    timestamp: Option<FieldAccessor<R>>,
    properties: Vec<FieldAccessor<R>>,
    roles: Vec<(&'static str, FieldRole)>,
    name_changes: NameChanges,
}

impl<R: TableRecord> RecordTypeDescriptor<R> {
    /// Builds the descriptor for `R`.
    ///
    /// `mapping` is an externally registered name-change table; it
    /// classifies fields that carry no marker of their own.
    pub fn build(mapping: Option<&NameChanges>, config: &MappingConfig) -> MappingResult<Self> {
        let type_name = R::type_name();
        let fields = R::fields();

        let conventions = config.conventions
            && mapping.is_none()
            && !fields.iter().any(|f| {
                f.markers
                    .iter()
                    .any(|m| matches!(m, RoleMarker::PartitionKey | RoleMarker::RowKey))
            });

        let mut descriptor = RecordTypeDescriptor {
            type_name,
            partition_key: None,
            row_key: None,
            etag: None,
            timestamp: None,
            properties: Vec::new(),
            roles: Vec::with_capacity(fields.len()),
            name_changes: NameChanges::new(),
        };

        for def in &fields {
            let role = classify(type_name, def, mapping, config, conventions)?;
            descriptor.install(def, &role)?;
            descriptor.roles.push((def.name, role));
        }

        if descriptor.partition_key.is_none() && descriptor.row_key.is_none() {
            return Err(MappingError::MissingKey {
                type_name: type_name.to_string(),
            });
        }
        Ok(descriptor)
    }

    fn install(&mut self, def: &FieldDef<R>, role: &FieldRole) -> MappingResult<()> {
        let type_name = self.type_name;
        match role {
            FieldRole::PartitionKey => {
                let accessor = compile_key(type_name, def, PARTITION_KEY)?;
                place(type_name, &mut self.partition_key, accessor, PARTITION_KEY)?;
                self.rename(def.name, PARTITION_KEY)?;
            }
            FieldRole::RowKey => {
                let accessor = compile_key(type_name, def, ROW_KEY)?;
                place(type_name, &mut self.row_key, accessor, ROW_KEY)?;
                self.rename(def.name, ROW_KEY)?;
            }
            FieldRole::ETag => {
                require_slot(type_name, def, PropertyKind::String)?;
                let accessor = compile_property(type_name, def, ETAG)?;
                place(type_name, &mut self.etag, accessor, ETAG)?;
                self.rename(def.name, ETAG)?;
            }
            FieldRole::Timestamp => {
                require_slot(type_name, def, PropertyKind::DateTime)?;
                let accessor = compile_property(type_name, def, TIMESTAMP)?;
                place(type_name, &mut self.timestamp, accessor, TIMESTAMP)?;
                self.rename(def.name, TIMESTAMP)?;
            }
            FieldRole::Named(wire) => {
                self.properties.push(compile_property(type_name, def, wire.as_str())?);
                self.rename(def.name, wire)?;
            }
            FieldRole::NestedSerialized { name, serializer } => {
                let accessor = compile_nested(type_name, def, name.as_str(), serializer.clone())?;
                self.properties.push(accessor);
                self.rename(def.name, name)?;
            }
            FieldRole::Regular => {
                self.properties.push(compile_property(type_name, def, def.name)?);
            }
            FieldRole::Ignored => {}
        }
        Ok(())
    }

    fn rename(&mut self, field: &str, wire: &str) -> MappingResult<()> {
        if field != wire {
            self.name_changes.insert(field, wire)?;
        }
        Ok(())
    }
}

impl<R> RecordTypeDescriptor<R> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Field → wire renames implied by the classified roles
    pub fn name_changes(&self) -> &NameChanges {
        &self.name_changes
    }

    /// Classified role of every declared field, in declaration order
    pub fn roles(&self) -> &[(&'static str, FieldRole)] {
        &self.roles
    }

    pub fn role_of(&self, field: &str) -> Option<&FieldRole> {
        self.roles.iter().find(|(name, _)| *name == field).map(|(_, role)| role)
    }

    pub fn partition_key_field(&self) -> Option<&'static str> {
        self.partition_key.as_ref().map(FieldAccessor::field)
    }

    pub fn row_key_field(&self) -> Option<&'static str> {
        self.row_key.as_ref().map(FieldAccessor::field)
    }

    /// Accessors for non-system properties in declaration order
    pub fn properties(&self) -> &[FieldAccessor<R>] {
        &self.properties
    }

    /// Converts a record into a wire entity.
    ///
    /// Timestamps are owned by the store and never written.
    pub fn to_entity(&self, record: &R) -> MappingResult<WireEntity> {
        let mut entity = WireEntity {
            partition_key: key_text(self.partition_key.as_ref(), record)?,
            row_key: key_text(self.row_key.as_ref(), record)?,
            ..WireEntity::default()
        };

        if let Some(etag) = &self.etag {
            entity.etag = etag.get(record)?.as_str().map(str::to_string);
        }
        for accessor in &self.properties {
            entity
                .properties
                .insert(accessor.wire_name().to_string(), accessor.get(record)?);
        }
        Ok(entity)
    }

    /// Materializes a record from a wire entity
    pub fn from_entity(&self, entity: &WireEntity) -> MappingResult<R>
    where
        R: Default,
    {
        let mut record = R::default();

        if let Some(accessor) = &self.partition_key {
            let key = EntityProperty::String(Some(entity.partition_key.clone()));
            accessor.set(&mut record, Some(&key))?;
        }
        if let Some(accessor) = &self.row_key {
            let key = EntityProperty::String(Some(entity.row_key.clone()));
            accessor.set(&mut record, Some(&key))?;
        }
        if let Some(accessor) = &self.etag {
            let etag = entity.etag.clone().map(|e| EntityProperty::String(Some(e)));
            accessor.set(&mut record, etag.as_ref())?;
        }
        if let Some(accessor) = &self.timestamp {
            let timestamp = entity.timestamp.map(|t| EntityProperty::DateTime(Some(t)));
            accessor.set(&mut record, timestamp.as_ref())?;
        }
        for accessor in &self.properties {
            accessor.set(&mut record, entity.property(accessor.wire_name()))?;
        }
        Ok(record)
    }

    /// The row shape post-processing transforms consume: a record value
    /// keyed by record field names
    pub fn to_row(&self, record: &R) -> MappingResult<Value> {
        let mut members = std::collections::BTreeMap::new();
        let system = [&self.partition_key, &self.row_key, &self.etag, &self.timestamp];
        for accessor in system.into_iter().flatten().chain(self.properties.iter()) {
            members.insert(accessor.field().to_string(), accessor.row_value(record)?);
        }
        Ok(Value::Record(members))
    }

    /// `from_entity` followed by `to_row`
    pub fn entity_to_row(&self, entity: &WireEntity) -> MappingResult<Value>
    where
        R: Default,
    {
        self.to_row(&self.from_entity(entity)?)
    }
}

impl<R> fmt::Debug for RecordTypeDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTypeDescriptor")
            .field("type_name", &self.type_name)
            .field("roles", &self.roles)
            .finish()
    }
}

fn classify<R>(
    type_name: &str,
    def: &FieldDef<R>,
    mapping: Option<&NameChanges>,
    config: &MappingConfig,
    conventions: bool,
) -> MappingResult<FieldRole> {
    let marker = match def.markers.as_slice() {
        [] => None,
        [marker] => Some(marker),
        _ => {
            return Err(MappingError::ConflictingMarkers {
                type_name: type_name.to_string(),
                field: def.name.to_string(),
            })
        }
    };

    let role = match marker {
        Some(RoleMarker::PartitionKey) => FieldRole::PartitionKey,
        Some(RoleMarker::RowKey) => FieldRole::RowKey,
        Some(RoleMarker::ETag) => FieldRole::ETag,
        Some(RoleMarker::Timestamp) => FieldRole::Timestamp,
        Some(RoleMarker::Named(wire)) => FieldRole::Named(wire.to_string()),
        Some(RoleMarker::Ignore) => FieldRole::Ignored,
        Some(RoleMarker::Serialized(wire)) => FieldRole::NestedSerialized {
            name: wire.to_string(),
            serializer: config.serializer.clone(),
        },
        None => match mapping.and_then(|m| m.get(def.name)) {
            Some(PARTITION_KEY) => FieldRole::PartitionKey,
            Some(ROW_KEY) => FieldRole::RowKey,
            Some(wire) => FieldRole::Named(wire.to_string()),
            None if conventions => match def.name {
                PARTITION_KEY => FieldRole::PartitionKey,
                ROW_KEY => FieldRole::RowKey,
                ETAG => FieldRole::ETag,
                TIMESTAMP => FieldRole::Timestamp,
                _ => FieldRole::Regular,
            },
            None => FieldRole::Regular,
        },
    };
    Ok(role)
}

fn place<R>(
    type_name: &str,
    slot: &mut Option<FieldAccessor<R>>,
    accessor: FieldAccessor<R>,
    role: &'static str,
) -> MappingResult<()> {
    if let Some(existing) = slot {
        return Err(MappingError::DuplicateRole {
            type_name: type_name.to_string(),
            role,
            first: existing.field().to_string(),
            second: accessor.field().to_string(),
        });
    }
    *slot = Some(accessor);
    Ok(())
}

fn require_slot<R>(type_name: &str, def: &FieldDef<R>, kind: PropertyKind) -> MappingResult<()> {
    if slot_for(&def.ty) == Some(kind) {
        Ok(())
    } else {
        Err(MappingError::UnsupportedFieldType {
            type_name: type_name.to_string(),
            field: def.name.to_string(),
            ty: def.ty.to_string(),
        })
    }
}

fn key_text<R>(accessor: Option<&FieldAccessor<R>>, record: &R) -> MappingResult<String> {
    match accessor {
        Some(accessor) => Ok(accessor.get(record)?.as_str().unwrap_or_default().to_string()),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldType;
    use chrono::{DateTime, Utc};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Country {
        continent: String,
        name: String,
        area: f64,
        is_exists: bool,
        etag: Option<String>,
        updated: DateTime<Utc>,
        notes: String,
    }

    impl TableRecord for Country {
        fn type_name() -> &'static str {
            "Country"
        }

        fn fields() -> Vec<FieldDef<Self>> {
            vec![
                FieldDef::new(
                    "Continent",
                    FieldType::String,
                    |c: &Country| c.continent.clone().into(),
                    |c: &mut Country, v| {
                        c.continent = v.try_into()?;
                        Ok(())
                    },
                )
                .partition_key(),
                FieldDef::new(
                    "Name",
                    FieldType::String,
                    |c: &Country| c.name.clone().into(),
                    |c: &mut Country, v| {
                        c.name = v.try_into()?;
                        Ok(())
                    },
                )
                .row_key(),
                FieldDef::new(
                    "Area",
                    FieldType::Double,
                    |c: &Country| c.area.into(),
                    |c: &mut Country, v| {
                        c.area = v.try_into()?;
                        Ok(())
                    },
                ),
                FieldDef::new(
                    "IsExists",
                    FieldType::Bool,
                    |c: &Country| c.is_exists.into(),
                    |c: &mut Country, v| {
                        c.is_exists = v.try_into()?;
                        Ok(())
                    },
                )
                .named("Exists"),
                FieldDef::new(
                    "Version",
                    FieldType::nullable(FieldType::String),
                    |c: &Country| c.etag.clone().into(),
                    |c: &mut Country, v| {
                        c.etag = v.into_optional()?;
                        Ok(())
                    },
                )
                .etag(),
                FieldDef::new(
                    "Updated",
                    FieldType::DateTime,
                    |c: &Country| c.updated.into(),
                    |c: &mut Country, v| {
                        c.updated = v.try_into()?;
                        Ok(())
                    },
                )
                .timestamp(),
                FieldDef::new(
                    "Notes",
                    FieldType::String,
                    |c: &Country| c.notes.clone().into(),
                    |c: &mut Country, v| {
                        c.notes = v.try_into()?;
                        Ok(())
                    },
                )
                .ignore(),
            ]
        }
    }

    fn spain() -> Country {
        Country {
            continent: "Europe".into(),
            name: "Spain".into(),
            area: 505_990.0,
            is_exists: true,
            etag: Some("W/\"1\"".into()),
            notes: "not stored".into(),
            ..Country::default()
        }
    }

    fn build() -> RecordTypeDescriptor<Country> {
        RecordTypeDescriptor::build(None, &MappingConfig::default()).unwrap()
    }

    #[test]
    fn test_roles_classified() {
        let descriptor = build();
        assert_eq!(descriptor.role_of("Continent"), Some(&FieldRole::PartitionKey));
        assert_eq!(descriptor.role_of("IsExists"), Some(&FieldRole::Named("Exists".into())));
        assert_eq!(descriptor.role_of("Notes"), Some(&FieldRole::Ignored));
        assert_eq!(descriptor.role_of("Area"), Some(&FieldRole::Regular));
        assert_eq!(descriptor.name_changes().wire_name("Name"), "RowKey");
        assert_eq!(descriptor.name_changes().wire_name("Area"), "Area");
    }

    #[test]
    fn test_to_entity() {
        let entity = build().to_entity(&spain()).unwrap();
        assert_eq!(entity.partition_key, "Europe");
        assert_eq!(entity.row_key, "Spain");
        assert_eq!(entity.etag.as_deref(), Some("W/\"1\""));
        assert_eq!(entity.timestamp, None);
        assert_eq!(entity.property("Exists"), Some(&EntityProperty::Boolean(Some(true))));
        assert!(entity.property("Notes").is_none());
        assert!(entity.property("IsExists").is_none());
    }

    #[test]
    fn test_from_entity_reads_timestamp() {
        let descriptor = build();
        let mut entity = descriptor.to_entity(&spain()).unwrap();
        let stamp = "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        entity.timestamp = Some(stamp);

        let back = descriptor.from_entity(&entity).unwrap();
        assert_eq!(back.updated, stamp);
        assert_eq!(back.name, "Spain");
        assert_eq!(back.notes, "");
    }

    #[test]
    fn test_row_keyed_by_field_names() {
        let row = build().to_row(&spain()).unwrap();
        assert_eq!(row.member("Name"), Some(&Value::from("Spain")));
        assert_eq!(row.member("IsExists"), Some(&Value::Bool(true)));
        assert_eq!(row.member("Notes"), None);
    }

    #[derive(Default)]
    struct Doubled {
        a: String,
    }

    impl TableRecord for Doubled {
        fn type_name() -> &'static str {
            "Doubled"
        }

        fn fields() -> Vec<FieldDef<Self>> {
            let field = |name| {
                FieldDef::new(name, FieldType::String, |d: &Doubled| d.a.clone().into(), |d: &mut Doubled, v| {
                    d.a = v.try_into()?;
                    Ok(())
                })
            };
            vec![field("A").partition_key(), field("B").partition_key()]
        }
    }

    #[test]
    fn test_duplicate_partition_key_rejected() {
        let err = RecordTypeDescriptor::<Doubled>::build(None, &MappingConfig::default()).unwrap_err();
        assert_eq!(err.code(), "TABLE_MAPPING_DUPLICATE_ROLE");
        assert!(err.to_string().contains("'A' and 'B'"));
    }

    #[derive(Default)]
    struct Conventional {
        partition: String,
        row: String,
    }

    impl TableRecord for Conventional {
        fn type_name() -> &'static str {
            "Conventional"
        }

        fn fields() -> Vec<FieldDef<Self>> {
            vec![
                FieldDef::new(
                    "PartitionKey",
                    FieldType::String,
                    |c: &Conventional| c.partition.clone().into(),
                    |c: &mut Conventional, v| {
                        c.partition = v.try_into()?;
                        Ok(())
                    },
                ),
                FieldDef::new(
                    "RowKey",
                    FieldType::String,
                    |c: &Conventional| c.row.clone().into(),
                    |c: &mut Conventional, v| {
                        c.row = v.try_into()?;
                        Ok(())
                    },
                ),
            ]
        }
    }

    #[test]
    fn test_convention_fallback() {
        let descriptor =
            RecordTypeDescriptor::<Conventional>::build(None, &MappingConfig::default()).unwrap();
        assert_eq!(descriptor.partition_key_field(), Some("PartitionKey"));
        assert_eq!(descriptor.row_key_field(), Some("RowKey"));
        assert!(descriptor.name_changes().is_empty());

        let err = RecordTypeDescriptor::<Conventional>::build(None, &MappingConfig::strict()).unwrap_err();
        assert!(matches!(err, MappingError::MissingKey { .. }));
    }

    #[test]
    fn test_registered_mapping_classifies_unmarked_fields() {
        let mapping = NameChanges::new()
            .with("PartitionKey", PARTITION_KEY)
            .unwrap()
            .with("RowKey", "Label")
            .unwrap();
        let descriptor =
            RecordTypeDescriptor::<Conventional>::build(Some(&mapping), &MappingConfig::default()).unwrap();
        assert_eq!(descriptor.row_key_field(), None);
        assert_eq!(descriptor.role_of("RowKey"), Some(&FieldRole::Named("Label".into())));
    }
}
