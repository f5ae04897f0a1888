//! Record-field to wire-field renames

use std::collections::BTreeMap;

use super::errors::{MappingError, MappingResult};

/// Wire name of the partition key system property
pub const PARTITION_KEY: &str = "PartitionKey";
/// Wire name of the row key system property
pub const ROW_KEY: &str = "RowKey";
/// Wire name of the timestamp system property
pub const TIMESTAMP: &str = "Timestamp";
/// Wire name of the etag system property
pub const ETAG: &str = "ETag";

/// Mapping from record-field name to wire-field name.
///
/// At most one field maps to `PartitionKey` and at most one to `RowKey`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameChanges {
    renames: BTreeMap<String, String>,
}

impl NameChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rename, rejecting a second field for the same key role
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        wire: impl Into<String>,
    ) -> MappingResult<()> {
        let field = field.into();
        let wire = wire.into();
        if field.is_empty() || wire.is_empty() {
            return Err(MappingError::invalid_argument("rename with an empty name"));
        }

        if wire == PARTITION_KEY || wire == ROW_KEY {
            if let Some(existing) = self.field_for(&wire) {
                if existing != field {
                    return Err(MappingError::invalid_argument(format!(
                        "both '{}' and '{}' map to {}",
                        existing, field, wire
                    )));
                }
            }
        }

        self.renames.insert(field, wire);
        Ok(())
    }

    /// Builder form of `insert`
    pub fn with(mut self, field: impl Into<String>, wire: impl Into<String>) -> MappingResult<Self> {
        self.insert(field, wire)?;
        Ok(self)
    }

    /// Wire name for `field`, falling back to the field's own name
    pub fn wire_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.renames.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Explicit rename for `field`, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.renames.get(field).map(String::as_str)
    }

    /// Record field mapped onto `wire`, if any
    pub fn field_for(&self, wire: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|(_, w)| w.as_str() == wire)
            .map(|(f, _)| f.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renames.iter().map(|(f, w)| (f.as_str(), w.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_fallback() {
        let changes = NameChanges::new().with("Name", ROW_KEY).unwrap();
        assert_eq!(changes.wire_name("Name"), "RowKey");
        assert_eq!(changes.wire_name("Area"), "Area");
    }

    #[test]
    fn test_single_field_per_key_role() {
        let mut changes = NameChanges::new();
        changes.insert("Continent", PARTITION_KEY).unwrap();
        let err = changes.insert("Region", PARTITION_KEY).unwrap_err();
        assert!(err.to_string().contains("PartitionKey"));

        // Re-inserting the same mapping is fine
        changes.insert("Continent", PARTITION_KEY).unwrap();
        assert_eq!(changes.field_for(PARTITION_KEY), Some("Continent"));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(NameChanges::new().with("", "X").is_err());
        assert!(NameChanges::new().with("X", "").is_err());
    }
}
