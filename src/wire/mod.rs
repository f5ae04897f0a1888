//! Wire-level entity model
//!
//! A `WireEntity` is the store's generic row: the two key strings, the
//! system properties and a map of tagged attributes. `TableOperation`
//! wraps an entity with the write or read the store should perform.

mod property;

pub use property::{EntityProperty, PropertyKind};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The store's row representation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEntity {
    pub partition_key: String,
    pub row_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: BTreeMap<String, EntityProperty>,
}

impl WireEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Self::default()
        }
    }

    /// Builder form of inserting a property
    pub fn with(mut self, name: impl Into<String>, property: EntityProperty) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn property(&self, name: &str) -> Option<&EntityProperty> {
        self.properties.get(name)
    }
}

/// One operation against the store
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    Insert(WireEntity),
    InsertOrReplace(WireEntity),
    InsertOrMerge(WireEntity),
    Replace(WireEntity),
    Merge(WireEntity),
    Delete(WireEntity),
    Retrieve { partition_key: String, row_key: String },
}

impl TableOperation {
    /// Operation name as the store spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            TableOperation::Insert(_) => "Insert",
            TableOperation::InsertOrReplace(_) => "InsertOrReplace",
            TableOperation::InsertOrMerge(_) => "InsertOrMerge",
            TableOperation::Replace(_) => "Replace",
            TableOperation::Merge(_) => "Merge",
            TableOperation::Delete(_) => "Delete",
            TableOperation::Retrieve { .. } => "Retrieve",
        }
    }

    pub fn partition_key(&self) -> &str {
        match self {
            TableOperation::Retrieve { partition_key, .. } => partition_key,
            other => other.entity().map(|e| e.partition_key.as_str()).unwrap_or_default(),
        }
    }

    pub fn row_key(&self) -> &str {
        match self {
            TableOperation::Retrieve { row_key, .. } => row_key,
            other => other.entity().map(|e| e.row_key.as_str()).unwrap_or_default(),
        }
    }

    /// Entity carried by write operations
    pub fn entity(&self) -> Option<&WireEntity> {
        match self {
            TableOperation::Insert(e)
            | TableOperation::InsertOrReplace(e)
            | TableOperation::InsertOrMerge(e)
            | TableOperation::Replace(e)
            | TableOperation::Merge(e)
            | TableOperation::Delete(e) => Some(e),
            TableOperation::Retrieve { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_keys() {
        let entity = WireEntity::new("Europe", "Spain");
        let op = TableOperation::InsertOrMerge(entity.clone());
        assert_eq!(op.partition_key(), "Europe");
        assert_eq!(op.row_key(), "Spain");
        assert_eq!(op.as_str(), "InsertOrMerge");

        let retrieve = TableOperation::Retrieve {
            partition_key: "Asia".into(),
            row_key: "Japan".into(),
        };
        assert_eq!(retrieve.partition_key(), "Asia");
        assert!(retrieve.entity().is_none());
    }

    #[test]
    fn test_entity_json_omits_absent_system_properties() {
        let entity = WireEntity::new("Europe", "Spain")
            .with("Area", EntityProperty::Double(Some(505_990.0)));
        let json = serde_json::to_value(&entity).unwrap();
        assert!(json.get("etag").is_none());
        assert_eq!(json["properties"]["Area"]["value"], 505_990.0);

        let back: WireEntity = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }
}
