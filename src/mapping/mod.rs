//! Record mapping
//!
//! Maps typed records to the store's wire entities:
//!
//! - `TableRecord` declares a type's fields, role markers and lenses
//! - `RecordTypeDescriptor` classifies the fields once and compiles one
//!   accessor per field
//! - `DescriptorRegistry` caches descriptors per type
//! - `NameChanges` is the field → wire rename table query translation uses
//!
//! # Usage
//!
//! ```ignore
//! let descriptor = DescriptorRegistry::shared().descriptor::<Country>()?;
//! let entity = descriptor.to_entity(&spain)?;
//! let filter_names = descriptor.name_changes();
//! ```

mod accessor;
mod config;
mod descriptor;
mod errors;
mod name_changes;
mod record;
mod registry;

pub use accessor::{
    coerce, compile_key, compile_nested, compile_property, min_datetime, slot_for, FieldAccessor,
};
pub use config::MappingConfig;
pub use descriptor::RecordTypeDescriptor;
pub use errors::{MappingError, MappingResult};
pub use name_changes::{NameChanges, ETAG, PARTITION_KEY, ROW_KEY, TIMESTAMP};
pub use record::{
    FieldDef, FieldLens, FieldRole, FieldType, JsonSerializer, PayloadSerializer, RoleMarker,
    TableRecord, ValueGetter, ValueSetter,
};
pub use registry::DescriptorRegistry;
