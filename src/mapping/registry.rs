//! Descriptor registry
//!
//! Read-through cache of record type descriptors keyed by type identity.
//! Builds are pure, so two threads racing on a first build both produce
//! an equal descriptor and whichever lands first is published. Failed
//! builds are not cached; every later lookup reports the same error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::config::MappingConfig;
use super::descriptor::RecordTypeDescriptor;
use super::errors::{MappingError, MappingResult};
use super::name_changes::NameChanges;
use super::record::TableRecord;
use crate::observability::{log_event_with_fields, Event};

type Erased = Arc<dyn Any + Send + Sync>;

/// Owns descriptors and per-type mapping registrations
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    config: MappingConfig,
    descriptors: RwLock<HashMap<TypeId, Erased>>,
    mappings: RwLock<HashMap<TypeId, NameChanges>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MappingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Process-wide registry with the default configuration
    pub fn shared() -> &'static DescriptorRegistry {
        static SHARED: OnceLock<DescriptorRegistry> = OnceLock::new();
        SHARED.get_or_init(DescriptorRegistry::new)
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Registers an external name-change table for `R`.
    ///
    /// Must happen before the first descriptor lookup for `R`.
    pub fn register_mapping<R: TableRecord>(&self, mapping: NameChanges) -> MappingResult<()> {
        let id = TypeId::of::<R>();
        // Lock order is mappings, then descriptors, in both paths
        let mut mappings = self.mappings.write().unwrap_or_else(PoisonError::into_inner);
        if self.read_descriptors().contains_key(&id) {
            return Err(MappingError::invalid_argument(format!(
                "mapping for {} registered after its descriptor was built",
                R::type_name()
            )));
        }
        mappings.insert(id, mapping);
        Ok(())
    }

    /// Descriptor for `R`, built on first use
    pub fn descriptor<R: TableRecord>(&self) -> MappingResult<Arc<RecordTypeDescriptor<R>>> {
        let id = TypeId::of::<R>();
        if let Some(cached) = self.read_descriptors().get(&id).cloned() {
            return downcast::<R>(cached);
        }

        // Held until the descriptor is published so a registration cannot
        // slip in between the build and the cache insert
        let mappings = self.mappings.read().unwrap_or_else(PoisonError::into_inner);
        let mapping = mappings.get(&id);

        let built = match RecordTypeDescriptor::<R>::build(mapping, &self.config) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DescriptorRejected,
                    &[
                        ("code", err.code()),
                        ("reason", reason.as_str()),
                        ("type", R::type_name()),
                    ],
                );
                return Err(err);
            }
        };

        let published = {
            let mut descriptors = self
                .descriptors
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let fresh = !descriptors.contains_key(&id);
            let entry = descriptors
                .entry(id)
                .or_insert_with(|| Arc::new(built) as Erased)
                .clone();
            (entry, fresh)
        };
        drop(mappings);

        let (entry, fresh) = published;
        if fresh {
            let fields = R::fields().len().to_string();
            log_event_with_fields(
                Event::DescriptorBuilt,
                &[("fields", fields.as_str()), ("type", R::type_name())],
            );
        }
        downcast::<R>(entry)
    }

    /// True when `R`'s descriptor has been built and cached
    pub fn is_cached<R: TableRecord>(&self) -> bool {
        self.read_descriptors().contains_key(&TypeId::of::<R>())
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.read_descriptors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_descriptors(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Erased>> {
        self.descriptors.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<R: TableRecord>(erased: Erased) -> MappingResult<Arc<RecordTypeDescriptor<R>>> {
    erased.downcast::<RecordTypeDescriptor<R>>().map_err(|_| {
        MappingError::invalid_argument(format!(
            "cached descriptor for {} has a different type",
            R::type_name()
        ))
    })
}
