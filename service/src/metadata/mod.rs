//! Metadata aggregation and caching
//!
//! [`MetadataManager`] builds one [`BeanDescriptor`] per type and keeps it
//! for the manager's lifetime. Concurrent callers asking for the same type
//! share a single build.

mod builder;
pub mod override_check;

pub use override_check::{
    CascadeConsistencyCheck, MethodOverrideCheck, OverriddenMethod, ParameterConstraintsCheck,
    find_overridden_methods,
};

use crate::descriptor::BeanDescriptor;
use crate::validator::validators::ValidatorRegistry;
use builder::DescriptorBuilder;
use dashmap::DashMap;
use graphguard_core::config::MetadataConfig;
use graphguard_core::{BuildError, ModelDefinition};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

type DescriptorCell = Arc<OnceCell<Arc<BeanDescriptor>>>;

/// Builds and caches bean descriptors for the types of one model
pub struct MetadataManager {
    model: Arc<ModelDefinition>,
    registry: ValidatorRegistry,
    config: MetadataConfig,
    checks: Vec<Box<dyn MethodOverrideCheck>>,
    cache: DashMap<String, DescriptorCell>,
    builds: AtomicUsize,
}

impl MetadataManager {
    /// Create a manager with the default override checks
    #[must_use]
    pub fn new(model: Arc<ModelDefinition>, registry: ValidatorRegistry, config: MetadataConfig) -> Self {
        Self {
            model,
            registry,
            config,
            checks: override_check::default_checks(),
            cache: DashMap::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Replace the override checks
    #[must_use]
    pub fn with_checks(mut self, checks: Vec<Box<dyn MethodOverrideCheck>>) -> Self {
        self.checks = checks;
        self
    }

    /// The model descriptors are built from
    #[must_use]
    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    /// The validator registry
    #[must_use]
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Descriptor of `type_name`, built on first request
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] that prevented the descriptor from being
    /// built. Failed builds are not cached; the next request retries.
    pub fn bean_descriptor(&self, type_name: &str) -> Result<Arc<BeanDescriptor>, BuildError> {
        if let Some(cell) = self.cache.get(type_name)
            && let Some(descriptor) = cell.get()
        {
            return Ok(Arc::clone(descriptor));
        }

        // Clone the cell out so no map shard stays locked during the build.
        let cell = Arc::clone(self.cache.entry(type_name.to_string()).or_default().value());
        cell.get_or_try_init(|| self.build(type_name)).map(Arc::clone)
    }

    fn build(&self, type_name: &str) -> Result<Arc<BeanDescriptor>, BuildError> {
        let started = Instant::now();
        let descriptor = DescriptorBuilder::new(&self.model, &self.registry, &self.config, &self.checks)
            .build(type_name)?;
        self.builds.fetch_add(1, Ordering::Relaxed);

        let elapsed = started.elapsed();
        if elapsed > self.config.slow_build_threshold {
            warn!(type_name, elapsed = ?elapsed, "slow descriptor build");
        }
        debug!(
            type_name,
            properties = descriptor.properties().count(),
            executables = descriptor.executables().count(),
            elapsed = ?elapsed,
            "built bean descriptor"
        );
        Ok(Arc::new(descriptor))
    }

    /// Build every declared type up front
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] encountered.
    pub fn preload(&self) -> Result<usize, BuildError> {
        for name in self.model.types.keys() {
            self.bean_descriptor(name)?;
        }
        Ok(self.model.types.len())
    }

    /// Number of descriptors built so far
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of types with a cached descriptor
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    /// Drop every cached descriptor
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for MetadataManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataManager")
            .field("model", &self.model.name)
            .field("cached_types", &self.cached_types())
            .field("builds", &self.build_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphguard_core::types::{ConstraintAnnotation, PropertyDefinition, TypeDefinition};
    use rayon::prelude::*;

    fn manager() -> MetadataManager {
        let model = ModelDefinition::new("cars")
            .with_type(TypeDefinition::class("Car").property(
                "plate",
                PropertyDefinition::new("String").constrained(ConstraintAnnotation::new("NotNull")),
            ))
            .with_type(TypeDefinition::class("Broken").extends("Ghost"));
        MetadataManager::new(Arc::new(model), ValidatorRegistry::default(), MetadataConfig::default())
    }

    #[test]
    fn test_descriptor_is_built_once_and_shared() -> Result<(), BuildError> {
        let manager = manager();
        let first = manager.bean_descriptor("Car")?;
        let second = manager.bean_descriptor("Car")?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.build_count(), 1);
        assert_eq!(manager.cached_types(), 1);
        Ok(())
    }

    #[test]
    fn test_concurrent_requests_build_once() {
        let manager = manager();
        let results: Vec<_> = (0..32)
            .into_par_iter()
            .map(|_| manager.bean_descriptor("Car"))
            .collect();
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(manager.build_count(), 1);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let manager = manager();
        assert_eq!(
            manager.bean_descriptor("Broken").err(),
            Some(BuildError::UnknownType("Ghost".into()))
        );
        assert!(manager.bean_descriptor("Broken").is_err());
        assert_eq!(manager.cached_types(), 0);
        assert!(manager.preload().is_err());
    }

    #[test]
    fn test_clear_forces_rebuild() -> Result<(), BuildError> {
        let manager = manager();
        manager.bean_descriptor("Car")?;
        manager.clear();
        manager.bean_descriptor("Car")?;
        assert_eq!(manager.build_count(), 2);
        Ok(())
    }
}
