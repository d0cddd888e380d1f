//! Async service facade
//!
//! Validation is CPU-bound and synchronous. [`ValidationServiceImpl`] runs it
//! on tokio's blocking pool so async callers never stall their executor, and
//! swaps in a new engine when the model is reloaded.

use async_trait::async_trait;
use graphguard_core::error::{GraphGuardError, Result};
use graphguard_core::{GraphGuardConfig, ModelDefinition, ObjectAccess, ObjectId};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::info;

use crate::descriptor::BeanDescriptor;
use crate::parser::Parser;
use crate::validator::{ValidationEngine, ValidationReport};

/// Object graph shared with a blocking validation task
pub type SharedAccess = Arc<dyn ObjectAccess>;

/// Async validation operations
///
/// This trait is dyn-compatible and can be used as
/// `Arc<dyn ValidationService>`.
#[async_trait]
pub trait ValidationService: Send + Sync {
    /// Validate the graph reachable from `root`
    async fn validate(&self, access: SharedAccess, root: ObjectId, groups: Vec<String>) -> Result<ValidationReport>;

    /// Validate one property of `object`, without cascading
    async fn validate_property(
        &self,
        access: SharedAccess,
        object: ObjectId,
        property: String,
        groups: Vec<String>,
    ) -> Result<ValidationReport>;

    /// Validate many roots in parallel
    async fn validate_batch(
        &self,
        access: SharedAccess,
        roots: Vec<ObjectId>,
        groups: Vec<String>,
    ) -> Result<Vec<Result<ValidationReport>>>;

    /// Descriptor of a type
    async fn bean_descriptor(&self, type_name: &str) -> Result<Arc<BeanDescriptor>>;
}

/// Main validation service implementation
pub struct ValidationServiceImpl {
    config: GraphGuardConfig,
    engine: RwLock<Arc<ValidationEngine>>,
    model_path: Option<PathBuf>,
}

impl ValidationServiceImpl {
    /// Create a service for a model
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be built for `model`
    pub fn new(model: ModelDefinition, config: GraphGuardConfig) -> Result<Self> {
        let engine = ValidationEngine::builder(model).config(config.clone()).build()?;
        Ok(Self {
            config,
            engine: RwLock::new(Arc::new(engine)),
            model_path: None,
        })
    }

    /// Create a service for a model file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the engine cannot be
    /// built
    pub fn from_file(path: &Path, config: GraphGuardConfig) -> Result<Self> {
        let model = Parser::new().parse_file(path)?;
        let mut service = Self::new(model, config)?;
        service.model_path = Some(path.to_path_buf());
        Ok(service)
    }

    /// The engine serving calls right now
    #[must_use]
    pub fn engine(&self) -> Arc<ValidationEngine> {
        Arc::clone(&self.engine.read())
    }

    /// Replace the model; in-flight calls finish on the previous engine
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be built for `model`; the
    /// current engine stays in place
    pub fn reload(&self, model: ModelDefinition) -> Result<()> {
        let name = model.name.clone();
        let engine = ValidationEngine::builder(model).config(self.config.clone()).build()?;
        *self.engine.write() = Arc::new(engine);
        info!(model = %name, "validation model reloaded");
        Ok(())
    }

    /// Re-read the model file the service was created from
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the service was not created from a
    /// file, otherwise as [`ValidationServiceImpl::reload`]
    pub async fn reload_from_file(&self) -> Result<()> {
        let path = self
            .model_path
            .clone()
            .ok_or_else(|| GraphGuardError::config("service was not created from a model file"))?;
        let model = tokio::task::spawn_blocking(move || Parser::new().parse_file(&path))
            .await
            .map_err(join_error)??;
        self.reload(model)
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ValidationEngine) -> T + Send + 'static,
    {
        let engine = self.engine();
        tokio::task::spawn_blocking(move || job(engine.as_ref()))
            .await
            .map_err(join_error)
    }
}

fn join_error(e: JoinError) -> GraphGuardError {
    GraphGuardError::service(format!("validation task failed: {e}"))
}

#[async_trait]
impl ValidationService for ValidationServiceImpl {
    async fn validate(&self, access: SharedAccess, root: ObjectId, groups: Vec<String>) -> Result<ValidationReport> {
        self.run(move |engine| engine.validate(access.as_ref(), root, &groups)).await?
    }

    async fn validate_property(
        &self,
        access: SharedAccess,
        object: ObjectId,
        property: String,
        groups: Vec<String>,
    ) -> Result<ValidationReport> {
        self.run(move |engine| engine.validate_property(access.as_ref(), object, &property, &groups))
            .await?
    }

    async fn validate_batch(
        &self,
        access: SharedAccess,
        roots: Vec<ObjectId>,
        groups: Vec<String>,
    ) -> Result<Vec<Result<ValidationReport>>> {
        self.run(move |engine| engine.validate_batch(access.as_ref(), &roots, &groups))
            .await
    }

    async fn bean_descriptor(&self, type_name: &str) -> Result<Arc<BeanDescriptor>> {
        let type_name = type_name.to_string();
        self.run(move |engine| engine.bean_descriptor(&type_name)).await?
    }
}

impl std::fmt::Debug for ValidationServiceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationServiceImpl")
            .field("model_path", &self.model_path)
            .field("engine", &self.engine.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphguard_core::types::{ConstraintAnnotation, PropertyDefinition, TypeDefinition};
    use graphguard_core::ObjectGraph;

    fn model(kind: &str) -> ModelDefinition {
        ModelDefinition::new("cars").with_type(
            TypeDefinition::class("Car")
                .property("plate", PropertyDefinition::new("String").constrained(ConstraintAnnotation::new(kind))),
        )
    }

    #[tokio::test]
    async fn test_validate_on_blocking_pool() -> Result<()> {
        let service = ValidationServiceImpl::new(model("NotNull"), GraphGuardConfig::default())?;
        let mut graph = ObjectGraph::new();
        let car = graph.insert("Car");
        let access: SharedAccess = Arc::new(graph);

        let report = service.validate(Arc::clone(&access), car, Vec::new()).await?;
        assert_eq!(report.len(), 1);
        let report = service
            .validate_property(access, car, "plate".into(), vec!["Default".into()])
            .await?;
        assert_eq!(report.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_swaps_engine() -> Result<()> {
        let service = ValidationServiceImpl::new(model("NotNull"), GraphGuardConfig::default())?;
        let mut graph = ObjectGraph::new();
        let car = graph.insert("Car");
        let access: SharedAccess = Arc::new(graph);

        service.reload(model("Null"))?;
        assert!(service.validate(access, car, Vec::new()).await?.is_valid());
        assert!(service.reload(model("Unheard")).is_ok());
        assert!(service.bean_descriptor("Car").await.is_err());
        assert!(service.reload_from_file().await.is_err());
        Ok(())
    }
}
