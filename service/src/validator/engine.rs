//! Main validation engine
//!
//! Walks an object graph under a resolved group chain. For each object the
//! engine first evaluates the constraints of the object, its properties and
//! their container elements, then cascades into every value marked for
//! traversal. An (object, group) pair is validated at most once per call,
//! which makes the walk terminate on reference cycles.

use super::container;
use super::context::ValidationContext;
use super::report::{ConstraintViolation, ValidationReport};
use super::validators::{ConstraintValidatorFactory, ValidatorRegistry};
use crate::cascadable::Cascadable;
use crate::descriptor::{
    BeanDescriptor, CascadingMetaData, ConstraintDescriptor, ConstraintSet,
    ContainerElementDescriptor, ExecutableDescriptor,
};
use crate::groups::{Group, GroupChain, GroupResolver};
use crate::metadata::{MetadataManager, MethodOverrideCheck};
use graphguard_core::config::ValidationConfig;
use graphguard_core::{
    AccessError, ConstraintValidatorContext, DEFAULT_GROUP, GraphGuardConfig, ModelDefinition,
    ObjectAccess, ObjectId, PathNode, Result, Value, ValidatorError,
};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-call overrides of the engine's [`ValidationConfig`]
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Stop the call after the first violation
    pub fail_fast: Option<bool>,
    /// Maximum cascade depth
    pub max_depth: Option<usize>,
}

impl ValidationOptions {
    /// Apply the overrides to `config`
    #[must_use]
    pub fn merge_with(&self, config: &ValidationConfig) -> ValidationConfig {
        ValidationConfig {
            fail_fast: self.fail_fast.unwrap_or(config.fail_fast),
            max_cascade_depth: self.max_depth.unwrap_or(config.max_cascade_depth),
            default_group: config.default_group.clone(),
        }
    }
}

/// Builder for [`ValidationEngine`]
pub struct ValidationEngineBuilder {
    model: Arc<ModelDefinition>,
    config: GraphGuardConfig,
    registry: Option<ValidatorRegistry>,
    checks: Option<Vec<Box<dyn MethodOverrideCheck>>>,
}

impl ValidationEngineBuilder {
    /// Use this configuration
    #[must_use]
    pub fn config(mut self, config: GraphGuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this validator registry instead of the built-in one
    #[must_use]
    pub fn registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a validator factory for a constraint kind, on top of the
    /// built-in ones unless a registry was supplied
    #[must_use]
    pub fn validator(mut self, kind: impl Into<String>, factory: impl ConstraintValidatorFactory + 'static) -> Self {
        self.registry
            .get_or_insert_with(|| ValidatorRegistry::with_builtins(&self.config.metadata))
            .register(kind, factory);
        self
    }

    /// Replace the method override checks
    #[must_use]
    pub fn override_checks(mut self, checks: Vec<Box<dyn MethodOverrideCheck>>) -> Self {
        self.checks = Some(checks);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or a build error
    /// when the model's group definitions are inconsistent.
    pub fn build(self) -> Result<ValidationEngine> {
        self.config.validate()?;
        let groups = GroupResolver::new(&self.model)?;
        let registry = self
            .registry
            .unwrap_or_else(|| ValidatorRegistry::with_builtins(&self.config.metadata));
        let mut metadata = MetadataManager::new(Arc::clone(&self.model), registry, self.config.metadata.clone());
        if let Some(checks) = self.checks {
            metadata = metadata.with_checks(checks);
        }
        debug!(
            model = %self.model.name,
            types = self.model.types.len(),
            groups = self.model.groups.len(),
            "validation engine ready"
        );
        Ok(ValidationEngine {
            metadata,
            groups,
            config: self.config.validation,
        })
    }
}

/// Main validation engine
#[derive(Debug)]
pub struct ValidationEngine {
    metadata: MetadataManager,
    groups: GroupResolver,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Start building an engine for `model`
    #[must_use]
    pub fn builder(model: impl Into<Arc<ModelDefinition>>) -> ValidationEngineBuilder {
        ValidationEngineBuilder {
            model: model.into(),
            config: GraphGuardConfig::default(),
            registry: None,
            checks: None,
        }
    }

    /// Create an engine with the default configuration and built-in
    /// validators
    ///
    /// # Errors
    ///
    /// Returns a build error when the model's group definitions are
    /// inconsistent.
    pub fn new(model: ModelDefinition) -> Result<Self> {
        Self::builder(model).build()
    }

    /// The descriptor cache
    #[must_use]
    pub fn metadata(&self) -> &MetadataManager {
        &self.metadata
    }

    /// Traversal configuration
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Descriptor of a type, built on first use and cached
    ///
    /// # Errors
    ///
    /// Returns the build error that prevented the descriptor from being
    /// built.
    pub fn bean_descriptor(&self, type_name: &str) -> Result<Arc<BeanDescriptor>> {
        Ok(self.metadata.bean_descriptor(type_name)?)
    }

    /// Resolve requested groups, as a call rooted at `root_type` would
    ///
    /// # Errors
    ///
    /// Returns a build error for undeclared groups.
    pub fn resolve_groups<S: AsRef<str>>(&self, groups: &[S], root_type: Option<&str>) -> Result<GroupChain> {
        let chain = if groups.is_empty() {
            self.groups.resolve(&[self.config.default_group.as_str()], root_type)?
        } else {
            self.groups.resolve(groups, root_type)?
        };
        Ok(chain)
    }

    /// Validate the graph reachable from `root`
    ///
    /// # Errors
    ///
    /// Metadata, access and validator failures abort the call. Constraint
    /// failures are reported as violations.
    pub fn validate<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        root: ObjectId,
        groups: &[S],
    ) -> Result<ValidationReport> {
        self.validate_with(access, root, groups, &ValidationOptions::default())
    }

    /// Validate with per-call overrides
    ///
    /// # Errors
    ///
    /// As [`ValidationEngine::validate`].
    pub fn validate_with<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        root: ObjectId,
        groups: &[S],
        options: &ValidationOptions,
    ) -> Result<ValidationReport> {
        let root_type = access.type_of(root)?.to_string();
        let descriptor = self.metadata.bean_descriptor(&root_type)?;
        let chain = self.resolve_groups(groups, Some(&root_type))?;
        debug!(root = %root, root_type = %root_type, groups = ?chain.group_names(), "validating object graph");

        let config = options.merge_with(&self.config);
        let mut ctx = ValidationContext::new(Value::Object(root), root_type, &config);
        self.run_chain(&chain, &mut ctx, |ctx, group| {
            if ctx.mark_visited(root, group.name()) {
                self.validate_bean(access, root, &descriptor, group, ctx)
            } else {
                Ok(())
            }
        })?;
        Ok(ctx.into_report())
    }

    /// Validate many roots in parallel, each in its own call
    pub fn validate_batch<S: AsRef<str> + Sync>(
        &self,
        access: &dyn ObjectAccess,
        roots: &[ObjectId],
        groups: &[S],
    ) -> Vec<Result<ValidationReport>> {
        roots
            .par_iter()
            .map(|root| self.validate(access, *root, groups))
            .collect()
    }

    /// Validate one property of `object` without cascading
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingProperty`] if the object's type declares
    /// no such property, otherwise as [`ValidationEngine::validate`].
    pub fn validate_property<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
        property: &str,
        groups: &[S],
    ) -> Result<ValidationReport> {
        let type_name = access.type_of(object)?.to_string();
        let descriptor = self.metadata.bean_descriptor(&type_name)?;
        let property_descriptor = descriptor
            .property(property)
            .ok_or_else(|| AccessError::MissingProperty {
                type_name: type_name.clone(),
                property: property.to_string(),
            })?;
        let chain = self.resolve_groups(groups, Some(&type_name))?;

        let parent = Value::Object(object);
        let mut ctx = ValidationContext::new(parent.clone(), type_name, &self.config);
        self.run_chain(&chain, &mut ctx, |ctx, group| {
            let cascadable = Cascadable::Property(property_descriptor);
            let value = cascadable.value_from(&parent, access)?;
            ctx.with_node(cascadable.path_node(), |ctx| {
                self.validate_element(access, cascadable, &value, Some(object), group, ctx)
            })
        })?;
        Ok(ctx.into_report())
    }

    /// Validate a candidate value for a property of `type_name` without an
    /// instance
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingProperty`] if the type declares no such
    /// property, otherwise as [`ValidationEngine::validate`].
    pub fn validate_value<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        type_name: &str,
        property: &str,
        value: &Value,
        groups: &[S],
    ) -> Result<ValidationReport> {
        let descriptor = self.metadata.bean_descriptor(type_name)?;
        let property_descriptor = descriptor
            .property(property)
            .ok_or_else(|| AccessError::MissingProperty {
                type_name: type_name.to_string(),
                property: property.to_string(),
            })?;
        let chain = self.resolve_groups(groups, Some(type_name))?;

        let mut ctx = ValidationContext::new(Value::Null, type_name, &self.config);
        self.run_chain(&chain, &mut ctx, |ctx, group| {
            let cascadable = Cascadable::Property(property_descriptor);
            ctx.with_node(cascadable.path_node(), |ctx| {
                self.validate_element(access, cascadable, value, None, group, ctx)
            })
        })?;
        Ok(ctx.into_report())
    }

    /// Validate the arguments of a method call on `object`
    ///
    /// Violation paths start with the method name, e.g. `drive.speed`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingMethod`] for an undeclared signature and
    /// [`AccessError::MissingArgument`] when fewer arguments than parameters
    /// are supplied, otherwise as [`ValidationEngine::validate`].
    pub fn validate_parameters<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
        signature: &str,
        args: &[Value],
        groups: &[S],
    ) -> Result<ValidationReport> {
        let type_name = access.type_of(object)?.to_string();
        let descriptor = self.metadata.bean_descriptor(&type_name)?;
        let executable = Self::executable(&descriptor, &type_name, signature)?;
        let parameters = executable.parameters();
        if args.len() < parameters.len() {
            return Err(AccessError::MissingArgument {
                method: signature.to_string(),
                index: args.len(),
            }
            .into());
        }
        if args.len() > parameters.len() {
            return Err(AccessError::IncompatibleParent {
                expected: format!("{} arguments for '{signature}'", parameters.len()),
                found: format!("{} arguments", args.len()),
            }
            .into());
        }
        let chain = self.resolve_groups(groups, Some(&type_name))?;

        let arguments = Value::List(args.to_vec());
        let mut ctx = ValidationContext::new(Value::Object(object), type_name, &self.config);
        self.run_chain(&chain, &mut ctx, |ctx, group| {
            ctx.with_node(PathNode::method(executable.name()), |ctx| {
                let mut values = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    let cascadable = Cascadable::Parameter(parameter);
                    let value = cascadable.value_from(&arguments, access)?;
                    ctx.with_node(cascadable.path_node(), |ctx| {
                        self.validate_element(access, cascadable, &value, Some(object), group, ctx)
                    })?;
                    values.push((cascadable, value));
                }
                for (cascadable, value) in &values {
                    ctx.with_node(cascadable.path_node(), |ctx| {
                        self.cascade(access, cascadable.cascading_metadata(), value, group, ctx)
                    })?;
                }
                Ok(())
            })
        })?;
        Ok(ctx.into_report())
    }

    /// Validate the value returned by a method call on `object`
    ///
    /// Violation paths start with `method.<return value>`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingMethod`] for an undeclared signature,
    /// otherwise as [`ValidationEngine::validate`].
    pub fn validate_return_value<S: AsRef<str>>(
        &self,
        access: &dyn ObjectAccess,
        object: ObjectId,
        signature: &str,
        returned: &Value,
        groups: &[S],
    ) -> Result<ValidationReport> {
        let type_name = access.type_of(object)?.to_string();
        let descriptor = self.metadata.bean_descriptor(&type_name)?;
        let executable = Self::executable(&descriptor, &type_name, signature)?;
        let chain = self.resolve_groups(groups, Some(&type_name))?;

        let mut ctx = ValidationContext::new(Value::Object(object), type_name, &self.config);
        if let Some(return_value) = executable.return_value() {
            self.run_chain(&chain, &mut ctx, |ctx, group| {
                let cascadable = Cascadable::ReturnValue(return_value);
                let value = cascadable.value_from(returned, access)?;
                ctx.with_node(PathNode::method(executable.name()), |ctx| {
                    ctx.with_node(cascadable.path_node(), |ctx| {
                        self.validate_element(access, cascadable, &value, Some(object), group, ctx)?;
                        self.cascade(access, cascadable.cascading_metadata(), &value, group, ctx)
                    })
                })
            })?;
        }
        Ok(ctx.into_report())
    }

    fn executable<'d>(
        descriptor: &'d BeanDescriptor,
        type_name: &str,
        signature: &str,
    ) -> Result<&'d ExecutableDescriptor> {
        Ok(descriptor
            .executable(signature)
            .ok_or_else(|| AccessError::MissingMethod {
                type_name: type_name.to_string(),
                method: signature.to_string(),
            })?)
    }

    /// Run every unit of `chain`; a sequence stops at its first step that
    /// adds violations
    fn run_chain<F>(&self, chain: &GroupChain, ctx: &mut ValidationContext, mut step: F) -> Result<()>
    where
        F: FnMut(&mut ValidationContext, &Group) -> Result<()>,
    {
        for unit in chain.units() {
            ctx.stats_mut().units_executed += 1;
            for group in unit.groups() {
                let before = ctx.violation_count();
                step(ctx, group)?;
                if ctx.should_stop() {
                    return Ok(());
                }
                if unit.is_sequence() && ctx.violation_count() > before {
                    ctx.stats_mut().sequences_short_circuited += 1;
                    debug!(sequence = unit.name(), step = group.name(), "group sequence stopped");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Validate one object for one group: its own constraints first, then
    /// the cascades
    fn validate_bean(
        &self,
        access: &dyn ObjectAccess,
        id: ObjectId,
        descriptor: &BeanDescriptor,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        ctx.descend(|ctx| {
            ctx.stats_mut().beans_validated += 1;
            let object = Value::Object(id);

            ctx.with_node(PathNode::bean(), |ctx| {
                self.validate_constraints(descriptor.class_constraints(), &object, Some(id), group, ctx)
            })?;

            let mut cascades = Vec::new();
            for property in descriptor.constrained_properties() {
                if ctx.should_stop() {
                    return Ok(());
                }
                let cascadable = Cascadable::Property(property);
                let value = cascadable.value_from(&object, access)?;
                ctx.with_node(cascadable.path_node(), |ctx| {
                    self.validate_element(access, cascadable, &value, Some(id), group, ctx)
                })?;
                if property.cascading().has_cascades() && !value.is_null() {
                    cascades.push((cascadable, value));
                }
            }

            for (cascadable, value) in &cascades {
                if ctx.should_stop() {
                    return Ok(());
                }
                ctx.with_node(cascadable.path_node(), |ctx| {
                    self.cascade(access, cascadable.cascading_metadata(), value, group, ctx)
                })?;
            }
            Ok(())
        })
    }

    /// Constraints of a location and of the container elements inside its
    /// value. The location's path node is already pushed.
    fn validate_element(
        &self,
        access: &dyn ObjectAccess,
        cascadable: Cascadable<'_>,
        value: &Value,
        leaf: Option<ObjectId>,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        self.validate_constraints(cascadable.constraints(), value, leaf, group, ctx)?;
        for element_descriptor in cascadable.cascading_metadata().container_elements() {
            if !has_element_constraints(element_descriptor) {
                continue;
            }
            let elements = container::extract(
                element_descriptor.container(),
                element_descriptor.type_argument_index(),
                value,
            )?;
            for element in &elements {
                if ctx.should_stop() {
                    return Ok(());
                }
                let child = Cascadable::ContainerElement(element_descriptor, element);
                let element_value = child.value_from(value, access)?;
                ctx.with_node(child.path_node(), |ctx| {
                    self.validate_element(access, child, &element_value, leaf, group, ctx)
                })?;
            }
        }
        Ok(())
    }

    /// Follow the cascades described by `metadata` into `value`. The path
    /// node of the value is already pushed.
    fn cascade(
        &self,
        access: &dyn ObjectAccess,
        metadata: &CascadingMetaData,
        value: &Value,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if metadata.is_cascading()
            && let Value::Object(id) = value
        {
            self.cascade_bean(access, *id, group, ctx)?;
        }
        for element_descriptor in metadata.container_elements() {
            if !element_descriptor.cascading().has_cascades() {
                continue;
            }
            let elements = container::extract(
                element_descriptor.container(),
                element_descriptor.type_argument_index(),
                value,
            )?;
            for element in &elements {
                if ctx.should_stop() {
                    return Ok(());
                }
                let child = Cascadable::ContainerElement(element_descriptor, element);
                let element_value = child.value_from(value, access)?;
                ctx.with_node(child.path_node(), |ctx| {
                    self.cascade(access, child.cascading_metadata(), &element_value, group, ctx)
                })?;
            }
        }
        Ok(())
    }

    /// Validate a cascaded object. Under the default group, a type that
    /// redefines its default group sequence runs that sequence instead.
    fn cascade_bean(
        &self,
        access: &dyn ObjectAccess,
        id: ObjectId,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        // The runtime type decides which constraints apply.
        let type_name = access.type_of(id)?;
        let steps = if group.name() == DEFAULT_GROUP {
            self.groups.default_sequence(type_name)
        } else {
            None
        };
        let Some(steps) = steps else {
            return self.cascade_bean_in(access, id, type_name, group, ctx);
        };

        for step in &steps {
            let before = ctx.violation_count();
            self.cascade_bean_in(access, id, type_name, step, ctx)?;
            if ctx.should_stop() {
                return Ok(());
            }
            if ctx.violation_count() > before {
                ctx.stats_mut().sequences_short_circuited += 1;
                debug!(sequence = type_name, step = step.name(), path = %ctx.path(), "group sequence stopped");
                break;
            }
        }
        Ok(())
    }

    fn cascade_bean_in(
        &self,
        access: &dyn ObjectAccess,
        id: ObjectId,
        type_name: &str,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        if !ctx.mark_visited(id, group.name()) {
            trace!(object = %id, group = group.name(), path = %ctx.path(), "already validated, skipping");
            ctx.stats_mut().cascades_skipped += 1;
            return Ok(());
        }
        let descriptor = self.metadata.bean_descriptor(type_name)?;
        trace!(object = %id, type_name, group = group.name(), path = %ctx.path(), "cascading");
        self.validate_bean(access, id, &descriptor, group, ctx)
    }

    /// Evaluate the active constraints of a set against `value`
    fn validate_constraints(
        &self,
        constraints: &ConstraintSet,
        value: &Value,
        leaf: Option<ObjectId>,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        for constraint in constraints.iter() {
            if ctx.should_stop() {
                break;
            }
            if !constraint.is_active_for(group) || !ctx.mark_processed(constraint.id(), leaf) {
                continue;
            }
            for violation in Self::evaluate(constraint, value, leaf, group, ctx)? {
                ctx.add_violation(violation);
            }
        }
        Ok(())
    }

    /// Violations of `constraint` and its composing constraints
    fn evaluate(
        constraint: &Arc<ConstraintDescriptor>,
        value: &Value,
        leaf: Option<ObjectId>,
        group: &Group,
        ctx: &mut ValidationContext,
    ) -> Result<Vec<ConstraintViolation>> {
        ctx.stats_mut().constraints_evaluated += 1;

        let valid = match constraint.validator() {
            Some(validator) => {
                let path = ctx.path().to_string();
                let validator_context = ConstraintValidatorContext {
                    path: &path,
                    leaf_object: leaf,
                };
                validator
                    .is_valid(value, &validator_context)
                    .map_err(|source| ValidatorError {
                        constraint: constraint.kind().to_string(),
                        path: path.clone(),
                        source,
                    })?
            }
            None => true,
        };

        let mut composed = Vec::new();
        for child in constraint.composing_constraints() {
            if child.is_active_for(group) {
                composed.extend(Self::evaluate(child, value, leaf, group, ctx)?);
            }
        }

        if constraint.report_as_single_violation() {
            return Ok(if valid && composed.is_empty() {
                Vec::new()
            } else {
                vec![ctx.violation(constraint, value, leaf)]
            });
        }

        let mut violations = Vec::with_capacity(composed.len() + 1);
        if !valid {
            violations.push(ctx.violation(constraint, value, leaf));
        }
        violations.extend(composed);
        Ok(violations)
    }
}

/// Whether a container element or anything nested in it carries constraints
fn has_element_constraints(descriptor: &ContainerElementDescriptor) -> bool {
    !descriptor.constraints().is_empty()
        || descriptor
            .cascading()
            .container_elements()
            .iter()
            .any(|nested| has_element_constraints(nested))
}
