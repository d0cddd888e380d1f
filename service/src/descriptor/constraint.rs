//! Constraint descriptors
//!
//! A [`ConstraintDescriptor`] is one constraint declaration after metadata
//! building: parameters validated, groups normalized, composing constraints
//! resolved and the leaf validator initialized. Descriptors are immutable and
//! shared behind [`Arc`].

use graphguard_core::{ConstraintValidator, DEFAULT_GROUP, ElementKind};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::groups::Group;

/// Constraint parameters by name
pub type Parameters = IndexMap<String, serde_json::Value>;

static NEXT_CONSTRAINT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a constraint declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl ConstraintId {
    fn next() -> Self {
        Self(NEXT_CONSTRAINT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A fully built constraint declaration
pub struct ConstraintDescriptor {
    id: ConstraintId,
    kind: String,
    params: Parameters,
    groups: Vec<String>,
    message_template: String,
    declaring_type: String,
    element_kind: ElementKind,
    composing: Vec<Arc<ConstraintDescriptor>>,
    report_as_single_violation: bool,
    validator: Option<Arc<dyn ConstraintValidator>>,
}

impl ConstraintDescriptor {
    /// Start building a descriptor of the given kind
    #[must_use]
    pub fn builder(kind: impl Into<String>) -> ConstraintDescriptorBuilder {
        ConstraintDescriptorBuilder::new(kind)
    }

    /// Identity of this declaration
    #[must_use]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// Constraint kind
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Parameters, including defaults for those not declared
    #[must_use]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Groups activating this constraint (never empty)
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Message template used for violations
    #[must_use]
    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Type on which the constraint was declared
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Kind of element the constraint is attached to
    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        self.element_kind
    }

    /// Constraints this one is composed of
    #[must_use]
    pub fn composing_constraints(&self) -> &[Arc<ConstraintDescriptor>] {
        &self.composing
    }

    /// Whether failing composing constraints collapse into one violation
    #[must_use]
    pub fn report_as_single_violation(&self) -> bool {
        self.report_as_single_violation
    }

    /// Leaf validator; `None` for pure compositions
    #[must_use]
    pub fn validator(&self) -> Option<&Arc<dyn ConstraintValidator>> {
        self.validator.as_ref()
    }

    /// Whether the constraint's groups intersect the active group's members
    #[must_use]
    pub fn is_active_for(&self, group: &Group) -> bool {
        self.groups.iter().any(|g| group.includes(g))
    }
}

impl fmt::Debug for ConstraintDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("groups", &self.groups)
            .field("declaring_type", &self.declaring_type)
            .field("element_kind", &self.element_kind)
            .field("composing", &self.composing)
            .field("report_as_single_violation", &self.report_as_single_violation)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConstraintDescriptor`]
pub struct ConstraintDescriptorBuilder {
    kind: String,
    params: Parameters,
    groups: Vec<String>,
    message_template: Option<String>,
    declaring_type: String,
    element_kind: ElementKind,
    composing: Vec<Arc<ConstraintDescriptor>>,
    report_as_single_violation: bool,
    validator: Option<Arc<dyn ConstraintValidator>>,
}

impl ConstraintDescriptorBuilder {
    fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Parameters::new(),
            groups: Vec::new(),
            message_template: None,
            declaring_type: String::new(),
            element_kind: ElementKind::Property,
            composing: Vec::new(),
            report_as_single_violation: false,
            validator: None,
        }
    }

    /// Set the parameters
    #[must_use]
    pub fn params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    /// Set the groups; an empty list means the default group
    #[must_use]
    pub fn groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Set the message template
    #[must_use]
    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = Some(template.into());
        self
    }

    /// Set the declaring type
    #[must_use]
    pub fn declared_on(mut self, type_name: impl Into<String>, element_kind: ElementKind) -> Self {
        self.declaring_type = type_name.into();
        self.element_kind = element_kind;
        self
    }

    /// Add a composing constraint
    #[must_use]
    pub fn composed_of(mut self, child: Arc<ConstraintDescriptor>) -> Self {
        self.composing.push(child);
        self
    }

    /// Collapse failing children into a single violation
    #[must_use]
    pub fn report_as_single_violation(mut self, single: bool) -> Self {
        self.report_as_single_violation = single;
        self
    }

    /// Set the initialized leaf validator
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn ConstraintValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Finish the descriptor and assign it a fresh id
    #[must_use]
    pub fn build(self) -> ConstraintDescriptor {
        let groups = if self.groups.is_empty() {
            vec![DEFAULT_GROUP.to_string()]
        } else {
            self.groups
        };
        let message_template = self
            .message_template
            .unwrap_or_else(|| format!("must satisfy {}", self.kind));
        ConstraintDescriptor {
            id: ConstraintId::next(),
            kind: self.kind,
            params: self.params,
            groups,
            message_template,
            declaring_type: self.declaring_type,
            element_kind: self.element_kind,
            composing: self.composing,
            report_as_single_violation: self.report_as_single_violation,
            validator: self.validator,
        }
    }
}
