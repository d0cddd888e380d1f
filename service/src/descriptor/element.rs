//! Bean, property and executable descriptors

use super::cascading::CascadingMetaData;
use super::constraint::ConstraintDescriptor;
use indexmap::IndexMap;
use std::sync::Arc;

/// Constraints grouped by kind, in declaration order
///
/// A kind may repeat, so each entry is a list.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    by_kind: IndexMap<String, Vec<Arc<ConstraintDescriptor>>>,
}

impl ConstraintSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor under its kind
    pub fn insert(&mut self, descriptor: Arc<ConstraintDescriptor>) {
        self.by_kind
            .entry(descriptor.kind().to_string())
            .or_default()
            .push(descriptor);
    }

    /// Descriptors of one kind
    #[must_use]
    pub fn get(&self, kind: &str) -> &[Arc<ConstraintDescriptor>] {
        self.by_kind.get(kind).map_or(&[], Vec::as_slice)
    }

    /// Declared kinds in first-declaration order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(String::as_str)
    }

    /// Every descriptor, grouped by kind
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConstraintDescriptor>> {
        self.by_kind.values().flatten()
    }

    /// Total number of descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    /// Whether no constraint is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

impl FromIterator<Arc<ConstraintDescriptor>> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = Arc<ConstraintDescriptor>>>(iter: T) -> Self {
        let mut set = Self::new();
        for descriptor in iter {
            set.insert(descriptor);
        }
        set
    }
}

/// Aggregated metadata of one property across the type hierarchy
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    type_name: String,
    constraints: ConstraintSet,
    cascading: CascadingMetaData,
}

impl PropertyDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        constraints: ConstraintSet,
        cascading: CascadingMetaData,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            constraints,
            cascading,
        }
    }

    /// Property name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type (rendered)
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Constraints on the property value
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Cascading of the property value
    #[must_use]
    pub fn cascading(&self) -> &CascadingMetaData {
        &self.cascading
    }

    /// Whether the property has anything to validate
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty() || self.cascading.is_marked_for_traversal()
    }
}

/// Aggregated metadata of one method parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    index: usize,
    name: String,
    constraints: ConstraintSet,
    cascading: CascadingMetaData,
}

impl ParameterDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(
        index: usize,
        name: impl Into<String>,
        constraints: ConstraintSet,
        cascading: CascadingMetaData,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            constraints,
            cascading,
        }
    }

    /// Position in the parameter list
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parameter name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constraints on the argument
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Cascading of the argument
    #[must_use]
    pub fn cascading(&self) -> &CascadingMetaData {
        &self.cascading
    }
}

/// Aggregated metadata of a method's return value
#[derive(Debug, Clone)]
pub struct ReturnValueDescriptor {
    constraints: ConstraintSet,
    cascading: CascadingMetaData,
}

impl ReturnValueDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(constraints: ConstraintSet, cascading: CascadingMetaData) -> Self {
        Self {
            constraints,
            cascading,
        }
    }

    /// Constraints on the returned value
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Cascading of the returned value
    #[must_use]
    pub fn cascading(&self) -> &CascadingMetaData {
        &self.cascading
    }
}

/// Aggregated metadata of one method, keyed by signature in its bean
#[derive(Debug, Clone)]
pub struct ExecutableDescriptor {
    name: String,
    signature: String,
    parameters: Vec<ParameterDescriptor>,
    return_value: Option<ReturnValueDescriptor>,
}

impl ExecutableDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        return_value: Option<ReturnValueDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            parameters,
            return_value,
        }
    }

    /// Method name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Erased signature
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Parameters in order
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Return value, absent for methods returning nothing
    #[must_use]
    pub fn return_value(&self) -> Option<&ReturnValueDescriptor> {
        self.return_value.as_ref()
    }
}

/// Validation metadata of a type, aggregated over its whole hierarchy
#[derive(Debug, Clone)]
pub struct BeanDescriptor {
    type_name: String,
    class_constraints: ConstraintSet,
    properties: IndexMap<String, PropertyDescriptor>,
    executables: IndexMap<String, ExecutableDescriptor>,
    default_group_sequence: Option<Vec<String>>,
}

impl BeanDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(
        type_name: impl Into<String>,
        class_constraints: ConstraintSet,
        properties: IndexMap<String, PropertyDescriptor>,
        executables: IndexMap<String, ExecutableDescriptor>,
        default_group_sequence: Option<Vec<String>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            class_constraints,
            properties,
            executables,
            default_group_sequence,
        }
    }

    /// Described type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Constraints evaluated against the object itself
    #[must_use]
    pub fn class_constraints(&self) -> &ConstraintSet {
        &self.class_constraints
    }

    /// Properties, inherited ones first
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Look up a property
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Properties carrying constraints or cascades
    pub fn constrained_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values().filter(|p| p.is_constrained())
    }

    /// Methods by signature
    pub fn executables(&self) -> impl Iterator<Item = &ExecutableDescriptor> {
        self.executables.values()
    }

    /// Look up a method by signature
    #[must_use]
    pub fn executable(&self, signature: &str) -> Option<&ExecutableDescriptor> {
        self.executables.get(signature)
    }

    /// Redefined default group sequence, if the type declares one
    #[must_use]
    pub fn default_group_sequence(&self) -> Option<&[String]> {
        self.default_group_sequence.as_deref()
    }

    /// Whether validating an instance can produce anything at all
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        !self.class_constraints.is_empty() || self.properties.values().any(PropertyDescriptor::is_constrained)
    }
}
