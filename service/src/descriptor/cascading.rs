//! Cascading metadata and container element descriptors

use super::element::ConstraintSet;
use std::fmt;
use std::sync::Arc;

/// Container shapes with a known value extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered, indexable
    List,
    /// Unordered
    Set,
    /// Zero or one element
    Optional,
    /// Key/value pairs; argument 0 is the key, 1 the value
    Map,
}

impl ContainerKind {
    /// Resolve a raw type name
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "List" => Some(Self::List),
            "Set" => Some(Self::Set),
            "Optional" => Some(Self::Optional),
            "Map" => Some(Self::Map),
            _ => None,
        }
    }

    /// Number of type arguments this container takes
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Map => 2,
            Self::List | Self::Set | Self::Optional => 1,
        }
    }

    /// Argument receiving a container-level cascade (map values, otherwise
    /// the element)
    #[must_use]
    pub fn value_argument(self) -> usize {
        self.arity() - 1
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::List => "List",
            Self::Set => "Set",
            Self::Optional => "Optional",
            Self::Map => "Map",
        };
        write!(f, "{s}")
    }
}

/// Whether and how a value is traversed beyond its own constraints
///
/// Container element entries are pruned at build time: an entry exists only
/// if it carries constraints or is itself marked for traversal.
#[derive(Debug, Clone, Default)]
pub struct CascadingMetaData {
    cascading: bool,
    container_elements: Vec<Arc<ContainerElementDescriptor>>,
}

impl CascadingMetaData {
    /// Metadata for a value that is not traversed
    #[must_use]
    pub fn non_cascading() -> Self {
        Self::default()
    }

    /// Create metadata; container elements are kept in type-argument order
    #[must_use]
    pub fn new(cascading: bool, mut container_elements: Vec<Arc<ContainerElementDescriptor>>) -> Self {
        container_elements.sort_by_key(|c| c.type_argument_index());
        Self {
            cascading,
            container_elements,
        }
    }

    /// Whether the value itself is validated as an object
    #[must_use]
    pub fn is_cascading(&self) -> bool {
        self.cascading
    }

    /// Annotated type arguments
    #[must_use]
    pub fn container_elements(&self) -> &[Arc<ContainerElementDescriptor>] {
        &self.container_elements
    }

    /// Descriptor of a given type argument, if it was kept
    #[must_use]
    pub fn container_element(&self, index: usize) -> Option<&ContainerElementDescriptor> {
        self.container_elements
            .iter()
            .find(|c| c.type_argument_index() == index)
            .map(Arc::as_ref)
    }

    /// Whether traversal has anything to do beyond the value's constraints
    #[must_use]
    pub fn is_marked_for_traversal(&self) -> bool {
        self.cascading || !self.container_elements.is_empty()
    }

    /// Whether any nested level cascades into objects
    #[must_use]
    pub fn has_cascades(&self) -> bool {
        self.cascading
            || self
                .container_elements
                .iter()
                .any(|c| c.cascading().has_cascades())
    }
}

/// One annotated type argument of a container type use
#[derive(Debug, Clone)]
pub struct ContainerElementDescriptor {
    container: ContainerKind,
    type_argument_index: usize,
    type_name: String,
    constraints: ConstraintSet,
    cascading: CascadingMetaData,
}

impl ContainerElementDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(
        container: ContainerKind,
        type_argument_index: usize,
        type_name: impl Into<String>,
        constraints: ConstraintSet,
        cascading: CascadingMetaData,
    ) -> Self {
        Self {
            container,
            type_argument_index,
            type_name: type_name.into(),
            constraints,
            cascading,
        }
    }

    /// Container the argument belongs to
    #[must_use]
    pub fn container(&self) -> ContainerKind {
        self.container
    }

    /// Position of the argument in the container's type arguments
    #[must_use]
    pub fn type_argument_index(&self) -> usize {
        self.type_argument_index
    }

    /// Raw name of the argument's type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Constraints on each extracted element
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Cascading of each extracted element
    #[must_use]
    pub fn cascading(&self) -> &CascadingMetaData {
        &self.cascading
    }

    /// Whether the argument carries anything worth keeping
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        !self.constraints.is_empty() || self.cascading.is_marked_for_traversal()
    }
}
