//! Property paths
//!
//! A [`PropertyPath`] is the stack of nodes from the root object to the
//! element under validation. The engine pushes a node before descending and
//! pops it afterwards; violations keep an immutable snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of validatable location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// The object itself (class-level constraints)
    Bean,
    /// A property of an object
    Property,
    /// A method, as the parent of its parameters and return value
    Method,
    /// A method parameter
    Parameter,
    /// A method return value
    ReturnValue,
    /// An element of a container (list element, map key or value...)
    ContainerElement,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bean => "bean",
            Self::Property => "property",
            Self::Method => "method",
            Self::Parameter => "parameter",
            Self::ReturnValue => "return value",
            Self::ContainerElement => "container element",
        };
        write!(f, "{s}")
    }
}

/// Position of a container element inside its container
///
/// Map and unordered positions carry the element's ordinal within the
/// container. It is not rendered, but keeps two elements that render alike
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPosition {
    /// Element of an indexed container
    Index(usize),
    /// Value stored under a map key
    Key {
        /// Rendered key
        key: String,
        /// Entry ordinal
        entry: usize,
    },
    /// A map key itself
    MapKey {
        /// Rendered key
        key: String,
        /// Entry ordinal
        entry: usize,
    },
    /// Element of an unordered container, with its iteration ordinal
    Iterable(usize),
    /// Content of an optional
    Optional,
}

impl ContainerPosition {
    /// Position of the value stored under the `entry`-th map key
    #[must_use]
    pub fn key(key: impl Into<String>, entry: usize) -> Self {
        Self::Key {
            key: key.into(),
            entry,
        }
    }

    /// Position of the `entry`-th map key
    #[must_use]
    pub fn map_key(key: impl Into<String>, entry: usize) -> Self {
        Self::MapKey {
            key: key.into(),
            entry,
        }
    }
}

/// One node of a property path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathNode {
    /// Node kind
    pub kind: ElementKind,
    /// Property, method or parameter name
    pub name: Option<String>,
    /// Position, for container elements
    pub position: Option<ContainerPosition>,
}

impl PathNode {
    /// A property node
    #[must_use]
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Property,
            name: Some(name.into()),
            position: None,
        }
    }

    /// A bean node (renders as nothing)
    #[must_use]
    pub fn bean() -> Self {
        Self {
            kind: ElementKind::Bean,
            name: None,
            position: None,
        }
    }

    /// A method node
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Method,
            name: Some(name.into()),
            position: None,
        }
    }

    /// A parameter node
    #[must_use]
    pub fn parameter(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Parameter,
            name: Some(name.into()),
            position: None,
        }
    }

    /// A return value node
    #[must_use]
    pub fn return_value() -> Self {
        Self {
            kind: ElementKind::ReturnValue,
            name: Some("<return value>".to_string()),
            position: None,
        }
    }

    /// A container element node
    #[must_use]
    pub fn container_element(position: ContainerPosition) -> Self {
        Self {
            kind: ElementKind::ContainerElement,
            name: None,
            position: Some(position),
        }
    }
}

/// Path from the validated root to an element
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyPath {
    nodes: Vec<PathNode>,
}

impl PropertyPath {
    /// The empty (root) path
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Push a node
    pub fn push(&mut self, node: PathNode) {
        self.nodes.push(node);
    }

    /// Pop the last node
    pub fn pop(&mut self) -> Option<PathNode> {
        self.nodes.pop()
    }

    /// Nodes from the root outward
    #[must_use]
    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether this is the root path
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The innermost node
    #[must_use]
    pub fn leaf(&self) -> Option<&PathNode> {
        self.nodes.last()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in &self.nodes {
            match (&node.position, &node.name) {
                (Some(position), _) => match position {
                    ContainerPosition::Index(i) => write!(f, "[{i}]")?,
                    ContainerPosition::Key { key, .. } => write!(f, "[{key}]")?,
                    ContainerPosition::MapKey { key, .. } => write!(f, "<K>[{key}]")?,
                    ContainerPosition::Iterable(_) => write!(f, "[]")?,
                    ContainerPosition::Optional => {}
                },
                (None, Some(name)) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                (None, None) => continue,
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use proptest::prelude::*;

    #[test]
    fn test_render_nested_containers() {
        let mut path = PropertyPath::root();
        path.push(PathNode::property("partManufacturers"));
        path.push(PathNode::container_element(ContainerPosition::key("engine", 0)));
        path.push(PathNode::container_element(ContainerPosition::Index(2)));
        path.push(PathNode::property("name"));
        assert_eq!(path.to_string(), "partManufacturers[engine][2].name");
    }

    #[test]
    fn test_render_map_key_and_bean_nodes() {
        let mut path = PropertyPath::root();
        path.push(PathNode::property("parts"));
        path.push(PathNode::container_element(ContainerPosition::map_key("wheel", 0)));
        path.push(PathNode::bean());
        assert_eq!(path.to_string(), "parts<K>[wheel]");
    }

    #[test]
    fn test_render_method_paths() {
        let mut path = PropertyPath::root();
        path.push(PathNode::method("checkCars"));
        path.push(PathNode::parameter("cars"));
        path.push(PathNode::container_element(ContainerPosition::Index(0)));
        assert_eq!(path.to_string(), "checkCars.cars[0]");
        path.pop();
        path.pop();
        path.push(PathNode::return_value());
        assert_eq!(path.to_string(), "checkCars.<return value>");
    }

    #[test]
    fn test_unordered_elements_render_alike_but_differ() {
        let element = |ordinal| {
            let mut path = PropertyPath::root();
            path.push(PathNode::property("tags"));
            path.push(PathNode::container_element(ContainerPosition::Iterable(ordinal)));
            path
        };
        assert_eq!(element(0).to_string(), "tags[]");
        assert_eq!(element(0).to_string(), element(1).to_string());
        assert_ne!(element(0), element(1));
    }

    #[test]
    fn test_root_renders_empty() {
        let mut path = PropertyPath::root();
        assert_eq!(path.to_string(), "");
        path.push(PathNode::bean());
        assert_eq!(path.to_string(), "");
        assert_eq!(path.leaf().map(|n| n.kind), Some(ElementKind::Bean));
    }

    proptest! {
        /// Property and bean nodes render as the dotted property names,
        /// and popping restores the previous rendering
        #[test]
        fn prop_property_paths_render_dotted(
            names in prop::collection::vec("[a-z][a-zA-Z0-9]{0,8}", 1..6),
            beans in prop::collection::vec(any::<bool>(), 6),
        ) {
            let mut path = PropertyPath::root();
            let mut rendered = Vec::new();
            for (name, bean) in names.iter().zip(&beans) {
                let before = path.to_string();
                path.push(PathNode::property(name.clone()));
                if *bean {
                    path.push(PathNode::bean());
                }
                rendered.push(path.to_string());

                let mut popped = path.clone();
                if *bean {
                    popped.pop();
                }
                popped.pop();
                prop_assert_eq!(popped.to_string(), before);
            }
            prop_assert_eq!(path.to_string(), names.join("."));
            prop_assert_eq!(rendered.last(), Some(&names.join(".")));
        }
    }
}
