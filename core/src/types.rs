//! Declarative model definitions
//!
//! A [`ModelDefinition`] declares types, their properties and methods, the
//! constraints attached to each, validation groups and composed constraint
//! kinds. It is plain data (YAML/JSON loadable) and implements
//! [`TypeIntrospector`] so the metadata aggregator can walk hierarchies.

use crate::traits::{ROOT_TYPE, TypeIntrospector};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Name of the universal default group
pub const DEFAULT_GROUP: &str = "Default";

/// Model definition - the root of a constraint model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDefinition {
    /// Name of the model
    #[serde(default)]
    pub name: String,

    /// Description of the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Type definitions
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub types: IndexMap<String, TypeDefinition>,

    /// Validation group definitions
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<String, GroupDefinition>,

    /// Composed constraint kinds
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub constraints: IndexMap<String, ComposedConstraintDefinition>,
}

impl ModelDefinition {
    /// Create an empty model
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a type, keyed by its name
    #[must_use]
    pub fn with_type(mut self, definition: TypeDefinition) -> Self {
        self.types.insert(definition.name.clone(), definition);
        self
    }

    /// Add a group, keyed by its name
    #[must_use]
    pub fn with_group(mut self, definition: GroupDefinition) -> Self {
        self.groups.insert(definition.name.clone(), definition);
        self
    }

    /// Add a composed constraint kind
    #[must_use]
    pub fn with_constraint(
        mut self,
        kind: impl Into<String>,
        definition: ComposedConstraintDefinition,
    ) -> Self {
        self.constraints.insert(kind.into(), definition);
        self
    }

    /// Fill in `name` fields left empty in map-keyed definitions
    pub fn normalize_names(&mut self) {
        for (name, definition) in &mut self.types {
            if definition.name.is_empty() {
                definition.name.clone_from(name);
            }
            for (prop_name, property) in &mut definition.properties {
                if property.name.is_empty() {
                    property.name.clone_from(prop_name);
                }
            }
        }
        for (name, group) in &mut self.groups {
            if group.name.is_empty() {
                group.name.clone_from(name);
            }
        }
    }
}

impl TypeIntrospector for ModelDefinition {
    fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == ROOT_TYPE {
            return true;
        }
        let mut queue = VecDeque::from([sub.to_string()]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if current == sup {
                return true;
            }
            if let Some(parent) = self.superclass(&current) {
                queue.push_back(parent.to_string());
            }
            queue.extend(self.interfaces(&current).iter().cloned());
        }
        false
    }
}

/// Whether a type is a class or an interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Concrete or abstract class with a superclass chain
    #[default]
    Class,
    /// Interface; has no superclass, only super-interfaces
    Interface,
}

/// Type definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeDefinition {
    /// Name of the type
    #[serde(default)]
    pub name: String,

    /// Class or interface
    #[serde(default)]
    pub kind: TypeKind,

    /// Superclass; absent means the universal root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,

    /// Implemented (or extended, for interfaces) interfaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,

    /// Class-level constraints, evaluated against the object itself
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintAnnotation>,

    /// Properties declared on this type
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertyDefinition>,

    /// Methods declared on this type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDefinition>,

    /// Redefined default group sequence; the type's own name stands for
    /// the default group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_sequence: Option<Vec<String>>,
}

impl TypeDefinition {
    /// Create a class
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an interface
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            ..Default::default()
        }
    }

    /// Whether this is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Set the superclass
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a class-level constraint
    #[must_use]
    pub fn constrained(mut self, constraint: ConstraintAnnotation) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Add a property
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, mut definition: PropertyDefinition) -> Self {
        let name = name.into();
        definition.name.clone_from(&name);
        self.properties.insert(name, definition);
        self
    }

    /// Add a method
    #[must_use]
    pub fn method(mut self, definition: MethodDefinition) -> Self {
        self.methods.push(definition);
        self
    }

    /// Redefine the default group sequence
    #[must_use]
    pub fn group_sequence<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_sequence = Some(groups.into_iter().map(Into::into).collect());
        self
    }
}

/// Property definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyDefinition {
    /// Property name
    #[serde(default)]
    pub name: String,

    /// Declared type, including annotated type arguments
    #[serde(rename = "type", default)]
    pub type_use: TypeUse,

    /// Constraints on the property value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintAnnotation>,

    /// Cascade validation into the property value
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade: bool,
}

impl PropertyDefinition {
    /// Create a property of the given type
    #[must_use]
    pub fn new(type_use: impl Into<TypeUse>) -> Self {
        Self {
            type_use: type_use.into(),
            ..Default::default()
        }
    }

    /// Add a constraint
    #[must_use]
    pub fn constrained(mut self, constraint: ConstraintAnnotation) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark for cascaded validation
    #[must_use]
    pub fn cascaded(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// A (possibly generic) use of a type, with annotations on each type argument
///
/// `Map<@NotNull K, List<@Valid V>>` is
/// `TypeUse::map(TypeUse::named("K").constrained(not_null),
/// TypeUse::list(TypeUse::named("V").cascaded()))`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "TypeUseRepr")]
pub struct TypeUse {
    /// Raw type name (`List`, `Map`, `Optional`, `Set`, or a declared type)
    pub name: String,

    /// Type arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeUse>,

    /// Constraints on this type argument's values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintAnnotation>,

    /// Cascade into this type argument's values
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade: bool,
}

/// Accepts `"String"` as shorthand for `{ name: String }`
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeUseRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        args: Vec<TypeUse>,
        #[serde(default)]
        constraints: Vec<ConstraintAnnotation>,
        #[serde(default)]
        cascade: bool,
    },
}

impl From<TypeUseRepr> for TypeUse {
    fn from(repr: TypeUseRepr) -> Self {
        match repr {
            TypeUseRepr::Name(name) => Self::named(name),
            TypeUseRepr::Full {
                name,
                args,
                constraints,
                cascade,
            } => Self {
                name,
                args,
                constraints,
                cascade,
            },
        }
    }
}

impl From<&str> for TypeUse {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl TypeUse {
    /// A non-generic type use
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// `List<element>`
    #[must_use]
    pub fn list(element: impl Into<TypeUse>) -> Self {
        Self {
            name: "List".to_string(),
            args: vec![element.into()],
            ..Default::default()
        }
    }

    /// `Set<element>`
    #[must_use]
    pub fn set(element: impl Into<TypeUse>) -> Self {
        Self {
            name: "Set".to_string(),
            args: vec![element.into()],
            ..Default::default()
        }
    }

    /// `Optional<element>`
    #[must_use]
    pub fn optional(element: impl Into<TypeUse>) -> Self {
        Self {
            name: "Optional".to_string(),
            args: vec![element.into()],
            ..Default::default()
        }
    }

    /// `Map<key, value>`
    #[must_use]
    pub fn map(key: impl Into<TypeUse>, value: impl Into<TypeUse>) -> Self {
        Self {
            name: "Map".to_string(),
            args: vec![key.into(), value.into()],
            ..Default::default()
        }
    }

    /// Add a constraint on this use
    #[must_use]
    pub fn constrained(mut self, constraint: ConstraintAnnotation) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark this use for cascaded validation
    #[must_use]
    pub fn cascaded(mut self) -> Self {
        self.cascade = true;
        self
    }
}

impl fmt::Display for TypeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// A constraint as declared on an element
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstraintAnnotation {
    /// Constraint kind (`NotNull`, `Size`, or a composed kind)
    pub kind: String,

    /// Parameters by name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, serde_json::Value>,

    /// Groups activating the constraint; empty means the default group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Message template overriding the kind's default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConstraintAnnotation {
    /// Declare a constraint of the given kind
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Set a parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Restrict to the given groups
    #[must_use]
    pub fn in_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Override the message template
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Definition of a composed constraint kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComposedConstraintDefinition {
    /// Constraints this kind is composed of
    #[serde(default)]
    pub composed_of: Vec<ConstraintAnnotation>,

    /// Collapse any failing child into one violation of the parent
    #[serde(default)]
    pub report_as_single_violation: bool,

    /// Default message template for the composed kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Validation group definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupDefinition {
    /// Group name
    #[serde(default)]
    pub name: String,

    /// Groups this group inherits; validating it also validates them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    /// When set, the group is a sequence of these groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<String>>,
}

impl GroupDefinition {
    /// A plain group
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A group sequence
    #[must_use]
    pub fn sequence<I, S>(name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            extends: Vec::new(),
            sequence: Some(groups.into_iter().map(Into::into).collect()),
        }
    }

    /// Inherit another group
    #[must_use]
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }
}

/// Method definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,

    /// Parameters in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDefinition>,

    /// Return value; absent for `void` methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<ReturnValueDefinition>,
}

impl MethodDefinition {
    /// Create a method with no parameters and no return value
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the return value
    #[must_use]
    pub fn returns(mut self, return_value: ReturnValueDefinition) -> Self {
        self.return_value = Some(return_value);
        self
    }

    /// Erased signature, e.g. `checkCars(List)`
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.type_use.name.as_str())
            .collect();
        format!("{}({})", self.name, params.join(","))
    }
}

/// Method parameter definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterDefinition {
    /// Parameter name
    pub name: String,

    /// Declared type
    #[serde(rename = "type", default)]
    pub type_use: TypeUse,

    /// Constraints on the argument
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintAnnotation>,

    /// Cascade into the argument
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade: bool,
}

impl ParameterDefinition {
    /// Create a parameter
    #[must_use]
    pub fn new(name: impl Into<String>, type_use: impl Into<TypeUse>) -> Self {
        Self {
            name: name.into(),
            type_use: type_use.into(),
            ..Default::default()
        }
    }

    /// Add a constraint
    #[must_use]
    pub fn constrained(mut self, constraint: ConstraintAnnotation) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark for cascaded validation
    #[must_use]
    pub fn cascaded(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Method return value definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReturnValueDefinition {
    /// Declared type
    #[serde(rename = "type", default)]
    pub type_use: TypeUse,

    /// Constraints on the returned value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintAnnotation>,

    /// Cascade into the returned value
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade: bool,
}

impl ReturnValueDefinition {
    /// Create a return value of the given type
    #[must_use]
    pub fn new(type_use: impl Into<TypeUse>) -> Self {
        Self {
            type_use: type_use.into(),
            ..Default::default()
        }
    }

    /// Add a constraint
    #[must_use]
    pub fn constrained(mut self, constraint: ConstraintAnnotation) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark for cascaded validation
    #[must_use]
    pub fn cascaded(mut self) -> Self {
        self.cascade = true;
        self
    }
}
