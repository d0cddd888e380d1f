//! Cascadables: locations whose value may need further validation
//!
//! Properties, parameters, return values and container elements expose the
//! same capabilities to the engine: reading their value from a parent,
//! naming themselves in a property path, and describing what to validate
//! inside the value. The traversal code works against [`Cascadable`] only.

use crate::descriptor::{
    CascadingMetaData, ConstraintSet, ContainerElementDescriptor, ParameterDescriptor,
    PropertyDescriptor, ReturnValueDescriptor,
};
use crate::validator::container::ExtractedElement;
use graphguard_core::{AccessError, ElementKind, ObjectAccess, PathNode, PropertyPath, Value};

/// A validatable location reachable from a parent value
#[derive(Debug, Clone, Copy)]
pub enum Cascadable<'a> {
    /// A property; the parent is the owning object
    Property(&'a PropertyDescriptor),
    /// A parameter; the parent is the argument list
    Parameter(&'a ParameterDescriptor),
    /// A return value; the parent is the returned value itself
    ReturnValue(&'a ReturnValueDescriptor),
    /// One element of a container, already extracted
    ContainerElement(&'a ContainerElementDescriptor, &'a ExtractedElement),
}

impl<'a> Cascadable<'a> {
    /// Kind of location
    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        match self {
            Self::Property(_) => ElementKind::Property,
            Self::Parameter(_) => ElementKind::Parameter,
            Self::ReturnValue(_) => ElementKind::ReturnValue,
            Self::ContainerElement(..) => ElementKind::ContainerElement,
        }
    }

    /// Read this location's value from `parent`
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::IncompatibleParent`] when `parent` is not of
    /// the shape this location expects (including too short an argument
    /// list), or whatever the accessor reports for a property.
    pub fn value_from(&self, parent: &Value, access: &dyn ObjectAccess) -> Result<Value, AccessError> {
        match self {
            Self::Property(property) => match parent {
                Value::Object(id) => access.property(*id, property.name()),
                other => Err(AccessError::IncompatibleParent {
                    expected: "object".to_string(),
                    found: other.shape().to_string(),
                }),
            },
            Self::Parameter(parameter) => match parent {
                Value::List(args) => args.get(parameter.index()).cloned().ok_or_else(|| {
                    AccessError::IncompatibleParent {
                        expected: format!("at least {} arguments", parameter.index() + 1),
                        found: format!("{} arguments", args.len()),
                    }
                }),
                other => Err(AccessError::IncompatibleParent {
                    expected: "argument list".to_string(),
                    found: other.shape().to_string(),
                }),
            },
            Self::ReturnValue(_) => Ok(parent.clone()),
            Self::ContainerElement(_, element) => Ok(element.value.clone()),
        }
    }

    /// Path node naming this location
    #[must_use]
    pub fn path_node(&self) -> PathNode {
        match self {
            Self::Property(property) => PathNode::property(property.name()),
            Self::Parameter(parameter) => PathNode::parameter(parameter.name()),
            Self::ReturnValue(_) => PathNode::return_value(),
            Self::ContainerElement(_, element) => PathNode::container_element(element.position.clone()),
        }
    }

    /// Append this location to `path`
    pub fn append_to(&self, path: &mut PropertyPath) {
        path.push(self.path_node());
    }

    /// What to validate inside the value
    #[must_use]
    pub fn cascading_metadata(&self) -> &'a CascadingMetaData {
        match *self {
            Self::Property(property) => property.cascading(),
            Self::Parameter(parameter) => parameter.cascading(),
            Self::ReturnValue(return_value) => return_value.cascading(),
            Self::ContainerElement(descriptor, _) => descriptor.cascading(),
        }
    }

    /// Constraints declared on the location
    #[must_use]
    pub fn constraints(&self) -> &'a ConstraintSet {
        match *self {
            Self::Property(property) => property.constraints(),
            Self::Parameter(parameter) => parameter.constraints(),
            Self::ReturnValue(return_value) => return_value.constraints(),
            Self::ContainerElement(descriptor, _) => descriptor.constraints(),
        }
    }
}
