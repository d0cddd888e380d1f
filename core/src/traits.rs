//! Core trait definitions
//!
//! These are the seams between the validation engine and its collaborators:
//! type introspection, value access and leaf constraint evaluation.

use crate::error::AccessError;
use crate::types::{MethodDefinition, TypeDefinition};
use crate::value::{ObjectId, Value};

/// Name of the universal root type. The upward hierarchy walk stops here.
pub const ROOT_TYPE: &str = "Object";

/// Read access to the members of objects in a graph
///
/// Implemented by [`crate::value::ObjectGraph`]; other backends (generated
/// accessors, adapters over application structs) can implement it too.
pub trait ObjectAccess: Send + Sync {
    /// Runtime type name of an object
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownObject`] if the id is not known.
    fn type_of(&self, id: ObjectId) -> Result<&str, AccessError>;

    /// Current value of a property
    ///
    /// # Errors
    ///
    /// Returns an [`AccessError`] if the object or the property cannot be
    /// resolved.
    fn property(&self, id: ObjectId, name: &str) -> Result<Value, AccessError>;
}

/// Structural view over declared types
///
/// The metadata aggregator only ever asks these questions; it never touches
/// the model representation directly.
pub trait TypeIntrospector: Send + Sync {
    /// Look up a declared type
    fn type_definition(&self, name: &str) -> Option<&TypeDefinition>;

    /// Superclass of a type; `None` for interfaces and for the root
    fn superclass(&self, name: &str) -> Option<&str> {
        if name == ROOT_TYPE {
            return None;
        }
        let definition = self.type_definition(name)?;
        if definition.is_interface() {
            return None;
        }
        Some(definition.superclass.as_deref().unwrap_or(ROOT_TYPE))
    }

    /// Directly implemented (or, for interfaces, extended) interfaces
    fn interfaces(&self, name: &str) -> &[String] {
        self.type_definition(name)
            .map_or(&[], |t| t.interfaces.as_slice())
    }

    /// Methods declared directly on a type
    fn declared_methods(&self, name: &str) -> &[MethodDefinition] {
        self.type_definition(name)
            .map_or(&[], |t| t.methods.as_slice())
    }

    /// Whether `sub` is `sup` or one of its subtypes
    fn is_assignable(&self, sub: &str, sup: &str) -> bool;

    /// Whether `current`, declared on `current_type`, overrides `other`,
    /// declared on `other_type`
    fn overrides(
        &self,
        current: &MethodDefinition,
        current_type: &str,
        other: &MethodDefinition,
        other_type: &str,
    ) -> bool {
        current_type != other_type
            && self.is_assignable(current_type, other_type)
            && current.signature() == other.signature()
    }
}

/// Context handed to a leaf validator
#[derive(Debug, Clone, Copy)]
pub struct ConstraintValidatorContext<'a> {
    /// Rendered property path of the value under validation
    pub path: &'a str,
    /// The object the value was read from, if any
    pub leaf_object: Option<ObjectId>,
}

/// A leaf constraint validator
///
/// Instances are initialized once per constraint declaration and shared
/// across calls and threads, so they must not hold per-call state.
pub trait ConstraintValidator: Send + Sync {
    /// Whether `value` satisfies the constraint
    ///
    /// # Errors
    ///
    /// An error means the validator itself failed; it aborts the whole
    /// validation call.
    fn is_valid(&self, value: &Value, context: &ConstraintValidatorContext<'_>)
    -> anyhow::Result<bool>;
}

impl<F> ConstraintValidator for F
where
    F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync,
{
    fn is_valid(
        &self,
        value: &Value,
        _context: &ConstraintValidatorContext<'_>,
    ) -> anyhow::Result<bool> {
        self(value)
    }
}
