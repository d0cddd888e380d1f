//! Container element extraction
//!
//! Given a container value and a type-argument index, yields each element
//! addressed by that argument together with its position. Map argument 0
//! addresses keys, argument 1 values.

use crate::descriptor::ContainerKind;
use graphguard_core::{AccessError, ContainerPosition, Value};

/// One element pulled out of a container
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedElement {
    /// Where the element sits in its container
    pub position: ContainerPosition,
    /// The element itself
    pub value: Value,
}

impl ExtractedElement {
    fn new(position: ContainerPosition, value: Value) -> Self {
        Self { position, value }
    }
}

fn incompatible(expected: ContainerKind, found: &Value) -> AccessError {
    AccessError::IncompatibleParent {
        expected: expected.to_string(),
        found: found.shape().to_string(),
    }
}

/// How a map key appears in a property path; text keys are quoted so they
/// never read like numbers, booleans or object ids
fn key_label(key: &Value) -> String {
    match key {
        Value::Text(text) => format!("{text:?}"),
        other => other.to_string(),
    }
}

/// Elements of `container` addressed by type argument `index`
///
/// A null container has no elements. An `Optional` holds its content
/// directly, so a non-null value is the single element.
///
/// # Errors
///
/// Returns [`AccessError::IncompatibleParent`] when the value is not of the
/// declared container shape.
pub fn extract(kind: ContainerKind, index: usize, container: &Value) -> Result<Vec<ExtractedElement>, AccessError> {
    if container.is_null() {
        return Ok(Vec::new());
    }
    let elements = match (kind, container) {
        (ContainerKind::List, Value::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ExtractedElement::new(ContainerPosition::Index(i), v.clone()))
            .collect(),
        // Lists are iterable too; a `Set`-declared value may arrive ordered.
        (ContainerKind::Set, Value::Set(items) | Value::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ExtractedElement::new(ContainerPosition::Iterable(i), v.clone()))
            .collect(),
        (ContainerKind::Optional, value) => {
            vec![ExtractedElement::new(ContainerPosition::Optional, value.clone())]
        }
        (ContainerKind::Map, Value::Map(entries)) if index == 0 => entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| ExtractedElement::new(ContainerPosition::map_key(key_label(k), i), k.clone()))
            .collect(),
        (ContainerKind::Map, Value::Map(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, (k, v))| ExtractedElement::new(ContainerPosition::key(key_label(k), i), v.clone()))
            .collect(),
        (kind, other) => return Err(incompatible(kind, other)),
    };
    Ok(elements)
}
