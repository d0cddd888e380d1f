//! Runtime object graph
//!
//! Objects live in an [`ObjectGraph`] arena and are referenced by
//! [`ObjectId`]. The id is the object's identity: two objects with equal
//! fields are still distinct, and reference cycles are plain id links.

use crate::error::AccessError;
use crate::traits::ObjectAccess;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an object inside an [`ObjectGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A runtime value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Reference to an object in the graph
    Object(ObjectId),
    /// Ordered, indexable container
    List(Vec<Value>),
    /// Unordered container (iteration order is insertion order)
    Set(Vec<Value>),
    /// Key/value container (iteration order is insertion order)
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Whether this is [`Value::Null`]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The referenced object, if any
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Text content, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content widened to `f64`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Name of the value's shape, used in error messages
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }

    /// Number of elements for text and containers
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::List(items) | Self::Set(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Whether [`Value::len`] is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Object(id) => write!(f, "{id}"),
            Self::List(items) | Self::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A single object: its runtime type and field values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Runtime type name
    pub type_name: String,
    /// Field values in declaration order
    pub fields: IndexMap<String, Value>,
}

/// Arena holding every object of a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object of the given type with no fields set
    pub fn insert(&mut self, type_name: impl Into<String>) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(Object {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        });
        id
    }

    /// Allocate a new object with the given fields
    pub fn insert_with<I, K, V>(&mut self, type_name: impl Into<String>, fields: I) -> ObjectId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let id = self.insert(type_name);
        for (k, v) in fields {
            self.objects[id.0].fields.insert(k.into(), v.into());
        }
        id
    }

    /// Set a field value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownObject`] if `id` is not in this graph.
    pub fn set(
        &mut self,
        id: ObjectId,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), AccessError> {
        let object = self
            .objects
            .get_mut(id.0)
            .ok_or(AccessError::UnknownObject(id))?;
        object.fields.insert(field.into(), value.into());
        Ok(())
    }

    /// Look up an object
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0)
    }

    /// Number of objects in the graph
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the graph holds no objects
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectAccess for ObjectGraph {
    fn type_of(&self, id: ObjectId) -> Result<&str, AccessError> {
        self.get(id)
            .map(|o| o.type_name.as_str())
            .ok_or(AccessError::UnknownObject(id))
    }

    fn property(&self, id: ObjectId, name: &str) -> Result<Value, AccessError> {
        let object = self.get(id).ok_or(AccessError::UnknownObject(id))?;
        // Unset fields read as null, like an uninitialised member.
        Ok(object.fields.get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity_is_not_equality() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert_with("Person", [("name", "Ada")]);
        let b = graph.insert_with("Person", [("name", "Ada")]);
        assert_ne!(a, b);
        assert_eq!(graph.get(a), graph.get(b));
    }

    #[test]
    fn test_cycles_are_id_links() -> Result<(), AccessError> {
        let mut graph = ObjectGraph::new();
        let parent = graph.insert("Parent");
        let child = graph.insert("Child");
        graph.set(parent, "child", child)?;
        graph.set(child, "parent", parent)?;

        assert_eq!(graph.property(parent, "child")?, Value::Object(child));
        assert_eq!(graph.property(child, "parent")?, Value::Object(parent));
        Ok(())
    }

    #[test]
    fn test_unset_field_reads_null_and_unknown_object_fails() {
        let mut graph = ObjectGraph::new();
        let id = graph.insert("Thing");
        assert_eq!(graph.property(id, "missing"), Ok(Value::Null));
        assert_eq!(
            graph.property(ObjectId(42), "x"),
            Err(AccessError::UnknownObject(ObjectId(42)))
        );
        assert_eq!(graph.type_of(id), Ok("Thing"));
    }

    #[test]
    fn test_value_len_and_display() {
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert!(Value::List(vec![]).is_empty());
        assert_eq!(Value::Integer(3).len(), None);
        let map = Value::Map(vec![(Value::from("k"), Value::Integer(1))]);
        assert_eq!(map.to_string(), "{k=1}");
    }
}
