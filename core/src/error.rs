//! Error types for constraint validation
//!
//! Errors fall into three fatal families that abort a validation call
//! ([`BuildError`], [`AccessError`], [`ValidatorError`]) plus the ambient
//! configuration and parsing failures. Constraint violations are results, not
//! errors, and never appear here.

use crate::value::ObjectId;
use thiserror::Error;

/// Main error type for graphguard operations
#[derive(Error, Debug)]
pub enum GraphGuardError {
    /// Metadata could not be built
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A value could not be read from the object graph
    #[error(transparent)]
    Access(#[from] AccessError),

    /// A leaf validator failed unexpectedly
    #[error(transparent)]
    Validator(#[from] ValidatorError),

    /// Model or configuration parsing errors
    #[error("Failed to parse: {message}")]
    ParseError {
        /// Error message
        message: String,
        /// Location in the source if available
        location: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Cascading went deeper than the configured limit
    #[error("Cascade depth {depth} exceeds the configured maximum of {max} at '{path}'")]
    CascadeDepthExceeded {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
        /// Property path at which the limit was hit
        path: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Service integration errors
    #[error("Service error: {0}")]
    ServiceError(String),
}

/// Result type alias for graphguard operations
pub type Result<T> = std::result::Result<T, GraphGuardError>;

impl GraphGuardError {
    /// Create a new parse error
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: None,
        }
    }

    /// Create a new parse error with location
    #[must_use]
    pub fn parse_at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: Some(location.into()),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError(message.into())
    }

    /// Create a service error
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::ServiceError(message.into())
    }

    /// Whether this error was raised while building metadata
    #[must_use]
    pub fn is_build_error(&self) -> bool {
        matches!(self, Self::Build(_))
    }
}

/// Errors detected while building metadata. Never raised during traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A constraint parameter has the wrong type, arity or value
    #[error("Malformed parameter '{parameter}' on constraint '{constraint}': {reason}")]
    MalformedParameter {
        /// Constraint kind
        constraint: String,
        /// Parameter name
        parameter: String,
        /// What is wrong with it
        reason: String,
    },

    /// No validator and no composition is registered for a constraint kind
    #[error("Unknown constraint kind '{0}'")]
    UnknownConstraint(String),

    /// A referenced type is not declared in the model
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// A referenced group is not declared in the model
    #[error("Unknown validation group '{0}'")]
    UnknownGroup(String),

    /// Group sequence definitions reference each other in a cycle
    #[error("Cyclic group sequence definition: {}", .cycle.join(" -> "))]
    CyclicSequence {
        /// Groups forming the cycle, first element repeated at the end
        cycle: Vec<String>,
    },

    /// Group inheritance or type hierarchy loops back on itself
    #[error("Cyclic hierarchy detected at '{0}'")]
    CyclicHierarchy(String),

    /// A method's constraint or cascading declarations disagree with the
    /// methods it overrides
    #[error(
        "Method '{method}' in '{declaring_type}' violates override rule '{rule}' against '{conflicting_type}'"
    )]
    OverrideInconsistency {
        /// Key of the rule that failed
        rule: String,
        /// Signature of the checked method
        method: String,
        /// Type declaring the checked method
        declaring_type: String,
        /// Type whose declaration conflicts
        conflicting_type: String,
    },

    /// A type use is structurally invalid (wrong type-argument count etc.)
    #[error("Invalid type use '{type_use}': {reason}")]
    InvalidTypeUse {
        /// Rendered type use
        type_use: String,
        /// Reason
        reason: String,
    },

    /// A composed constraint definition contains itself
    #[error("Constraint '{0}' is composed of itself")]
    RecursiveComposition(String),

    /// A redefined default group sequence is not well formed
    #[error("Invalid default group sequence on '{type_name}': {reason}")]
    InvalidDefaultSequence {
        /// Type redefining its default sequence
        type_name: String,
        /// Reason
        reason: String,
    },
}

impl BuildError {
    /// Create a malformed parameter error
    #[must_use]
    pub fn malformed(
        constraint: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedParameter {
            constraint: constraint.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// The value accessor could not resolve a member of the given parent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The object id is not part of the graph
    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    /// The object does not have the requested property
    #[error("Type '{type_name}' has no property '{property}'")]
    MissingProperty {
        /// Runtime type of the object
        type_name: String,
        /// Requested property
        property: String,
    },

    /// The parent value is not of the shape the accessor expects
    #[error("Expected {expected} but found {found}")]
    IncompatibleParent {
        /// Expected shape
        expected: String,
        /// Actual shape
        found: String,
    },

    /// The type declares no executable with the given signature
    #[error("Type '{type_name}' has no method '{method}'")]
    MissingMethod {
        /// Runtime type of the object
        type_name: String,
        /// Requested signature
        method: String,
    },

    /// Fewer arguments were supplied than the executable declares
    #[error("Missing argument {index} for '{method}'")]
    MissingArgument {
        /// Method signature
        method: String,
        /// Parameter position
        index: usize,
    },
}

/// A leaf validator raised an unexpected error
#[derive(Error, Debug)]
#[error("Validator for '{constraint}' failed at '{path}': {source}")]
pub struct ValidatorError {
    /// Constraint kind
    pub constraint: String,
    /// Property path being evaluated
    pub path: String,
    /// Underlying failure
    #[source]
    pub source: anyhow::Error,
}

impl From<serde_json::Error> for GraphGuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for GraphGuardError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = GraphGuardError::parse("Invalid YAML");
        assert!(matches!(err, GraphGuardError::ParseError { .. }));

        let err = GraphGuardError::parse_at("Invalid syntax", "line 10");
        match err {
            GraphGuardError::ParseError { location, .. } => {
                assert_eq!(location.as_deref(), Some("line 10"));
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::CyclicSequence {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Cyclic group sequence definition: A -> B -> A");

        let err: GraphGuardError = BuildError::malformed("Size", "min", "must be >= 0").into();
        assert!(err.is_build_error());
        assert!(err.to_string().contains("'min'"));
    }

    #[test]
    fn test_validator_error_keeps_source() {
        let err = ValidatorError {
            constraint: "Custom".into(),
            path: "a.b".into(),
            source: anyhow::anyhow!("boom"),
        };
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: GraphGuardError = json_err.into();
        assert!(matches!(err, GraphGuardError::SerializationError(_)));
    }
}
