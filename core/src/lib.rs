//! # graphguard core
//!
//! Core types and traits for validating object graphs against declarative
//! constraints.
//!
//! This crate holds the pieces every collaborator shares: the declarative
//! model ([`types`]), the runtime object graph ([`value`]), property paths,
//! configuration, the error taxonomy and the seam traits through which the
//! validation engine reads types and values.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types
pub mod error;

/// Collaborator traits
pub mod traits;

/// Declarative model definitions
pub mod types;

/// Runtime object graph
pub mod value;

/// Property paths
pub mod path;

/// Configuration types
pub mod config;

pub use config::GraphGuardConfig;
pub use error::{AccessError, BuildError, GraphGuardError, Result, ValidatorError};
pub use path::{ContainerPosition, ElementKind, PathNode, PropertyPath};
pub use traits::{ConstraintValidator, ConstraintValidatorContext, ObjectAccess, TypeIntrospector};
pub use types::{ModelDefinition, DEFAULT_GROUP};
pub use value::{ObjectGraph, ObjectId, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{AccessError, BuildError, GraphGuardError, Result, ValidatorError};
    pub use crate::path::*;
    pub use crate::traits::*;
    pub use crate::types::*;
    pub use crate::value::*;
}
