//! # graphguard service
//!
//! Constraint validation for object graphs.
//!
//! Types declare constraints on their properties, on the type arguments of
//! container properties, on method parameters and return values, and on the
//! type itself. This crate turns those declarations into cached descriptors
//! and validates object graphs against them.
//!
//! ## Overview
//!
//! - **Metadata aggregation**: constraints declared anywhere in a type's
//!   hierarchy are merged into one [`BeanDescriptor`]; method overrides are
//!   checked for consistency with the methods they override
//! - **Groups**: requested groups expand into an ordered chain honoring group
//!   inheritance, group sequences and per-type redefined default sequences
//! - **Cascading**: `cascade` properties and container elements are followed
//!   into nested objects; each (object, group) pair is validated once, so
//!   reference cycles terminate
//! - **Executables**: method arguments and return values validate like
//!   properties
//!
//! ## Quick Start
//!
//! ```rust
//! use graphguard_service::prelude::*;
//!
//! # fn main() -> graphguard_core::Result<()> {
//! let model = ModelDefinition::new("people").with_type(
//!     TypeDefinition::class("Person")
//!         .property("name", PropertyDefinition::new("String").constrained(ConstraintAnnotation::new("NotNull")))
//!         .property("friend", PropertyDefinition::new("Person").cascaded()),
//! );
//! let engine = ValidationEngine::new(model)?;
//!
//! let mut graph = ObjectGraph::new();
//! let bob = graph.insert("Person");
//! let ada = graph.insert_with("Person", [("name", Value::from("Ada")), ("friend", Value::Object(bob))]);
//! graph.set(bob, "friend", ada)?;
//!
//! let report = engine.validate(&graph, ada, &[] as &[&str])?;
//! assert_eq!(report.len(), 1);
//! assert_eq!(report.violations()[0].path().to_string(), "friend.name");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)] // subjective determination
#![allow(clippy::return_self_not_must_use)] // builder patterns
#![allow(clippy::too_many_arguments)] // violations carry their full context
#![allow(clippy::needless_pass_by_value)] // owned values needed for async or threading

/// Descriptor model
pub mod descriptor;

/// Locations whose values the engine reads and cascades into
pub mod cascadable;

/// Metadata aggregation, caching and override checks
pub mod metadata;

/// Group resolution
pub mod groups;

/// Validation engine and leaf validators
pub mod validator;

/// Model parsing
pub mod parser;

/// Async service facade
pub mod service;

pub use cascadable::Cascadable;
pub use descriptor::BeanDescriptor;
pub use groups::{Group, GroupChain, GroupResolver};
pub use metadata::MetadataManager;
pub use parser::Parser;
pub use service::{ValidationService, ValidationServiceImpl};
pub use validator::{
    ConstraintViolation, ValidationEngine, ValidationOptions, ValidationReport, ValidatorRegistry,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::descriptor::*;
    pub use crate::groups::{Group, GroupChain, GroupResolver};
    pub use crate::metadata::{MetadataManager, MethodOverrideCheck};
    pub use crate::parser::{Format, Parser};
    pub use crate::service::{SharedAccess, ValidationService, ValidationServiceImpl};
    pub use crate::validator::{
        ConstraintValidatorFactory, ConstraintViolation, ValidationEngine, ValidationOptions,
        ValidationReport, ValidatorRegistry,
    };
    pub use graphguard_core::prelude::*;
}
