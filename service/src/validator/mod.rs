//! Validation of object graphs
//!
//! The [`ValidationEngine`] walks an object graph under a group chain and
//! evaluates the constraints described by the metadata layer. Leaf checks
//! live in [`validators`]; [`report`] holds the results.

pub mod container;
pub mod context;
pub mod engine;
pub mod message;
pub mod report;
pub mod validators;

pub use container::{ExtractedElement, extract};
pub use context::ValidationContext;
pub use engine::{ValidationEngine, ValidationEngineBuilder, ValidationOptions};
pub use message::interpolate;
pub use report::{ConstraintViolation, ValidationReport, ValidationStats};
pub use validators::{ConstraintValidatorFactory, ValidatorRegistry};
