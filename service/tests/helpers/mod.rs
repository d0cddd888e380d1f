//! Shared fixtures for the integration tests

#![allow(dead_code)]

use graphguard_core::types::{ConstraintAnnotation, PropertyDefinition, TypeDefinition, TypeUse};
use graphguard_core::ModelDefinition;

/// Install a test subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// No requested groups: validate the default group
pub const DEFAULT: &[&str] = &[];

pub fn not_null() -> ConstraintAnnotation {
    ConstraintAnnotation::new("NotNull")
}

/// `Parent` and `Child` referencing each other, each with a required name
pub fn family_model() -> ModelDefinition {
    ModelDefinition::new("family")
        .with_type(
            TypeDefinition::class("Parent")
                .property("name", PropertyDefinition::new("String").constrained(not_null()))
                .property("child", PropertyDefinition::new("Child").cascaded())
                .property("children", PropertyDefinition::new(TypeUse::list(TypeUse::named("Child").cascaded()))),
        )
        .with_type(
            TypeDefinition::class("Child")
                .property("name", PropertyDefinition::new("String").constrained(not_null()))
                .property("parent", PropertyDefinition::new("Parent").cascaded()),
        )
}
