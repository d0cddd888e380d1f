//! Validation results

use crate::descriptor::ConstraintDescriptor;
use graphguard_core::{ElementKind, ObjectId, PropertyPath, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One failed constraint. Immutable once created.
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    message: String,
    path: PropertyPath,
    invalid_value: Value,
    root: Value,
    root_type: String,
    leaf_object: Option<ObjectId>,
    constraint: Arc<ConstraintDescriptor>,
}

impl ConstraintViolation {
    pub(crate) fn new(
        message: String,
        path: PropertyPath,
        invalid_value: Value,
        root: Value,
        root_type: String,
        leaf_object: Option<ObjectId>,
        constraint: Arc<ConstraintDescriptor>,
    ) -> Self {
        Self {
            message,
            path,
            invalid_value,
            root,
            root_type,
            leaf_object,
            constraint,
        }
    }

    /// Interpolated message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message template before interpolation
    #[must_use]
    pub fn message_template(&self) -> &str {
        self.constraint.message_template()
    }

    /// Path from the root to the failing element
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// The value that failed
    #[must_use]
    pub fn invalid_value(&self) -> &Value {
        &self.invalid_value
    }

    /// The value validation started from
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Runtime type of the root
    #[must_use]
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// The object the failing value was read from
    #[must_use]
    pub fn leaf_object(&self) -> Option<ObjectId> {
        self.leaf_object
    }

    /// The failed constraint
    #[must_use]
    pub fn constraint(&self) -> &Arc<ConstraintDescriptor> {
        &self.constraint
    }

    /// Kind of location the constraint is declared on
    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        self.constraint.element_kind()
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.to_string().is_empty() {
            write!(f, "[{}] {}", self.constraint.kind(), self.message)
        } else {
            write!(f, "[{}] {}: {}", self.constraint.kind(), self.path, self.message)
        }
    }
}

/// Validation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    /// Objects validated, once per (object, group)
    pub beans_validated: usize,
    /// Constraint evaluations, composing constraints included
    pub constraints_evaluated: usize,
    /// Cascades skipped because the (object, group) pair was already visited
    pub cascades_skipped: usize,
    /// Group chain units executed
    pub units_executed: usize,
    /// Sequences that stopped at a failing step
    pub sequences_short_circuited: usize,
    /// Validation duration in milliseconds
    pub duration_ms: u64,
}

/// Complete result of one validation call
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    violations: Vec<ConstraintViolation>,
    stats: ValidationStats,
}

impl ValidationReport {
    pub(crate) fn new(violations: Vec<ConstraintViolation>, stats: ValidationStats) -> Self {
        Self { violations, stats }
    }

    /// Whether no constraint failed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in discovery order
    #[must_use]
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    /// Take the violations
    #[must_use]
    pub fn into_violations(self) -> Vec<ConstraintViolation> {
        self.violations
    }

    /// Number of violations
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Whether there are no violations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Statistics of the call
    #[must_use]
    pub fn stats(&self) -> &ValidationStats {
        &self.stats
    }

    /// Violations at a rendered path
    pub fn at_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ConstraintViolation> {
        self.violations.iter().filter(move |v| v.path.to_string() == path)
    }

    /// Violations of one constraint kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ConstraintViolation> {
        self.violations.iter().filter(move |v| v.constraint.kind() == kind)
    }

    /// Get a summary of the validation
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!(
                "Validation passed ({} objects, {} constraints)",
                self.stats.beans_validated, self.stats.constraints_evaluated
            )
        } else {
            format!(
                "Validation failed with {} violations ({} objects, {} constraints)",
                self.violations.len(),
                self.stats.beans_validated,
                self.stats.constraints_evaluated
            )
        }
    }

    /// Sort violations by path, then constraint kind
    pub fn sort(&mut self) {
        self.violations.sort_by(|a, b| {
            a.path
                .to_string()
                .cmp(&b.path.to_string())
                .then_with(|| a.constraint.kind().cmp(b.constraint.kind()))
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        if !self.violations.is_empty() {
            writeln!(f, "\nViolations:")?;
            for violation in &self.violations {
                writeln!(f, "  {violation}")?;
            }
        }
        Ok(())
    }
}
