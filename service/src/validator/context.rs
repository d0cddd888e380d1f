//! Per-call validation state
//!
//! A [`ValidationContext`] lives for exactly one validation call. It owns
//! the property path, the visited (object, group) pairs that make cascading
//! cycle safe, the processed constraints and the collected violations.

use super::message::interpolate;
use super::report::{ConstraintViolation, ValidationReport, ValidationStats};
use crate::descriptor::{ConstraintDescriptor, ConstraintId};
use graphguard_core::config::ValidationConfig;
use graphguard_core::{GraphGuardError, ObjectId, PathNode, PropertyPath, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Validation context for one call
pub struct ValidationContext {
    root: Value,
    root_type: String,
    path: PropertyPath,
    visited: HashSet<(ObjectId, String)>,
    processed: HashSet<(ConstraintId, Option<ObjectId>, PropertyPath)>,
    violations: Vec<ConstraintViolation>,
    depth: usize,
    max_depth: usize,
    fail_fast: bool,
    stats: ValidationStats,
    started: Instant,
}

impl ValidationContext {
    /// Create a context for validating `root`
    #[must_use]
    pub fn new(root: Value, root_type: impl Into<String>, config: &ValidationConfig) -> Self {
        Self {
            root,
            root_type: root_type.into(),
            path: PropertyPath::root(),
            visited: HashSet::new(),
            processed: HashSet::new(),
            violations: Vec::new(),
            depth: 0,
            max_depth: config.max_cascade_depth,
            fail_fast: config.fail_fast,
            stats: ValidationStats::default(),
            started: Instant::now(),
        }
    }

    /// Current property path
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Execute a closure with a path node pushed
    ///
    /// The node is popped when the closure returns, whether it succeeded or
    /// not.
    pub fn with_node<F, R>(&mut self, node: PathNode, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.path.push(node);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Execute a closure one object deeper
    ///
    /// # Errors
    ///
    /// Returns [`GraphGuardError::CascadeDepthExceeded`] when the configured
    /// depth would be exceeded, otherwise whatever the closure returns.
    pub fn descend<F>(&mut self, f: F) -> graphguard_core::Result<()>
    where
        F: FnOnce(&mut Self) -> graphguard_core::Result<()>,
    {
        if self.depth >= self.max_depth {
            tracing::warn!(max = self.max_depth, path = %self.path, "cascade depth limit reached");
            return Err(GraphGuardError::CascadeDepthExceeded {
                depth: self.depth + 1,
                max: self.max_depth,
                path: self.path.to_string(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Current object depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record that `object` is being validated for `group`; false if it
    /// already was
    pub fn mark_visited(&mut self, object: ObjectId, group: &str) -> bool {
        self.visited.insert((object, group.to_string()))
    }

    /// Whether `object` was already validated for `group`
    #[must_use]
    pub fn is_visited(&self, object: ObjectId, group: &str) -> bool {
        self.visited.contains(&(object, group.to_string()))
    }

    /// Record that `constraint` is evaluated for `leaf` at the current path;
    /// false if it already was during this call
    ///
    /// Paths compare structurally, so container elements that render alike
    /// (set elements, map keys with equal text) are still told apart.
    pub fn mark_processed(&mut self, constraint: ConstraintId, leaf: Option<ObjectId>) -> bool {
        self.processed.insert((constraint, leaf, self.path.clone()))
    }

    /// Create a violation of `constraint` at the current path
    #[must_use]
    pub fn violation(
        &self,
        constraint: &Arc<ConstraintDescriptor>,
        value: &Value,
        leaf: Option<ObjectId>,
    ) -> ConstraintViolation {
        ConstraintViolation::new(
            interpolate(constraint.message_template(), constraint.params(), value),
            self.path.clone(),
            value.clone(),
            self.root.clone(),
            self.root_type.clone(),
            leaf,
            Arc::clone(constraint),
        )
    }

    /// Collect a violation
    pub fn add_violation(&mut self, violation: ConstraintViolation) {
        self.violations.push(violation);
    }

    /// Number of violations so far
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Whether fail-fast mode has seen a violation
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.fail_fast && !self.violations.is_empty()
    }

    /// Mutable statistics
    pub fn stats_mut(&mut self) -> &mut ValidationStats {
        &mut self.stats
    }

    /// Finish the call
    #[must_use]
    pub fn into_report(mut self) -> ValidationReport {
        self.stats.duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        ValidationReport::new(self.violations, self.stats)
    }
}
