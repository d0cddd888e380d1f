//! Method override consistency checks
//!
//! When a method overrides methods of its supertypes, the declarations must
//! agree: a subtype may not alter the preconditions of the methods it
//! overrides, and must keep any cascading its supertypes require. Each rule
//! is a [`MethodOverrideCheck`]; [`check_method`] runs one rule against every
//! overridden declaration.

use graphguard_core::traits::ROOT_TYPE;
use graphguard_core::types::{ConstraintAnnotation, MethodDefinition};
use graphguard_core::{BuildError, TypeIntrospector};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// One override consistency rule
pub trait MethodOverrideCheck: Send + Sync {
    /// Key identifying the rule in errors
    fn rule(&self) -> &'static str;

    /// Whether the rule applies to `method` at all
    ///
    /// When it does not, none of the rule's comparisons run, including the
    /// pairwise ones between the overridden declarations: a diamond whose
    /// branches disagree passes as long as the overriding method itself is
    /// outside the rule.
    fn needs_check(&self, method: &MethodDefinition) -> bool;

    /// Whether `current` and `overridden` agree under this rule
    fn is_consistent(&self, current: &MethodDefinition, overridden: &MethodDefinition) -> bool;
}

/// Parameter constraints of an overriding method must match the overridden
/// method's exactly
///
/// Only methods that declare parameter constraints are checked; an
/// unconstrained override is accepted even when the declarations it
/// overrides disagree with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterConstraintsCheck;

fn constraint_keys(constraints: &[ConstraintAnnotation]) -> Vec<String> {
    let mut keys: Vec<String> = constraints
        .iter()
        .map(|c| {
            let params = serde_json::to_string(&c.params).unwrap_or_default();
            format!("{}{params}{:?}", c.kind, c.groups)
        })
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

impl MethodOverrideCheck for ParameterConstraintsCheck {
    fn rule(&self) -> &'static str {
        "parameter-constraints-must-match"
    }

    fn needs_check(&self, method: &MethodDefinition) -> bool {
        method.parameters.iter().any(|p| !p.constraints.is_empty())
    }

    fn is_consistent(&self, current: &MethodDefinition, overridden: &MethodDefinition) -> bool {
        current.parameters.len() == overridden.parameters.len()
            && current
                .parameters
                .iter()
                .zip(&overridden.parameters)
                .all(|(a, b)| constraint_keys(&a.constraints) == constraint_keys(&b.constraints))
    }
}

/// Cascading required by an overridden method must be kept by the
/// overriding one
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeConsistencyCheck;

impl MethodOverrideCheck for CascadeConsistencyCheck {
    fn rule(&self) -> &'static str {
        "cascading-must-be-preserved"
    }

    fn needs_check(&self, method: &MethodDefinition) -> bool {
        !method.parameters.is_empty() || method.return_value.is_some()
    }

    fn is_consistent(&self, current: &MethodDefinition, overridden: &MethodDefinition) -> bool {
        let parameters = current
            .parameters
            .iter()
            .zip(&overridden.parameters)
            .all(|(a, b)| a.cascade || !b.cascade);
        let return_value = match (&current.return_value, &overridden.return_value) {
            (Some(a), Some(b)) => a.cascade || !b.cascade,
            _ => true,
        };
        parameters && return_value
    }
}

/// The default rule set, in evaluation order
#[must_use]
pub fn default_checks() -> Vec<Box<dyn MethodOverrideCheck>> {
    vec![
        Box::new(ParameterConstraintsCheck),
        Box::new(CascadeConsistencyCheck),
    ]
}

/// A method declaration found on a supertype
#[derive(Debug, Clone, Copy)]
pub struct OverriddenMethod<'a> {
    /// Type declaring the method
    pub declaring_type: &'a str,
    /// The declaration
    pub method: &'a MethodDefinition,
}

/// Nearest declaration overridden by `method` in `other_type` or its
/// supertypes
fn overridden_in<'a>(
    introspector: &'a dyn TypeIntrospector,
    current_type: &str,
    method: &MethodDefinition,
    other_type: &'a str,
) -> Option<OverriddenMethod<'a>> {
    let mut queue: VecDeque<&'a str> = VecDeque::from([other_type]);
    let mut seen = HashSet::new();
    while let Some(candidate) = queue.pop_front() {
        if candidate == ROOT_TYPE || !seen.insert(candidate) {
            continue;
        }
        if let Some(found) = introspector
            .declared_methods(candidate)
            .iter()
            .find(|m| introspector.overrides(method, current_type, m, candidate))
        {
            return Some(OverriddenMethod {
                declaring_type: candidate,
                method: found,
            });
        }
        if let Some(parent) = introspector.superclass(candidate) {
            queue.push_back(parent);
        }
        queue.extend(introspector.interfaces(candidate).iter().map(String::as_str));
    }
    None
}

/// Every supertype declaration `method` (declared on `type_name`) overrides
///
/// The type's own interfaces are searched first, then each superclass up to
/// the root together with that superclass's interfaces. Each declaration is
/// reported once.
#[must_use]
pub fn find_overridden_methods<'a>(
    introspector: &'a dyn TypeIntrospector,
    type_name: &str,
    method: &MethodDefinition,
) -> Vec<OverriddenMethod<'a>> {
    let mut found: Vec<OverriddenMethod<'a>> = Vec::new();
    let mut push = |candidate: Option<OverriddenMethod<'a>>| {
        if let Some(candidate) = candidate
            && !found.iter().any(|f| f.declaring_type == candidate.declaring_type)
        {
            found.push(candidate);
        }
    };

    for interface in introspector.interfaces(type_name) {
        push(overridden_in(introspector, type_name, method, interface));
    }

    let mut parent = introspector.superclass(type_name);
    while let Some(current) = parent {
        if current == ROOT_TYPE {
            break;
        }
        push(overridden_in(introspector, type_name, method, current));
        for interface in introspector.interfaces(current) {
            push(overridden_in(introspector, type_name, method, interface));
        }
        parent = introspector.superclass(current);
    }

    found
}

/// Run one rule for `method`, declared on `type_name`
///
/// Nothing is compared unless [`MethodOverrideCheck::needs_check`] accepts
/// `method`. Overridden declarations are then checked pairwise against each
/// other, then the method against each of them. The first disagreement is
/// reported, naming the second declaration of the failing pair.
///
/// # Errors
///
/// Returns [`BuildError::OverrideInconsistency`] on the first disagreement.
pub fn check_method(
    introspector: &dyn TypeIntrospector,
    check: &dyn MethodOverrideCheck,
    type_name: &str,
    method: &MethodDefinition,
) -> Result<(), BuildError> {
    if !check.needs_check(method) {
        return Ok(());
    }
    let overridden = find_overridden_methods(introspector, type_name, method);
    if overridden.is_empty() {
        return Ok(());
    }
    debug!(
        method = %method.signature(),
        type_name,
        rule = check.rule(),
        overridden = overridden.len(),
        "checking override consistency"
    );

    let inconsistency = |conflicting: &str| BuildError::OverrideInconsistency {
        rule: check.rule().to_string(),
        method: method.signature(),
        declaring_type: type_name.to_string(),
        conflicting_type: conflicting.to_string(),
    };

    for (i, first) in overridden.iter().enumerate() {
        for (j, second) in overridden.iter().enumerate() {
            if i != j && !check.is_consistent(first.method, second.method) {
                return Err(inconsistency(second.declaring_type));
            }
        }
    }

    for other in &overridden {
        if !check.is_consistent(method, other.method) {
            return Err(inconsistency(other.declaring_type));
        }
    }

    Ok(())
}

/// Run every rule in order, stopping at the first failure
///
/// # Errors
///
/// Returns the first [`BuildError::OverrideInconsistency`] found.
pub fn check_all(
    introspector: &dyn TypeIntrospector,
    checks: &[Box<dyn MethodOverrideCheck>],
    type_name: &str,
    method: &MethodDefinition,
) -> Result<(), BuildError> {
    checks
        .iter()
        .try_for_each(|check| check_method(introspector, check.as_ref(), type_name, method))
}
