//! Group composition resolution
//!
//! Group definitions are checked once, when the resolver is created: unknown
//! references, cyclic inheritance and cyclic sequences are build errors.
//! Resolution afterwards only expands names.

use super::{ChainUnit, Group, GroupChain};
use graphguard_core::{BuildError, DEFAULT_GROUP, ModelDefinition};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Expands requested groups into a [`GroupChain`]
#[derive(Debug, Clone, Default)]
pub struct GroupResolver {
    /// Plain groups with their transitive parents
    inherited: HashMap<String, Vec<String>>,
    /// Sequences expanded to plain groups
    sequences: IndexMap<String, Vec<String>>,
    /// Redefined default sequences by type, expanded to plain groups
    default_sequences: HashMap<String, Vec<String>>,
}

impl GroupResolver {
    /// Check the model's group definitions and prepare expansion tables
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownGroup`] for references to undeclared
    /// groups, [`BuildError::CyclicHierarchy`] for cyclic inheritance,
    /// [`BuildError::CyclicSequence`] for sequences containing themselves and
    /// [`BuildError::InvalidDefaultSequence`] for malformed redefinitions of
    /// a type's default group.
    pub fn new(model: &ModelDefinition) -> Result<Self, BuildError> {
        let mut resolver = Self::default();

        for (name, group) in &model.groups {
            for parent in &group.extends {
                if !is_declared(model, parent) {
                    return Err(BuildError::UnknownGroup(parent.clone()));
                }
            }
            let mut inherited = Vec::new();
            collect_parents(model, name, &mut vec![name.clone()], &mut inherited)?;
            resolver.inherited.insert(name.clone(), inherited);
        }

        for (name, group) in &model.groups {
            if group.sequence.is_some() {
                let mut stack = Vec::new();
                let expanded = expand_sequence(model, name, &mut stack)?;
                resolver.sequences.insert(name.clone(), expanded);
            }
        }

        for (type_name, definition) in &model.types {
            let Some(sequence) = &definition.group_sequence else {
                continue;
            };
            let expanded = resolver.expand_default_sequence(model, type_name, sequence)?;
            resolver
                .default_sequences
                .insert(type_name.clone(), expanded);
        }

        Ok(resolver)
    }

    fn expand_default_sequence(
        &self,
        model: &ModelDefinition,
        type_name: &str,
        sequence: &[String],
    ) -> Result<Vec<String>, BuildError> {
        if !sequence.iter().any(|g| g == type_name) {
            return Err(BuildError::InvalidDefaultSequence {
                type_name: type_name.to_string(),
                reason: format!("the sequence must contain '{type_name}' itself"),
            });
        }
        let mut expanded = Vec::new();
        for member in sequence {
            if member == DEFAULT_GROUP {
                return Err(BuildError::InvalidDefaultSequence {
                    type_name: type_name.to_string(),
                    reason: format!("'{DEFAULT_GROUP}' cannot appear in a redefined default sequence"),
                });
            }
            if member == type_name {
                push_unique(&mut expanded, DEFAULT_GROUP.to_string());
            } else if let Some(steps) = self.sequences.get(member) {
                for step in steps {
                    push_unique(&mut expanded, step.clone());
                }
            } else if model.groups.contains_key(member) {
                push_unique(&mut expanded, member.clone());
            } else {
                return Err(BuildError::UnknownGroup(member.clone()));
            }
        }
        Ok(expanded)
    }

    /// Resolve requested groups for a validation rooted at `root_type`
    ///
    /// An empty request means the default group. The default group expands
    /// to the root type's redefined default sequence when it has one;
    /// cascaded objects expand it again for their own type through
    /// [`GroupResolver::default_sequence`].
    /// Duplicate units are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownGroup`] if a requested group is not
    /// declared.
    pub fn resolve<S: AsRef<str>>(
        &self,
        requested: &[S],
        root_type: Option<&str>,
    ) -> Result<GroupChain, BuildError> {
        let requested: Vec<&str> = if requested.is_empty() {
            vec![DEFAULT_GROUP]
        } else {
            requested.iter().map(|s| s.as_ref()).collect()
        };

        let mut units = Vec::new();
        let mut seen = HashSet::new();
        for name in requested {
            let unit = if name == DEFAULT_GROUP {
                match root_type.and_then(|t| self.default_sequences.get(t).map(|s| (t, s))) {
                    Some((type_name, steps)) => ChainUnit::Sequence {
                        name: type_name.to_string(),
                        steps: steps.iter().map(|s| self.group(s)).collect(),
                    },
                    None => ChainUnit::Group(Group::default_group()),
                }
            } else if let Some(steps) = self.sequences.get(name) {
                ChainUnit::Sequence {
                    name: name.to_string(),
                    steps: steps.iter().map(|s| self.group(s)).collect(),
                }
            } else if self.inherited.contains_key(name) {
                ChainUnit::Group(self.group(name))
            } else {
                return Err(BuildError::UnknownGroup(name.to_string()));
            };
            if seen.insert(unit.name().to_string()) {
                units.push(unit);
            }
        }

        let chain = GroupChain::new(units);
        trace!(groups = ?chain.group_names(), "resolved group chain");
        Ok(chain)
    }

    /// Steps of the redefined default sequence of `type_name`, if it has one
    ///
    /// The type's own name appears as the default group.
    #[must_use]
    pub fn default_sequence(&self, type_name: &str) -> Option<Vec<Group>> {
        self.default_sequences
            .get(type_name)
            .map(|steps| steps.iter().map(|s| self.group(s)).collect())
    }

    /// A plain group with its inherited groups; unknown names (and the
    /// default group) have none
    #[must_use]
    pub fn group(&self, name: &str) -> Group {
        Group::new(name, self.inherited.get(name).cloned().unwrap_or_default())
    }

    /// Whether `name` can be requested
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        name == DEFAULT_GROUP || self.inherited.contains_key(name)
    }
}

fn is_declared(model: &ModelDefinition, name: &str) -> bool {
    name == DEFAULT_GROUP || model.groups.contains_key(name)
}

fn push_unique(into: &mut Vec<String>, name: String) {
    if !into.contains(&name) {
        into.push(name);
    }
}

fn collect_parents(
    model: &ModelDefinition,
    name: &str,
    stack: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), BuildError> {
    let Some(group) = model.groups.get(name) else {
        return Ok(());
    };
    for parent in &group.extends {
        if stack.contains(parent) {
            return Err(BuildError::CyclicHierarchy(parent.clone()));
        }
        push_unique(out, parent.clone());
        stack.push(parent.clone());
        collect_parents(model, parent, stack, out)?;
        stack.pop();
    }
    Ok(())
}

fn expand_sequence(
    model: &ModelDefinition,
    name: &str,
    stack: &mut Vec<String>,
) -> Result<Vec<String>, BuildError> {
    if let Some(position) = stack.iter().position(|s| s == name) {
        let mut cycle = stack[position..].to_vec();
        cycle.push(name.to_string());
        return Err(BuildError::CyclicSequence { cycle });
    }
    let Some(members) = model.groups.get(name).and_then(|g| g.sequence.as_ref()) else {
        return Ok(vec![name.to_string()]);
    };

    stack.push(name.to_string());
    let mut expanded = Vec::new();
    for member in members {
        if !is_declared(model, member) {
            return Err(BuildError::UnknownGroup(member.clone()));
        }
        for step in expand_sequence(model, member, stack)? {
            push_unique(&mut expanded, step);
        }
    }
    stack.pop();
    Ok(expanded)
}
