//! Validation groups and group chains
//!
//! Requested groups are resolved into a [`GroupChain`]: an ordered list of
//! units, each a single [`Group`] or a sequence of groups that stops at the
//! first step producing violations.

pub mod resolver;

pub use resolver::GroupResolver;

use graphguard_core::DEFAULT_GROUP;

/// A group as seen during traversal: its name and every group it inherits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<String>,
}

impl Group {
    /// Create a group; `inherited` are the (transitive) parents
    #[must_use]
    pub fn new(name: impl Into<String>, inherited: Vec<String>) -> Self {
        let name = name.into();
        let mut members = Vec::with_capacity(inherited.len() + 1);
        members.push(name.clone());
        for parent in inherited {
            if !members.contains(&parent) {
                members.push(parent);
            }
        }
        Self { name, members }
    }

    /// The universal default group
    #[must_use]
    pub fn default_group() -> Self {
        Self::new(DEFAULT_GROUP, Vec::new())
    }

    /// Group name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group itself followed by its inherited groups
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Whether constraints of `group` are validated when this group is active
    #[must_use]
    pub fn includes(&self, group: &str) -> bool {
        self.members.iter().any(|m| m == group)
    }
}

/// One unit of a group chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainUnit {
    /// A single group
    Group(Group),
    /// Groups validated in order; the first step with violations ends the
    /// sequence
    Sequence {
        /// Sequence name (or the type name for a redefined default)
        name: String,
        /// Steps in order
        steps: Vec<Group>,
    },
}

impl ChainUnit {
    /// Unit name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => group.name(),
            Self::Sequence { name, .. } => name,
        }
    }

    /// Groups of the unit in execution order
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        match self {
            Self::Group(group) => std::slice::from_ref(group),
            Self::Sequence { steps, .. } => steps,
        }
    }

    /// Whether the unit short-circuits on failure
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence { .. })
    }
}

/// Ordered units to execute for one validation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupChain {
    units: Vec<ChainUnit>,
}

impl GroupChain {
    pub(crate) fn new(units: Vec<ChainUnit>) -> Self {
        Self { units }
    }

    /// Units in execution order
    #[must_use]
    pub fn units(&self) -> &[ChainUnit] {
        &self.units
    }

    /// Number of units
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Every distinct group name in order of first execution, sequences
    /// flattened
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for group in self.units.iter().flat_map(ChainUnit::groups) {
            if !names.iter().any(|n| n == group.name()) {
                names.push(group.name().to_string());
            }
        }
        names
    }
}
