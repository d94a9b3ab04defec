//! Filter expressions
//!
//! An expression is the ordered list of groups for one context plus the
//! operator that combines them. All mutations go through methods (or
//! [`FilterCommand`]s) that leave the expression untouched on error.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::catalog::{FieldCatalog, FieldDefinition};
use super::error::FilterError;
use super::group::{CriteriaUpdate, Group};
use super::operators::LogicalOperator;

/// Index whose inter-group operator is authoritative for serialization
pub const AUTHORITATIVE_INTER_INDEX: usize = 1;

/// How new group ids are assigned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupIdPolicy {
    /// `id = groups.len()` at insertion; ids can repeat after deletions
    #[default]
    Positional,
    /// Per-expression counter; ids are never reused
    Monotonic,
}

impl fmt::Display for GroupIdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupIdPolicy::Positional => write!(f, "positional"),
            GroupIdPolicy::Monotonic => write!(f, "monotonic"),
        }
    }
}

impl FromStr for GroupIdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positional" => Ok(GroupIdPolicy::Positional),
            "monotonic" => Ok(GroupIdPolicy::Monotonic),
            _ => Err(format!(
                "Invalid group id policy '{}'. Valid options: positional, monotonic",
                s
            )),
        }
    }
}

/// A single builder action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    AddGroup,
    DeleteGroup {
        group_id: u64,
    },
    DropCriteria {
        group_id: u64,
        field_key: String,
    },
    RemoveCriteria {
        group_id: u64,
        field_key: String,
    },
    UpdateCriteria {
        group_id: u64,
        field_key: String,
        update: CriteriaUpdate,
    },
    SetGroupOperator {
        group_id: u64,
        operator: LogicalOperator,
    },
    SetInterOperator {
        index: usize,
        operator: LogicalOperator,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    groups: Vec<Group>,
    inter_operators: BTreeMap<usize, LogicalOperator>,
    estimated_audience: u64,
    policy: GroupIdPolicy,
    next_id: u64,
}

impl FilterExpression {
    pub fn new(policy: GroupIdPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Rebuild from already-formed groups (used when loading saved filters)
    pub(crate) fn from_parts(
        groups: Vec<Group>,
        inter_operators: BTreeMap<usize, LogicalOperator>,
        estimated_audience: u64,
        policy: GroupIdPolicy,
    ) -> Self {
        let next_id = groups.iter().map(|g| g.id() + 1).max().unwrap_or(0);
        Self {
            groups,
            inter_operators,
            estimated_audience,
            policy,
            next_id,
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn policy(&self) -> GroupIdPolicy {
        self.policy
    }

    pub fn estimated_audience(&self) -> u64 {
        self.estimated_audience
    }

    pub fn set_estimated_audience(&mut self, estimate: u64) {
        self.estimated_audience = estimate;
    }

    /// First group carrying `group_id`
    pub fn group(&self, group_id: u64) -> Option<&Group> {
        self.groups.iter().find(|g| g.id() == group_id)
    }

    fn group_mut(&mut self, group_id: u64) -> Result<&mut Group, FilterError> {
        self.groups
            .iter_mut()
            .find(|g| g.id() == group_id)
            .ok_or(FilterError::GroupNotFound(group_id))
    }

    /// True when any group holds at least one criterion
    pub fn has_criteria(&self) -> bool {
        self.groups.iter().any(|g| !g.is_empty())
    }

    /// Append an empty group and return its id
    pub fn add_group(&mut self) -> u64 {
        let id = match self.policy {
            GroupIdPolicy::Positional => self.groups.len() as u64,
            GroupIdPolicy::Monotonic => self.next_id,
        };
        self.next_id = self.next_id.max(id + 1);
        self.groups.push(Group::new(id));
        id
    }

    /// Remove a group; remaining groups keep their ids
    pub fn delete_group(&mut self, group_id: u64) -> Result<Group, FilterError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id() == group_id)
            .ok_or(FilterError::GroupNotFound(group_id))?;
        Ok(self.groups.remove(pos))
    }

    /// Add a criterion for `field` to a group
    pub fn drop_criteria(
        &mut self,
        field: &FieldDefinition,
        group_id: u64,
    ) -> Result<(), FilterError> {
        self.group_mut(group_id)?.add_criteria(field)
    }

    pub fn remove_criteria(&mut self, group_id: u64, field_key: &str) -> Result<(), FilterError> {
        self.group_mut(group_id)?.remove_criteria(field_key);
        Ok(())
    }

    pub fn update_criteria(
        &mut self,
        group_id: u64,
        field_key: &str,
        update: CriteriaUpdate,
    ) -> Result<(), FilterError> {
        self.group_mut(group_id)?.update_criteria(field_key, update)
    }

    pub fn set_group_operator(
        &mut self,
        group_id: u64,
        operator: LogicalOperator,
    ) -> Result<(), FilterError> {
        self.group_mut(group_id)?.set_operator(operator);
        Ok(())
    }

    /// Store the operator shown before the group at `index`
    pub fn set_inter_operator(&mut self, index: usize, operator: LogicalOperator) {
        self.inter_operators.insert(index, operator);
    }

    /// Stored operator for a boundary (display value; defaults to OR)
    pub fn inter_operator_at(&self, index: usize) -> LogicalOperator {
        self.inter_operators
            .get(&index)
            .copied()
            .unwrap_or(LogicalOperator::Or)
    }

    /// Operator combining groups, `None` when there is at most one group
    pub fn inter_operator(&self) -> Option<LogicalOperator> {
        (self.groups.len() > 1).then(|| self.inter_operator_at(AUTHORITATIVE_INTER_INDEX))
    }

    /// Give every group without a persisted id one of the form
    /// `group-{unix_millis}-{index}`
    pub fn assign_persisted_ids(&mut self, unix_millis: i64) {
        for (index, group) in self.groups.iter_mut().enumerate() {
            if group.persisted_id().is_none() {
                group.set_persisted_id(format!("group-{}-{}", unix_millis, index));
            }
        }
    }

    /// Apply one command; the expression is unchanged when it fails
    pub fn apply(
        &mut self,
        catalog: &FieldCatalog,
        command: FilterCommand,
    ) -> Result<(), FilterError> {
        tracing::trace!(command = ?command, "Applying filter command");
        match command {
            FilterCommand::AddGroup => {
                self.add_group();
                Ok(())
            }
            FilterCommand::DeleteGroup { group_id } => self.delete_group(group_id).map(|_| ()),
            FilterCommand::DropCriteria {
                group_id,
                field_key,
            } => {
                let field = catalog.lookup(&field_key)?;
                self.drop_criteria(field, group_id)
            }
            FilterCommand::RemoveCriteria {
                group_id,
                field_key,
            } => self.remove_criteria(group_id, &field_key),
            FilterCommand::UpdateCriteria {
                group_id,
                field_key,
                update,
            } => self.update_criteria(group_id, &field_key, update),
            FilterCommand::SetGroupOperator { group_id, operator } => {
                self.set_group_operator(group_id, operator)
            }
            FilterCommand::SetInterOperator { index, operator } => {
                self.set_inter_operator(index, operator);
                Ok(())
            }
        }
    }
}

impl fmt::Display for FilterExpression {
    /// One-line summary, e.g. `(Age greaterThan "30") OR (City equals "Boston")`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return write!(f, "(no groups)");
        }
        let joiner = self.inter_operator().unwrap_or_default();
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", joiner)?;
            }
            write!(f, "(")?;
            if group.is_empty() {
                write!(f, "empty")?;
            }
            for (j, c) in group.criteria().iter().enumerate() {
                if j > 0 {
                    write!(f, " {} ", group.operator())?;
                }
                if c.operator().is_unary() {
                    write!(f, "{} {}", c.label(), c.operator())?;
                } else {
                    write!(f, "{} {} {:?}", c.label(), c.operator(), c.value())?;
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
