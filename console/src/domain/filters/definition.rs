//! Declarative filter definitions
//!
//! A definition file describes a filter the way a user would build it. It is
//! replayed through the builder session one command at a time, so catalog
//! lookups, duplicate checks and operator rules all apply as they would
//! interactively.

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::expression::FilterCommand;
use super::group::CriteriaUpdate;
use super::operators::{LogicalOperator, Operator};
use super::save::FilterDetails;
use super::session::BuilderSession;
use super::workspace::FilterContext;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionDefinition {
    pub field: String,
    /// Defaults to the field's first allowed operator
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub criteria: Vec<CriterionDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDefinition {
    #[serde(default)]
    pub context: FilterContext,
    #[serde(default)]
    pub details: FilterDetails,
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
    /// Operator between every pair of adjacent groups
    #[serde(default)]
    pub inter_operator: Option<LogicalOperator>,
}

impl FilterDefinition {
    /// Replay the definition into the session's matching context
    pub fn replay(&self, session: &mut BuilderSession) -> Result<(), FilterError> {
        if session.workspace().active_context() != self.context {
            session.switch_context(self.context)?;
        }

        for group in &self.groups {
            session.apply(FilterCommand::AddGroup)?;
            let Some(group_id) = session.workspace().active().groups().last().map(|g| g.id())
            else {
                continue;
            };

            for criterion in &group.criteria {
                session.apply(FilterCommand::DropCriteria {
                    group_id,
                    field_key: criterion.field.clone(),
                })?;
                if let Some(operator) = criterion.operator {
                    session.apply(FilterCommand::UpdateCriteria {
                        group_id,
                        field_key: criterion.field.clone(),
                        update: CriteriaUpdate::Operator(operator),
                    })?;
                }
                if !criterion.value.is_empty() {
                    session.apply(FilterCommand::UpdateCriteria {
                        group_id,
                        field_key: criterion.field.clone(),
                        update: CriteriaUpdate::Value(criterion.value.clone()),
                    })?;
                }
            }

            if group.operator != LogicalOperator::default() {
                session.apply(FilterCommand::SetGroupOperator {
                    group_id,
                    operator: group.operator,
                })?;
            }
        }

        if let Some(operator) = self.inter_operator {
            for index in 1..self.groups.len() {
                session.apply(FilterCommand::SetInterOperator { index, operator })?;
            }
        }

        tracing::debug!(
            context = %self.context,
            groups = self.groups.len(),
            "Filter definition replayed"
        );
        Ok(())
    }
}
