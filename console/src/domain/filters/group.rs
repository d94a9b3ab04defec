//! Criteria groups

use super::catalog::FieldDefinition;
use super::criteria::CriteriaInstance;
use super::error::FilterError;
use super::operators::{LogicalOperator, Operator};

/// Which criteria attribute an update targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaUpdate {
    Operator(Operator),
    Value(String),
}

/// Ordered criteria combined by one intra-group operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: u64,
    persisted_id: Option<String>,
    criteria: Vec<CriteriaInstance>,
    operator: LogicalOperator,
}

impl Group {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            persisted_id: None,
            criteria: Vec::new(),
            operator: LogicalOperator::And,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stable `groupId` carried by a saved filter, if any
    pub fn persisted_id(&self) -> Option<&str> {
        self.persisted_id.as_deref()
    }

    pub fn set_persisted_id(&mut self, persisted_id: impl Into<String>) {
        self.persisted_id = Some(persisted_id.into());
    }

    pub fn criteria(&self) -> &[CriteriaInstance] {
        &self.criteria
    }

    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    pub fn set_operator(&mut self, operator: LogicalOperator) {
        self.operator = operator;
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn contains_field(&self, field_key: &str) -> bool {
        self.criteria.iter().any(|c| c.field_key() == field_key)
    }

    /// Append a criterion for `field` with its default operator
    pub fn add_criteria(&mut self, field: &FieldDefinition) -> Result<(), FilterError> {
        self.push(CriteriaInstance::create(field))
    }

    /// Append an already-built criterion, enforcing field uniqueness
    pub fn push(&mut self, criteria: CriteriaInstance) -> Result<(), FilterError> {
        if self.contains_field(criteria.field_key()) {
            return Err(FilterError::DuplicateField {
                label: criteria.label().to_string(),
            });
        }
        self.criteria.push(criteria);
        Ok(())
    }

    /// Remove the criterion for `field_key`; no-op when absent
    pub fn remove_criteria(&mut self, field_key: &str) {
        self.criteria.retain(|c| c.field_key() != field_key);
    }

    /// Update one attribute of the criterion for `field_key`; no-op when absent
    pub fn update_criteria(
        &mut self,
        field_key: &str,
        update: CriteriaUpdate,
    ) -> Result<(), FilterError> {
        let Some(criteria) = self.criteria.iter_mut().find(|c| c.field_key() == field_key) else {
            return Ok(());
        };
        match update {
            CriteriaUpdate::Operator(op) => criteria.set_operator(op),
            CriteriaUpdate::Value(value) => {
                criteria.set_value(value);
                Ok(())
            }
        }
    }

    /// True when any criterion has a blank value
    pub fn has_blank_values(&self) -> bool {
        self.criteria.iter().any(CriteriaInstance::has_blank_value)
    }
}
