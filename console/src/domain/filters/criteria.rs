//! Applied criteria

use super::catalog::FieldDefinition;
use super::error::FilterError;
use super::operators::{DataType, Operator};

/// One field/operator/value condition inside a group
///
/// The field identity is fixed at creation. The value stays raw text until
/// it is evaluated or serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaInstance {
    field_key: String,
    label: String,
    data_type: DataType,
    allowed_operators: Vec<Operator>,
    operator: Operator,
    value: String,
}

impl CriteriaInstance {
    /// Create with the field's first allowed operator and an empty value
    pub fn create(field: &FieldDefinition) -> Self {
        Self {
            field_key: field.key().to_string(),
            label: field.label().to_string(),
            data_type: field.data_type(),
            allowed_operators: field.allowed_operators().to_vec(),
            operator: field.default_operator(),
            value: String::new(),
        }
    }

    /// Create with an explicit initial operator
    pub fn with_operator(field: &FieldDefinition, operator: Operator) -> Result<Self, FilterError> {
        let mut instance = Self::create(field);
        instance.set_operator(operator)?;
        Ok(instance)
    }

    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn allowed_operators(&self) -> &[Operator] {
        &self.allowed_operators
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_operator(&mut self, operator: Operator) -> Result<(), FilterError> {
        if !self.allowed_operators.contains(&operator) {
            return Err(FilterError::invalid_operator(&self.field_key, operator));
        }
        self.operator = operator;
        Ok(())
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// True when the value is empty or whitespace only
    pub fn has_blank_value(&self) -> bool {
        self.value.trim().is_empty()
    }
}
