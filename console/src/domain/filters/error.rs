//! Filter builder errors
//!
//! Every variant is recoverable: the operation that produced it is aborted
//! and the builder state is left exactly as it was.

use thiserror::Error;

use super::operators::{DataType, Operator};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Field already present in the target group
    #[error("Cannot drag \"{label}\" as it already exists in this group.")]
    DuplicateField { label: String },

    /// Operator not permitted for the field
    #[error("Operator '{operator}' is not allowed for field '{field}'")]
    InvalidOperator { field: String, operator: Operator },

    /// Active context already holds criteria
    #[error("As already added 1 block, cannot switch tab")]
    SwitchBlocked,

    /// Field key not present in the catalog
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// No group carries the requested id
    #[error("Group {0} not found")]
    GroupNotFound(u64),

    /// Catalog entry rejected while building the catalog
    #[error("Invalid field '{key}': {reason}")]
    InvalidField { key: String, reason: String },
}

impl FilterError {
    pub fn invalid_operator(field: impl Into<String>, operator: Operator) -> Self {
        Self::InvalidOperator {
            field: field.into(),
            operator,
        }
    }

    pub fn invalid_field(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_operator(key: &str, data_type: DataType, operator: Operator) -> Self {
        Self::invalid_field(
            key,
            format!("operator '{}' is not valid for {} fields", operator, data_type),
        )
    }
}
