//! Custom criteria blocks
//!
//! Users can register new catalog fields. The request is validated locally,
//! every problem reported at once, before anything is sent to the backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::CatalogEntry;
use super::operators::{DataType, Operator};
use super::workspace::FilterContext;
use crate::core::constants::{BLOCK_NAME_MAX_LEN, BLOCK_NAME_MIN_LEN};
use crate::data::{AudienceBackend, BackendError};
use crate::utils::string::slugify;

pub const MSG_DATA_TYPE_REQUIRED: &str = "Data Type is required.";
pub const MSG_BLOCK_NAME_REQUIRED: &str = "Block Name is required.";
pub const MSG_OPERATOR_REQUIRED: &str = "Operator field is required.";
pub const MSG_BLOCK_NAME_INVALID: &str =
    "Block name should be 3-30 characters and contain only valid characters.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomFieldRequest {
    pub label: String,
    pub data_type: String,
    pub operator: String,
}

#[derive(Error, Debug)]
pub enum CustomFieldError {
    #[error("{}", latest(.0))]
    Invalid(Vec<String>),

    #[error("Failed to create criteria block: {0}")]
    Backend(#[from] BackendError),
}

fn latest(messages: &[String]) -> &str {
    messages.last().map(String::as_str).unwrap_or_default()
}

/// Letters, digits and whitespace only, 3-30 characters
fn is_valid_block_name(label: &str) -> bool {
    let length = label.chars().count();
    (BLOCK_NAME_MIN_LEN..=BLOCK_NAME_MAX_LEN).contains(&length)
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
}

impl CustomFieldRequest {
    /// Validate and convert to the catalog entry sent to the backend
    pub fn to_entry(&self, context: FilterContext) -> Result<CatalogEntry, CustomFieldError> {
        let mut messages = Vec::new();

        let data_type = self
            .data_type
            .parse::<DataType>()
            .ok()
            .filter(|dt| *dt != DataType::Boolean);
        if data_type.is_none() {
            messages.push(MSG_DATA_TYPE_REQUIRED.to_string());
        }

        let label = self.label.trim();
        if label.is_empty() {
            messages.push(MSG_BLOCK_NAME_REQUIRED.to_string());
        }

        let operator = self.operator.trim();
        if operator.is_empty() {
            messages.push(MSG_OPERATOR_REQUIRED.to_string());
        } else if let Some(dt) = data_type {
            let supported = operator
                .parse::<Operator>()
                .is_ok_and(|op| dt.supports(op));
            if !supported {
                messages.push(format!(
                    "Operator '{}' is not valid for {} fields",
                    operator, dt
                ));
            }
        }

        // Raw label, checked whether or not it is blank
        if !is_valid_block_name(&self.label) {
            messages.push(MSG_BLOCK_NAME_INVALID.to_string());
        }

        let Some(data_type) = data_type.filter(|_| messages.is_empty()) else {
            return Err(CustomFieldError::Invalid(messages));
        };

        Ok(CatalogEntry {
            key: slugify(label),
            label: label.to_string(),
            data_type: data_type.as_str().to_string(),
            category: context.as_str().to_string(),
            operators: vec![operator.to_string()],
        })
    }
}

/// Validate a request and register it with the backend
pub async fn create_custom_field(
    backend: &dyn AudienceBackend,
    request: &CustomFieldRequest,
    context: FilterContext,
) -> Result<CatalogEntry, CustomFieldError> {
    let entry = request.to_entry(context)?;
    backend.create_field(&entry).await?;
    tracing::info!(key = %entry.key, category = %entry.category, "Criteria block created");
    Ok(entry)
}
