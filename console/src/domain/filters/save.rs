//! Validation and save pipeline
//!
//! Full saves run five validation stages in order and stop at the first
//! stage that reports anything. Drafts run the structural stages only and
//! fill placeholder details. Nothing reaches the filter store unless
//! validation passes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expression::FilterExpression;
use super::payload::{SavedFilter, conditions};
use super::workspace::{FilterContext, FilterWorkspace};
use crate::core::constants::{
    DEFAULT_DRAFT_DESCRIPTION, DEFAULT_DRAFT_NAME, FILTER_NAME_MAX_LEN, FILTER_NAME_MIN_LEN,
};
use crate::data::{AudienceBackend, BackendError};
use crate::utils::string::{has_alphanumeric, split_tags};

pub const MSG_NO_GROUPS: &str = "Please create at least one group before saving.";
pub const MSG_EMPTY_GROUP: &str = "Each group must have at least one criteria block.";
pub const MSG_NAME_INVALID: &str =
    "Filter name must be 3 to 40 characters and include at least one letter or number.";
pub const MSG_NAME_COPY: &str = "Filter name can't start with 'Copy'";
pub const MSG_DESCRIPTION_INVALID: &str =
    "Description is required and should contain either one letter or number.";
pub const MSG_SAVE_FAILED: &str = "Failed to save filter. Please try again.";

fn blank_values_message(group_id: u64) -> String {
    format!("Please fill all input values inside Group {}.", group_id + 1)
}

/// Create a new filter or update an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    Create,
    Edit { filter_id: String },
}

impl SaveMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, SaveMode::Edit { .. })
    }
}

/// User-entered filter details
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStage {
    Groups,
    Criteria,
    Values,
    Name,
    Description,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationStage::Groups => "groups",
            ValidationStage::Criteria => "criteria",
            ValidationStage::Values => "values",
            ValidationStage::Name => "name",
            ValidationStage::Description => "description",
        };
        f.write_str(name)
    }
}

/// Messages of the first failing stage; displays the latest one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", latest(.messages))]
pub struct ValidationErrors {
    pub stage: ValidationStage,
    pub messages: Vec<String>,
}

fn latest(messages: &[String]) -> &str {
    messages.last().map(String::as_str).unwrap_or_default()
}

impl ValidationErrors {
    fn new(stage: ValidationStage) -> Self {
        Self {
            stage,
            messages: Vec::new(),
        }
    }

    fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Store rejected the payload; the builder state is kept for a retry
    #[error("Failed to save filter. Please try again.")]
    Persistence(#[source] BackendError),
}

/// Stages 1-3: group presence, non-empty groups, filled values
pub fn validate_structure(expression: &FilterExpression) -> Result<(), ValidationErrors> {
    if expression.groups().is_empty() {
        let mut errors = ValidationErrors::new(ValidationStage::Groups);
        errors.push(MSG_NO_GROUPS);
        return Err(errors);
    }

    let mut errors = ValidationErrors::new(ValidationStage::Criteria);
    if expression.groups().iter().any(|g| g.is_empty()) {
        errors.push(MSG_EMPTY_GROUP);
    }
    errors.into_result()?;

    let mut errors = ValidationErrors::new(ValidationStage::Values);
    for group in expression.groups() {
        if group.has_blank_values() {
            errors.push(blank_values_message(group.id()));
        }
    }
    errors.into_result()
}

/// Stages 4-5: name and description; `editing` enables the copy-name rule
pub fn validate_details(details: &FilterDetails, editing: bool) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new(ValidationStage::Name);
    let name = details.name.trim();
    let length = name.chars().count();
    if !(FILTER_NAME_MIN_LEN..=FILTER_NAME_MAX_LEN).contains(&length) || !has_alphanumeric(name) {
        errors.push(MSG_NAME_INVALID);
    }
    if editing && name.to_lowercase().starts_with("copy") {
        errors.push(MSG_NAME_COPY);
    }
    errors.into_result()?;

    let mut errors = ValidationErrors::new(ValidationStage::Description);
    if !has_alphanumeric(details.description.trim()) {
        errors.push(MSG_DESCRIPTION_INVALID);
    }
    errors.into_result()
}

pub fn validate_full(
    expression: &FilterExpression,
    details: &FilterDetails,
    editing: bool,
) -> Result<(), ValidationErrors> {
    validate_structure(expression)?;
    validate_details(details, editing)
}

pub fn validate_draft(expression: &FilterExpression) -> Result<(), ValidationErrors> {
    validate_structure(expression)
}

/// Assemble the persisted payload, assigning missing group ids
pub fn build_saved_filter(
    expression: &mut FilterExpression,
    details: &FilterDetails,
    context: FilterContext,
    is_draft: bool,
    unix_millis: i64,
) -> SavedFilter {
    expression.assign_persisted_ids(unix_millis);

    let or_default = |value: &str, default: &str| {
        let value = value.trim();
        if is_draft && value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };

    SavedFilter {
        id: None,
        name: or_default(&details.name, DEFAULT_DRAFT_NAME),
        description: or_default(&details.description, DEFAULT_DRAFT_DESCRIPTION),
        tags: split_tags(&details.tags),
        conditions: conditions(expression),
        is_draft,
        is_trigger_filter: context.is_trigger(),
        logical_operator: expression.inter_operator(),
        estimated_audience: expression.estimated_audience(),
    }
}

/// Result of a successful save
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub filter_id: String,
    pub filter: SavedFilter,
}

/// Validates the active context and submits it to the filter store
#[derive(Debug, Clone)]
pub struct SaveService {
    backend: Arc<dyn AudienceBackend>,
}

impl SaveService {
    pub fn new(backend: Arc<dyn AudienceBackend>) -> Self {
        Self { backend }
    }

    pub async fn save(
        &self,
        workspace: &mut FilterWorkspace,
        details: &FilterDetails,
        mode: &SaveMode,
    ) -> Result<SaveOutcome, SaveError> {
        validate_full(workspace.active(), details, mode.is_edit())?;
        self.submit(workspace, details, mode, false).await
    }

    pub async fn save_draft(
        &self,
        workspace: &mut FilterWorkspace,
        details: &FilterDetails,
        mode: &SaveMode,
    ) -> Result<SaveOutcome, SaveError> {
        validate_draft(workspace.active())?;
        self.submit(workspace, details, mode, true).await
    }

    async fn submit(
        &self,
        workspace: &mut FilterWorkspace,
        details: &FilterDetails,
        mode: &SaveMode,
        is_draft: bool,
    ) -> Result<SaveOutcome, SaveError> {
        let context = workspace.active_context();
        let now = chrono::Utc::now().timestamp_millis();
        let filter = build_saved_filter(workspace.active_mut(), details, context, is_draft, now);

        let result = match mode {
            SaveMode::Create => self.backend.create_filter(&filter).await,
            SaveMode::Edit { filter_id } => self
                .backend
                .update_filter(filter_id, &filter)
                .await
                .map(|_| filter_id.clone()),
        };

        match result {
            Ok(filter_id) => {
                tracing::info!(
                    filter_id = %filter_id,
                    name = %filter.name,
                    draft = is_draft,
                    "Filter saved"
                );
                Ok(SaveOutcome { filter_id, filter })
            }
            Err(e) => {
                tracing::error!(backend = self.backend.name(), error = %e, "Failed to save filter");
                Err(SaveError::Persistence(e))
            }
        }
    }
}
