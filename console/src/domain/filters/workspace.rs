//! Filter workspace
//!
//! Holds the two independent filter contexts and tracks which one is
//! active. Switching is refused while the active context holds criteria.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::expression::{FilterExpression, GroupIdPolicy};

/// Which expression the user is editing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FilterContext {
    #[default]
    #[serde(rename = "filterComponent", alias = "filter")]
    FilterComponents,
    #[serde(rename = "triggerFilter", alias = "trigger")]
    TriggerFilters,
}

impl FilterContext {
    /// Catalog category name
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterContext::FilterComponents => "filterComponent",
            FilterContext::TriggerFilters => "triggerFilter",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            FilterContext::FilterComponents => FilterContext::TriggerFilters,
            FilterContext::TriggerFilters => FilterContext::FilterComponents,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, FilterContext::TriggerFilters)
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterContext {
    type Err = String;

    /// Accepts the catalog category names and the short CLI forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "filterComponent" | "filter" => Ok(FilterContext::FilterComponents),
            "triggerFilter" | "trigger" => Ok(FilterContext::TriggerFilters),
            _ => Err(format!(
                "Invalid category '{}'. Valid options: filterComponent, triggerFilter",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterWorkspace {
    filter_components: FilterExpression,
    trigger_filters: FilterExpression,
    active: FilterContext,
}

impl FilterWorkspace {
    pub fn new(policy: GroupIdPolicy) -> Self {
        Self {
            filter_components: FilterExpression::new(policy),
            trigger_filters: FilterExpression::new(policy),
            active: FilterContext::FilterComponents,
        }
    }

    pub fn active_context(&self) -> FilterContext {
        self.active
    }

    pub fn expression(&self, context: FilterContext) -> &FilterExpression {
        match context {
            FilterContext::FilterComponents => &self.filter_components,
            FilterContext::TriggerFilters => &self.trigger_filters,
        }
    }

    pub fn expression_mut(&mut self, context: FilterContext) -> &mut FilterExpression {
        match context {
            FilterContext::FilterComponents => &mut self.filter_components,
            FilterContext::TriggerFilters => &mut self.trigger_filters,
        }
    }

    pub fn active(&self) -> &FilterExpression {
        self.expression(self.active)
    }

    pub fn active_mut(&mut self) -> &mut FilterExpression {
        self.expression_mut(self.active)
    }

    /// Make `target` the active context
    ///
    /// Switching to the already-active context always succeeds.
    pub fn switch_context(&mut self, target: FilterContext) -> Result<(), FilterError> {
        if target == self.active {
            return Ok(());
        }
        if self.active().has_criteria() {
            return Err(FilterError::SwitchBlocked);
        }
        tracing::debug!(from = %self.active, to = %target, "Switching filter context");
        self.active = target;
        Ok(())
    }

    /// Replace a context's expression, e.g. when hydrating a saved filter
    pub fn load(&mut self, context: FilterContext, expression: FilterExpression) {
        *self.expression_mut(context) = expression;
        self.active = context;
    }
}
