//! Wire payloads
//!
//! JSON shapes exchanged with the estimation service and the filter store,
//! plus the conversions between them and [`FilterExpression`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::{FieldCatalog, FieldDefinition};
use super::criteria::CriteriaInstance;
use super::expression::{FilterExpression, GroupIdPolicy};
use super::group::Group;
use super::operators::{DataType, LogicalOperator, Operator};
use super::workspace::FilterContext;

/// `groupId` as sent on the wire: a position or a persisted string id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GroupRef {
    Index(u64),
    Key(String),
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Index(i) => write!(f, "{}", i),
            GroupRef::Key(k) => f.write_str(k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CriterionPayload {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPayload {
    pub group_id: GroupRef,
    #[serde(default)]
    pub group_operator: LogicalOperator,
    #[serde(default)]
    pub criteria: Vec<CriterionPayload>,
}

/// Body of `POST /filters/estimate`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub conditions: Vec<ConditionPayload>,
    pub logical_operator: LogicalOperator,
}

impl EstimateRequest {
    /// Snapshot of an expression; a single group serializes as AND
    pub fn from_expression(expression: &FilterExpression) -> Self {
        Self {
            conditions: conditions(expression),
            logical_operator: expression.inter_operator().unwrap_or(LogicalOperator::And),
        }
    }
}

/// Persisted filter definition
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    /// Store-assigned id, present on records read back from the store
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub conditions: Vec<ConditionPayload>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_trigger_filter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
    #[serde(default)]
    pub estimated_audience: u64,
}

impl SavedFilter {
    pub fn context(&self) -> FilterContext {
        if self.is_trigger_filter {
            FilterContext::TriggerFilters
        } else {
            FilterContext::FilterComponents
        }
    }

    /// Rebuild the builder expression for edit mode
    pub fn to_expression(&self, catalog: &FieldCatalog, policy: GroupIdPolicy) -> FilterExpression {
        let mut expression = FilterExpression::from_saved(
            &self.conditions,
            self.logical_operator,
            catalog,
            self.context(),
            policy,
        );
        expression.set_estimated_audience(self.estimated_audience);
        expression
    }
}

/// Serialize the groups of an expression in order
pub fn conditions(expression: &FilterExpression) -> Vec<ConditionPayload> {
    expression
        .groups()
        .iter()
        .enumerate()
        .map(|(index, group)| ConditionPayload {
            group_id: match group.persisted_id() {
                Some(id) => GroupRef::Key(id.to_string()),
                None => GroupRef::Index(index as u64),
            },
            group_operator: group.operator(),
            criteria: group
                .criteria()
                .iter()
                .map(|c| CriterionPayload {
                    field: c.field_key().to_string(),
                    operator: c.operator(),
                    value: c.value().to_string(),
                })
                .collect(),
        })
        .collect()
}

impl FilterExpression {
    /// Rebuild an expression from saved conditions
    ///
    /// Saved operators are always kept. A field missing from the catalog
    /// falls back to a definition that only allows the saved operator, and a
    /// catalog field that dropped the operator gets it appended. Every group
    /// boundary receives the saved logical operator.
    pub fn from_saved(
        conditions: &[ConditionPayload],
        logical_operator: Option<LogicalOperator>,
        catalog: &FieldCatalog,
        context: FilterContext,
        policy: GroupIdPolicy,
    ) -> Self {
        let mut groups = Vec::with_capacity(conditions.len());
        for (index, condition) in conditions.iter().enumerate() {
            let mut group = Group::new(index as u64);
            group.set_operator(condition.group_operator);
            if let GroupRef::Key(id) = &condition.group_id {
                group.set_persisted_id(id.clone());
            }
            for criterion in &condition.criteria {
                let Some(mut instance) = hydrate_criterion(criterion, catalog, context) else {
                    continue;
                };
                instance.set_value(criterion.value.clone());
                if let Err(e) = group.push(instance) {
                    tracing::warn!(group = index, error = %e, "Dropping saved criterion");
                }
            }
            groups.push(group);
        }

        let mut inter_operators = BTreeMap::new();
        if let Some(op) = logical_operator {
            for index in 1..groups.len() {
                inter_operators.insert(index, op);
            }
        }

        Self::from_parts(groups, inter_operators, 0, policy)
    }
}

fn hydrate_criterion(
    criterion: &CriterionPayload,
    catalog: &FieldCatalog,
    context: FilterContext,
) -> Option<CriteriaInstance> {
    let field = match catalog.lookup(&criterion.field) {
        Ok(field) if field.allows(criterion.operator) => {
            return CriteriaInstance::with_operator(field, criterion.operator).ok();
        }
        Ok(field) => {
            tracing::warn!(
                field = %criterion.field,
                operator = %criterion.operator,
                "Saved operator no longer offered by the catalog, keeping it"
            );
            widened_field(field, criterion.operator)
                .or_else(|| fallback_field(&criterion.field, criterion.operator, context))?
        }
        Err(_) => {
            tracing::debug!(field = %criterion.field, "Saved field not in catalog, using fallback");
            fallback_field(&criterion.field, criterion.operator, context)?
        }
    };
    CriteriaInstance::with_operator(&field, criterion.operator).ok()
}

/// Catalog definition with the saved operator added to its allowed set
fn widened_field(field: &FieldDefinition, operator: Operator) -> Option<FieldDefinition> {
    let operators = field.allowed_operators().iter().copied().chain([operator]);
    FieldDefinition::new(
        field.key(),
        field.label(),
        field.data_type(),
        operators,
        field.category(),
    )
    .ok()
}

/// Minimal definition for a saved field the catalog no longer offers
fn fallback_field(key: &str, operator: Operator, context: FilterContext) -> Option<FieldDefinition> {
    let data_type = [DataType::String, DataType::Number, DataType::Date]
        .into_iter()
        .find(|dt| dt.supports(operator))?;
    match FieldDefinition::new(key, key, data_type, [operator], context) {
        Ok(field) => Some(field),
        Err(e) => {
            tracing::warn!(field = %key, error = %e, "Dropping saved criterion");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::catalog::CatalogEntry;
    use crate::domain::filters::group::CriteriaUpdate;

    fn catalog() -> FieldCatalog {
        let entry = |key: &str, label: &str, ty: &str, ops: &[&str]| CatalogEntry {
            key: key.to_string(),
            label: label.to_string(),
            data_type: ty.to_string(),
            category: "filterComponent".to_string(),
            operators: ops.iter().map(|s| s.to_string()).collect(),
        };
        FieldCatalog::from_entries(vec![
            entry("age", "Age", "number", &["greaterThan", "lessThan", "between"]),
            entry("city", "City", "string", &["equals", "contains"]),
            entry("signup", "Signup Date", "date", &["before", "after"]),
        ])
    }

    fn sample_expression(catalog: &FieldCatalog) -> FilterExpression {
        let mut expr = FilterExpression::default();
        let a = expr.add_group();
        let b = expr.add_group();
        expr.drop_criteria(catalog.lookup("age").unwrap(), a).unwrap();
        expr.update_criteria(a, "age", CriteriaUpdate::Value("30".into()))
            .unwrap();
        expr.drop_criteria(catalog.lookup("city").unwrap(), a).unwrap();
        expr.update_criteria(a, "city", CriteriaUpdate::Operator(Operator::Contains))
            .unwrap();
        expr.update_criteria(a, "city", CriteriaUpdate::Value("bos".into()))
            .unwrap();
        expr.set_group_operator(a, LogicalOperator::Or).unwrap();
        expr.drop_criteria(catalog.lookup("signup").unwrap(), b).unwrap();
        expr.update_criteria(b, "signup", CriteriaUpdate::Value("2024-01-01".into()))
            .unwrap();
        expr.set_inter_operator(1, LogicalOperator::And);
        expr
    }

    #[test]
    fn test_estimate_request_shape() {
        let catalog = catalog();
        let expr = sample_expression(&catalog);
        let json = serde_json::to_value(EstimateRequest::from_expression(&expr)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "conditions": [
                    {
                        "groupId": 0,
                        "groupOperator": "OR",
                        "criteria": [
                            {"field": "age", "operator": "greaterThan", "value": "30"},
                            {"field": "city", "operator": "contains", "value": "bos"}
                        ]
                    },
                    {
                        "groupId": 1,
                        "groupOperator": "AND",
                        "criteria": [
                            {"field": "signup", "operator": "before", "value": "2024-01-01"}
                        ]
                    }
                ],
                "logicalOperator": "AND"
            })
        );
    }

    #[test]
    fn test_single_group_estimate_uses_and() {
        let mut expr = FilterExpression::default();
        expr.add_group();
        expr.set_inter_operator(1, LogicalOperator::Or);
        let req = EstimateRequest::from_expression(&expr);
        assert_eq!(req.logical_operator, LogicalOperator::And);
    }

    #[test]
    fn test_group_id_uses_persisted_id() {
        let mut expr = FilterExpression::default();
        expr.add_group();
        expr.add_group();
        expr.assign_persisted_ids(42);
        let conds = conditions(&expr);
        assert_eq!(conds[1].group_id, GroupRef::Key("group-42-1".into()));
        let json = serde_json::to_value(&conds[1]).unwrap();
        assert_eq!(json["groupId"], "group-42-1");
    }

    #[test]
    fn test_saved_filter_omits_logical_operator() {
        let saved = SavedFilter {
            id: None,
            name: "Summer Sale".into(),
            description: "Buyers".into(),
            tags: vec![],
            conditions: vec![],
            is_draft: false,
            is_trigger_filter: false,
            logical_operator: None,
            estimated_audience: 12,
        };
        let json = serde_json::to_value(&saved).unwrap();
        assert!(json.get("logicalOperator").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["isTriggerFilter"], false);
        assert_eq!(json["estimatedAudience"], 12);
    }

    #[test]
    fn test_round_trip_through_saved_conditions() {
        let catalog = catalog();
        let expr = sample_expression(&catalog);
        let conds = conditions(&expr);

        let rebuilt = FilterExpression::from_saved(
            &conds,
            expr.inter_operator(),
            &catalog,
            FilterContext::FilterComponents,
            GroupIdPolicy::Positional,
        );

        assert_eq!(conditions(&rebuilt), conds);
        assert_eq!(rebuilt.inter_operator(), Some(LogicalOperator::And));
        assert_eq!(rebuilt.inter_operator_at(1), LogicalOperator::And);
    }

    #[test]
    fn test_from_saved_unknown_field_falls_back() {
        let catalog = catalog();
        let conds = vec![ConditionPayload {
            group_id: GroupRef::Key("group-1-0".into()),
            group_operator: LogicalOperator::And,
            criteria: vec![CriterionPayload {
                field: "score".into(),
                operator: Operator::GreaterThanOrEqual,
                value: "10".into(),
            }],
        }];
        let expr = FilterExpression::from_saved(
            &conds,
            None,
            &catalog,
            FilterContext::FilterComponents,
            GroupIdPolicy::Positional,
        );
        let c = &expr.groups()[0].criteria()[0];
        assert_eq!(c.field_key(), "score");
        assert_eq!(c.operator(), Operator::GreaterThanOrEqual);
        assert_eq!(c.allowed_operators(), &[Operator::GreaterThanOrEqual]);
        assert_eq!(c.value(), "10");
        assert_eq!(expr.groups()[0].persisted_id(), Some("group-1-0"));
        assert_eq!(expr.inter_operator(), None);
    }

    #[test]
    fn test_from_saved_keeps_operator_dropped_by_catalog() {
        let catalog = FieldCatalog::from_entries(vec![CatalogEntry {
            key: "age".into(),
            label: "Age".into(),
            data_type: "number".into(),
            category: "filterComponent".into(),
            operators: vec!["greaterThan".into()],
        }]);
        let conds = vec![ConditionPayload {
            group_id: GroupRef::Index(0),
            group_operator: LogicalOperator::And,
            criteria: vec![CriterionPayload {
                field: "age".into(),
                operator: Operator::LessThan,
                value: "30".into(),
            }],
        }];
        let expr = FilterExpression::from_saved(
            &conds,
            None,
            &catalog,
            FilterContext::FilterComponents,
            GroupIdPolicy::Positional,
        );

        let c = &expr.groups()[0].criteria()[0];
        assert_eq!(c.operator(), Operator::LessThan);
        assert_eq!(c.label(), "Age");
        assert_eq!(c.allowed_operators(), &[Operator::GreaterThan, Operator::LessThan]);
        assert_eq!(conditions(&expr), conds);
    }

    #[test]
    fn test_from_saved_skips_duplicate_field() {
        let catalog = catalog();
        let crit = CriterionPayload {
            field: "city".into(),
            operator: Operator::Equals,
            value: "x".into(),
        };
        let conds = vec![ConditionPayload {
            group_id: GroupRef::Index(0),
            group_operator: LogicalOperator::And,
            criteria: vec![crit.clone(), crit],
        }];
        let expr = FilterExpression::from_saved(
            &conds,
            None,
            &catalog,
            FilterContext::FilterComponents,
            GroupIdPolicy::Monotonic,
        );
        assert_eq!(expr.groups()[0].criteria().len(), 1);
    }

    #[test]
    fn test_saved_filter_deserialize_numeric_and_string_group_ids() {
        let json = r#"{
            "_id": "f-1",
            "name": "VIP",
            "description": "Top buyers",
            "conditions": [
                {"groupId": 0, "groupOperator": "AND", "criteria": []},
                {"groupId": "group-5-1", "groupOperator": "OR", "criteria": []}
            ],
            "isTriggerFilter": true,
            "logicalOperator": "OR"
        }"#;
        let saved: SavedFilter = serde_json::from_str(json).unwrap();
        assert_eq!(saved.id.as_deref(), Some("f-1"));
        assert_eq!(saved.conditions[0].group_id, GroupRef::Index(0));
        assert_eq!(saved.conditions[1].group_id, GroupRef::Key("group-5-1".into()));
        assert_eq!(saved.context(), FilterContext::TriggerFilters);
        assert!(!saved.is_draft);
        assert_eq!(saved.estimated_audience, 0);

        let expr = saved.to_expression(&catalog(), GroupIdPolicy::Positional);
        assert_eq!(expr.inter_operator(), Some(LogicalOperator::Or));
        assert_eq!(expr.groups()[1].operator(), LogicalOperator::Or);
    }
}
