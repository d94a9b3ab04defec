//! Local evaluation of filter expressions against audience profiles

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};

use super::criteria::CriteriaInstance;
use super::expression::FilterExpression;
use super::group::Group;
use super::operators::{DataType, LogicalOperator, Operator};
use crate::utils::string::split_operands;

/// Audience profile: field key to raw text value
pub type Profile = HashMap<String, String>;

/// Flatten a JSON object into a profile. Nulls are dropped, scalars are
/// stringified, nested values keep their JSON text.
pub fn profile_from_json(object: &serde_json::Map<String, serde_json::Value>) -> Profile {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Count the profiles matched by an expression
pub fn count_matches<'a>(
    expression: &FilterExpression,
    profiles: impl IntoIterator<Item = &'a Profile>,
) -> u64 {
    profiles
        .into_iter()
        .filter(|p| matches_expression(expression, p))
        .count() as u64
}

/// Empty groups are skipped; an expression without criteria matches everyone
pub fn matches_expression(expression: &FilterExpression, profile: &Profile) -> bool {
    let mut results = expression
        .groups()
        .iter()
        .filter_map(|g| matches_group(g, profile))
        .peekable();
    if results.peek().is_none() {
        return true;
    }
    match expression.inter_operator().unwrap_or_default() {
        LogicalOperator::And => results.all(|r| r),
        LogicalOperator::Or => results.any(|r| r),
    }
}

/// `None` for an empty group
pub fn matches_group(group: &Group, profile: &Profile) -> Option<bool> {
    if group.is_empty() {
        return None;
    }
    let mut results = group.criteria().iter().map(|c| matches_criterion(c, profile));
    Some(match group.operator() {
        LogicalOperator::And => results.all(|r| r),
        LogicalOperator::Or => results.any(|r| r),
    })
}

pub fn matches_criterion(criterion: &CriteriaInstance, profile: &Profile) -> bool {
    let actual = profile
        .get(criterion.field_key())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty());

    match criterion.operator() {
        Operator::IsEmpty => return actual.is_none(),
        Operator::IsNotEmpty => return actual.is_some(),
        _ => {}
    }
    let Some(actual) = actual else {
        return false;
    };
    let operand = criterion.value().trim();

    match criterion.data_type() {
        DataType::String => match_string(criterion.operator(), actual, operand),
        DataType::Number => match_ordered(criterion.operator(), actual, operand, parse_number),
        DataType::Date => match_ordered(criterion.operator(), actual, operand, parse_date),
        DataType::Boolean => match_boolean(criterion.operator(), actual, operand),
    }
}

fn match_string(operator: Operator, actual: &str, operand: &str) -> bool {
    let actual = actual.to_lowercase();
    let operand = operand.to_lowercase();
    match operator {
        Operator::Equals => actual == operand,
        Operator::NotEquals => actual != operand,
        Operator::Contains => actual.contains(&operand),
        Operator::NotContains => !actual.contains(&operand),
        Operator::StartsWith => actual.starts_with(&operand),
        Operator::EndsWith => actual.ends_with(&operand),
        _ => false,
    }
}

/// Numbers and dates share comparison semantics once parsed
fn match_ordered<T: PartialOrd>(
    operator: Operator,
    actual: &str,
    operand: &str,
    parse: fn(&str) -> Option<T>,
) -> bool {
    let Some(actual) = parse(actual) else {
        return false;
    };

    match operator {
        Operator::Between | Operator::NotBetween => {
            let Some((low, high)) = parse_range(operand, parse) else {
                return false;
            };
            let inside = actual >= low && actual <= high;
            (operator == Operator::Between) == inside
        }
        Operator::In | Operator::NotIn => {
            let Some(list) = split_operands(operand)
                .into_iter()
                .map(parse)
                .collect::<Option<Vec<T>>>()
            else {
                return false;
            };
            let found = list.iter().any(|v| actual.partial_cmp(v) == Some(Ordering::Equal));
            (operator == Operator::In) == found
        }
        _ => {
            let Some(operand) = parse(operand) else {
                return false;
            };
            let Some(ord) = actual.partial_cmp(&operand) else {
                return false;
            };
            match operator {
                Operator::Equals | Operator::On => ord == Ordering::Equal,
                Operator::NotEquals | Operator::NotOn => ord != Ordering::Equal,
                Operator::GreaterThan | Operator::After => ord == Ordering::Greater,
                Operator::GreaterThanOrEqual | Operator::OnOrAfter => ord != Ordering::Less,
                Operator::LessThan | Operator::Before => ord == Ordering::Less,
                Operator::LessThanOrEqual | Operator::OnOrBefore => ord != Ordering::Greater,
                _ => false,
            }
        }
    }
}

fn parse_range<T>(operand: &str, parse: fn(&str) -> Option<T>) -> Option<(T, T)> {
    match split_operands(operand).as_slice() {
        [low, high] => Some((parse(low)?, parse(high)?)),
        _ => None,
    }
}

fn match_boolean(operator: Operator, actual: &str, operand: &str) -> bool {
    let (Some(actual), Some(operand)) = (parse_bool(actual), parse_bool(operand)) else {
        return false;
    };
    match operator {
        Operator::Equals => actual == operand,
        Operator::NotEquals => actual != operand,
        _ => false,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// `YYYY-MM-DD` or RFC 3339; only the date part is compared
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::catalog::FieldDefinition;
    use crate::domain::filters::group::CriteriaUpdate;
    use crate::domain::filters::workspace::FilterContext;

    fn criterion(data_type: DataType, operator: Operator, value: &str) -> CriteriaInstance {
        let field = FieldDefinition::new(
            "f",
            "F",
            data_type,
            data_type.operators().iter().copied(),
            FilterContext::FilterComponents,
        )
        .unwrap();
        let mut c = CriteriaInstance::with_operator(&field, operator).unwrap();
        c.set_value(value);
        c
    }

    fn profile(value: &str) -> Profile {
        Profile::from([("f".to_string(), value.to_string())])
    }

    fn check(data_type: DataType, operator: Operator, operand: &str, actual: &str) -> bool {
        matches_criterion(&criterion(data_type, operator, operand), &profile(actual))
    }

    #[test]
    fn test_string_operators_ignore_case() {
        assert!(check(DataType::String, Operator::Equals, "boston", "Boston"));
        assert!(check(DataType::String, Operator::NotEquals, "boston", "Austin"));
        assert!(check(DataType::String, Operator::Contains, "ST", "Boston"));
        assert!(check(DataType::String, Operator::NotContains, "x", "Boston"));
        assert!(check(DataType::String, Operator::StartsWith, "bos", "Boston"));
        assert!(check(DataType::String, Operator::EndsWith, "TON", "Boston"));
        assert!(!check(DataType::String, Operator::StartsWith, "ton", "Boston"));
    }

    #[test]
    fn test_number_operators() {
        assert!(check(DataType::Number, Operator::GreaterThan, "30", "31"));
        assert!(!check(DataType::Number, Operator::GreaterThan, "30", "30"));
        assert!(check(DataType::Number, Operator::GreaterThanOrEqual, "30", "30"));
        assert!(check(DataType::Number, Operator::LessThan, "30", "29.5"));
        assert!(check(DataType::Number, Operator::LessThanOrEqual, "30", "30.0"));
        assert!(check(DataType::Number, Operator::Equals, "30", "30.0"));
        assert!(check(DataType::Number, Operator::Between, "10, 20", "20"));
        assert!(!check(DataType::Number, Operator::Between, "10,20", "21"));
        assert!(check(DataType::Number, Operator::In, "1,2,3", "2"));
        assert!(check(DataType::Number, Operator::NotIn, "1,2,3", "4"));
    }

    #[test]
    fn test_unparseable_operands_are_false() {
        assert!(!check(DataType::Number, Operator::GreaterThan, "abc", "31"));
        assert!(!check(DataType::Number, Operator::GreaterThan, "30", "abc"));
        assert!(!check(DataType::Number, Operator::Between, "10", "15"));
        assert!(!check(DataType::Number, Operator::NotIn, "1,x", "4"));
        assert!(!check(DataType::Date, Operator::Before, "soon", "2024-01-01"));
        assert!(!check(DataType::Boolean, Operator::Equals, "maybe", "true"));
    }

    #[test]
    fn test_date_operators() {
        assert!(check(DataType::Date, Operator::Before, "2024-06-01", "2024-05-31"));
        assert!(check(DataType::Date, Operator::After, "2024-06-01", "2024-06-02"));
        assert!(check(DataType::Date, Operator::On, "2024-06-01", "2024-06-01T23:10:00Z"));
        assert!(check(DataType::Date, Operator::NotOn, "2024-06-01", "2024-06-02"));
        assert!(check(DataType::Date, Operator::OnOrBefore, "2024-06-01", "2024-06-01"));
        assert!(check(DataType::Date, Operator::OnOrAfter, "2024-06-01", "2024-06-01"));
        assert!(check(
            DataType::Date,
            Operator::Between,
            "2024-01-01,2024-12-31",
            "2024-07-04"
        ));
        assert!(check(
            DataType::Date,
            Operator::NotBetween,
            "2024-01-01,2024-12-31",
            "2025-01-01"
        ));
    }

    #[test]
    fn test_boolean_operators() {
        assert!(check(DataType::Boolean, Operator::Equals, "true", "Yes"));
        assert!(check(DataType::Boolean, Operator::NotEquals, "true", "0"));
    }

    #[test]
    fn test_missing_and_blank_values() {
        let c = criterion(DataType::String, Operator::IsEmpty, "");
        assert!(matches_criterion(&c, &Profile::new()));
        assert!(matches_criterion(&c, &profile("   ")));
        assert!(!matches_criterion(&c, &profile("x")));

        let c = criterion(DataType::String, Operator::IsNotEmpty, "");
        assert!(!matches_criterion(&c, &Profile::new()));

        let c = criterion(DataType::String, Operator::NotEquals, "boston");
        assert!(!matches_criterion(&c, &Profile::new()));
    }

    #[test]
    fn test_expression_combines_groups() {
        let age = FieldDefinition::new(
            "age",
            "Age",
            DataType::Number,
            [Operator::GreaterThan],
            FilterContext::FilterComponents,
        )
        .unwrap();
        let city = FieldDefinition::new(
            "city",
            "City",
            DataType::String,
            [Operator::Equals],
            FilterContext::FilterComponents,
        )
        .unwrap();
        let mut expr = FilterExpression::default();
        let a = expr.add_group();
        let b = expr.add_group();
        let empty = expr.add_group();
        expr.drop_criteria(&age, a).unwrap();
        expr.update_criteria(a, "age", CriteriaUpdate::Value("30".into()))
            .unwrap();
        expr.drop_criteria(&city, b).unwrap();
        expr.update_criteria(b, "city", CriteriaUpdate::Value("Boston".into()))
            .unwrap();
        assert!(expr.group(empty).unwrap().is_empty());

        let young_bostonian = Profile::from([
            ("age".to_string(), "25".to_string()),
            ("city".to_string(), "boston".to_string()),
        ]);
        let old_austinite = Profile::from([
            ("age".to_string(), "45".to_string()),
            ("city".to_string(), "Austin".to_string()),
        ]);
        let nobody = Profile::new();
        let profiles = vec![young_bostonian, old_austinite, nobody];

        // Unset inter operator means OR
        assert_eq!(count_matches(&expr, &profiles), 2);

        expr.set_inter_operator(1, LogicalOperator::And);
        assert_eq!(count_matches(&expr, &profiles), 0);
    }

    #[test]
    fn test_expression_without_criteria_matches_all() {
        let mut expr = FilterExpression::default();
        expr.add_group();
        assert!(matches_expression(&expr, &Profile::new()));
    }

    #[test]
    fn test_profile_from_json() {
        let value = serde_json::json!({"age": 31, "vip": true, "city": "Boston", "gone": null});
        let p = profile_from_json(value.as_object().unwrap());
        assert_eq!(p.get("age").map(String::as_str), Some("31"));
        assert_eq!(p.get("vip").map(String::as_str), Some("true"));
        assert_eq!(p.get("city").map(String::as_str), Some("Boston"));
        assert!(!p.contains_key("gone"));
    }
}
