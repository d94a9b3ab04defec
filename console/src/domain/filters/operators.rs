//! Operator vocabulary
//!
//! Closed operator sets per field data type, display labels, and the
//! boolean connectives used inside and between groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic type of a catalog field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Date,
    Boolean,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
        }
    }

    /// Operators permitted for this data type, in display order
    pub fn operators(&self) -> &'static [Operator] {
        match self {
            DataType::String => STRING_OPERATORS,
            DataType::Number => NUMBER_OPERATORS,
            DataType::Date => DATE_OPERATORS,
            DataType::Boolean => BOOLEAN_OPERATORS,
        }
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "number" => Ok(DataType::Number),
            "date" => Ok(DataType::Date),
            "boolean" => Ok(DataType::Boolean),
            _ => Err(format!(
                "Invalid data type '{}'. Valid options: string, number, date, boolean",
                s
            )),
        }
    }
}

/// Criteria operator
///
/// Wire names are the exact strings the backend expects, including the
/// space-separated negations (`not equals`, `not on`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Operator {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not equals")]
    NotEquals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "notContains")]
    NotContains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "isEmpty")]
    IsEmpty,
    #[serde(rename = "isNotEmpty")]
    IsNotEmpty,
    #[serde(rename = "greaterThan")]
    GreaterThan,
    #[serde(rename = "greaterThanOrEqual")]
    GreaterThanOrEqual,
    #[serde(rename = "lessThan")]
    LessThan,
    #[serde(rename = "lessThanOrEqual")]
    LessThanOrEqual,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after")]
    After,
    #[serde(rename = "on")]
    On,
    #[serde(rename = "not on")]
    NotOn,
    #[serde(rename = "onOrBefore")]
    OnOrBefore,
    #[serde(rename = "onOrAfter")]
    OnOrAfter,
    #[serde(rename = "notBetween")]
    NotBetween,
}

const STRING_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Between,
    Operator::In,
    Operator::NotIn,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const DATE_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Before,
    Operator::After,
    Operator::On,
    Operator::NotOn,
    Operator::Between,
    Operator::OnOrBefore,
    Operator::OnOrAfter,
    Operator::NotBetween,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const BOOLEAN_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const ALL_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Between,
    Operator::In,
    Operator::NotIn,
    Operator::Before,
    Operator::After,
    Operator::On,
    Operator::NotOn,
    Operator::OnOrBefore,
    Operator::OnOrAfter,
    Operator::NotBetween,
];

impl Operator {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not equals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThan => "lessThan",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::On => "on",
            Operator::NotOn => "not on",
            Operator::OnOrBefore => "onOrBefore",
            Operator::OnOrAfter => "onOrAfter",
            Operator::NotBetween => "notBetween",
        }
    }

    /// Human-readable label with symbol, as shown in operator pickers
    pub fn label(&self) -> &'static str {
        match self {
            Operator::Equals => "equals (=)",
            Operator::NotEquals => "not equals (!=)",
            Operator::Contains => "contains (∋)",
            Operator::NotContains => "not contains (∌)",
            Operator::StartsWith => "starts with (^)",
            Operator::EndsWith => "ends with ($)",
            Operator::IsEmpty => "is empty (∅)",
            Operator::IsNotEmpty => "is not empty (≠∅)",
            Operator::GreaterThan => "greater than (>)",
            Operator::GreaterThanOrEqual => "greater than or equal (≥)",
            Operator::LessThan => "less than (<)",
            Operator::LessThanOrEqual => "less than or equal (≤)",
            Operator::Between => "between (↔)",
            Operator::In => "in (∈)",
            Operator::NotIn => "not in (∉)",
            Operator::Before => "before (<)",
            Operator::After => "after (>)",
            Operator::On => "on (=)",
            Operator::NotOn => "not on (!=)",
            Operator::OnOrBefore => "on or before (≤)",
            Operator::OnOrAfter => "on or after (≥)",
            Operator::NotBetween => "not between (≠↔)",
        }
    }

    /// Operators that ignore the criterion value
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_OPERATORS
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("Unknown operator '{}'", s))
    }
}

/// Boolean connective for criteria within a group and between groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            _ => Err(format!("Invalid logical operator '{}'. Valid options: AND, OR", s)),
        }
    }
}
