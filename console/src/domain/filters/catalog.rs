//! Field catalog
//!
//! Read-only lookup table of the fields a user can drop into a group.
//! Built once from the backend's criteria blocks; entries that violate the
//! catalog invariants are logged and skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::operators::{DataType, Operator};
use super::workspace::FilterContext;

/// A field users can filter on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    key: String,
    label: String,
    data_type: DataType,
    allowed_operators: Vec<Operator>,
    category: FilterContext,
}

impl FieldDefinition {
    /// Create a field, enforcing a non-empty operator set drawn from the
    /// data type's vocabulary. Repeated operators are collapsed.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        data_type: DataType,
        operators: impl IntoIterator<Item = Operator>,
        category: FilterContext,
    ) -> Result<Self, FilterError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(FilterError::invalid_field(key, "key is empty"));
        }

        let mut allowed_operators: Vec<Operator> = Vec::new();
        for op in operators {
            if !data_type.supports(op) {
                return Err(FilterError::unsupported_operator(&key, data_type, op));
            }
            if !allowed_operators.contains(&op) {
                allowed_operators.push(op);
            }
        }
        if allowed_operators.is_empty() {
            return Err(FilterError::invalid_field(key, "no allowed operators"));
        }

        Ok(Self {
            key,
            label: label.into(),
            data_type,
            allowed_operators,
            category,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
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

    pub fn category(&self) -> FilterContext {
        self.category
    }

    /// Operator a new criterion starts with
    pub fn default_operator(&self) -> Operator {
        self.allowed_operators[0]
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators.contains(&operator)
    }
}

/// Criteria block as served by the backend
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub category: String,
    #[serde(default)]
    pub operators: Vec<String>,
}

impl CatalogEntry {
    fn into_definition(self) -> Result<FieldDefinition, FilterError> {
        let category: FilterContext = self
            .category
            .parse()
            .map_err(|e: String| FilterError::invalid_field(&self.key, e))?;
        let data_type: DataType = self
            .data_type
            .parse()
            .map_err(|e: String| FilterError::invalid_field(&self.key, e))?;
        let operators = self
            .operators
            .iter()
            .map(|op| {
                op.parse::<Operator>()
                    .map_err(|e| FilterError::invalid_field(&self.key, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        FieldDefinition::new(self.key, self.label, data_type, operators, category)
    }
}

/// Per-data-type field counts for one context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub string: usize,
    pub number: usize,
    pub date: usize,
}

/// Immutable field registry, keyed case-sensitively
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Build from validated definitions. Later duplicates of a key are dropped.
    pub fn new(definitions: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let mut catalog = Self::default();
        for def in definitions {
            if catalog.index.contains_key(def.key()) {
                tracing::warn!(key = %def.key(), "Skipping duplicate catalog key");
                continue;
            }
            catalog.index.insert(def.key().to_string(), catalog.fields.len());
            catalog.fields.push(def);
        }
        catalog
    }

    /// Build from backend entries, skipping entries that fail validation
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let definitions = entries.into_iter().filter_map(|entry| {
            let key = entry.key.clone();
            match entry.into_definition() {
                Ok(def) => Some(def),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping invalid catalog entry");
                    None
                }
            }
        });
        Self::new(definitions)
    }

    pub fn lookup(&self, key: &str) -> Result<&FieldDefinition, FilterError> {
        self.index
            .get(key)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| FilterError::UnknownField(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields offered in a context, in catalog order
    pub fn fields(&self, context: FilterContext) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(move |f| f.category() == context)
    }

    /// Case-insensitive label search within a context
    pub fn search(&self, context: FilterContext, term: &str) -> Vec<&FieldDefinition> {
        let term = term.trim().to_lowercase();
        self.fields(context)
            .filter(|f| f.label().to_lowercase().contains(&term))
            .collect()
    }

    pub fn type_counts(&self, context: FilterContext) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for field in self.fields(context) {
            match field.data_type() {
                DataType::String => counts.string += 1,
                DataType::Number => counts.number += 1,
                DataType::Date => counts.date += 1,
                DataType::Boolean => {}
            }
        }
        counts
    }
}
