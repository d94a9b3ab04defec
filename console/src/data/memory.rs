//! In-process backend
//!
//! Serves a catalog and profile set loaded from JSON files and keeps saved
//! filters in memory. Estimates are computed by evaluating the request
//! against the loaded profiles.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use super::error::BackendError;
use super::provider::AudienceBackend;
use crate::domain::filters::{
    CatalogEntry, EstimateRequest, FieldCatalog, FilterContext, FilterExpression, GroupIdPolicy,
    Profile, SavedFilter, count_matches, profile_from_json,
};

/// Catalog file layout, identical to the HTTP catalog response
#[derive(Debug, Deserialize)]
struct CatalogFile {
    data: Vec<CatalogEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalog: RwLock<Vec<CatalogEntry>>,
    profiles: Vec<Profile>,
    filters: RwLock<HashMap<String, SavedFilter>>,
}

impl MemoryBackend {
    pub fn new(catalog: Vec<CatalogEntry>, profiles: Vec<Profile>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            profiles,
            filters: RwLock::new(HashMap::new()),
        }
    }

    /// Load catalog and profiles from disk. Missing paths yield empty sets.
    pub fn load(
        catalog_path: Option<&Path>,
        profiles_path: Option<&Path>,
    ) -> Result<Self, BackendError> {
        let catalog = match catalog_path {
            Some(path) => read_file::<CatalogFile>(path)?.data,
            None => Vec::new(),
        };
        let profiles = match profiles_path {
            Some(path) => read_file::<Vec<serde_json::Map<String, serde_json::Value>>>(path)?
                .iter()
                .map(profile_from_json)
                .collect(),
            None => Vec::new(),
        };
        tracing::debug!(
            fields = catalog.len(),
            profiles = profiles.len(),
            "Memory backend initialized"
        );
        Ok(Self::new(catalog, profiles))
    }
}

fn read_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BackendError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl AudienceBackend for MemoryBackend {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, BackendError> {
        Ok(self.catalog.read().clone())
    }

    async fn create_field(&self, entry: &CatalogEntry) -> Result<(), BackendError> {
        let mut catalog = self.catalog.write();
        if catalog.iter().any(|e| e.key == entry.key) {
            return Err(BackendError::backend(
                "memory",
                format!("criteria block '{}' already exists", entry.key),
            ));
        }
        catalog.push(entry.clone());
        Ok(())
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<u64, BackendError> {
        let catalog = FieldCatalog::from_entries(self.catalog.read().clone());
        let expression = FilterExpression::from_saved(
            &request.conditions,
            Some(request.logical_operator),
            &catalog,
            FilterContext::FilterComponents,
            GroupIdPolicy::Positional,
        );
        Ok(count_matches(&expression, &self.profiles))
    }

    async fn create_filter(&self, filter: &SavedFilter) -> Result<String, BackendError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut stored = filter.clone();
        stored.id = Some(id.clone());
        self.filters.write().insert(id.clone(), stored);
        tracing::debug!(id = %id, name = %filter.name, "Filter stored");
        Ok(id)
    }

    async fn update_filter(&self, id: &str, filter: &SavedFilter) -> Result<(), BackendError> {
        let mut filters = self.filters.write();
        let stored = filters
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        *stored = SavedFilter {
            id: Some(id.to_string()),
            ..filter.clone()
        };
        Ok(())
    }

    async fn get_filter(&self, id: &str) -> Result<SavedFilter, BackendError> {
        self.filters
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
