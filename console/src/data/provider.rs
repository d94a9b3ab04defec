use async_trait::async_trait;

use super::error::BackendError;
use crate::domain::filters::{CatalogEntry, EstimateRequest, SavedFilter};

/// Remote collaborator serving the catalog, estimates and filter storage
#[async_trait]
pub trait AudienceBackend: Send + Sync + std::fmt::Debug {
    /// All criteria blocks across both categories
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, BackendError>;

    /// Register a custom criteria block
    async fn create_field(&self, entry: &CatalogEntry) -> Result<(), BackendError>;

    /// Audience size for a filter snapshot
    async fn estimate(&self, request: &EstimateRequest) -> Result<u64, BackendError>;

    /// Store a new filter, returning its id
    async fn create_filter(&self, filter: &SavedFilter) -> Result<String, BackendError>;

    async fn update_filter(&self, id: &str, filter: &SavedFilter) -> Result<(), BackendError>;

    async fn get_filter(&self, id: &str) -> Result<SavedFilter, BackendError>;

    /// Human-readable backend name
    fn name(&self) -> &'static str;
}
