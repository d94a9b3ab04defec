//! Recording backend for unit tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::BackendError;
use super::provider::AudienceBackend;
use crate::domain::filters::{CatalogEntry, EstimateRequest, SavedFilter};

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub catalog: Mutex<Vec<CatalogEntry>>,
    pub estimates: Mutex<Vec<EstimateRequest>>,
    pub created: Mutex<Vec<SavedFilter>>,
    pub updated: Mutex<Vec<(String, SavedFilter)>>,
    pub stored: Mutex<Option<SavedFilter>>,
    pub estimate_result: AtomicU64,
    pub fail_estimates: AtomicBool,
    pub fail_saves: AtomicBool,
}

impl RecordingBackend {
    pub fn with_catalog(entries: Vec<CatalogEntry>) -> Self {
        Self {
            catalog: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn estimate_calls(&self) -> usize {
        self.estimates.lock().len()
    }

    pub fn save_calls(&self) -> usize {
        self.created.lock().len() + self.updated.lock().len()
    }
}

#[async_trait]
impl AudienceBackend for RecordingBackend {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, BackendError> {
        Ok(self.catalog.lock().clone())
    }

    async fn create_field(&self, entry: &CatalogEntry) -> Result<(), BackendError> {
        self.catalog.lock().push(entry.clone());
        Ok(())
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<u64, BackendError> {
        self.estimates.lock().push(request.clone());
        if self.fail_estimates.load(Ordering::SeqCst) {
            return Err(BackendError::backend("recording", "estimate failed"));
        }
        Ok(self.estimate_result.load(Ordering::SeqCst))
    }

    async fn create_filter(&self, filter: &SavedFilter) -> Result<String, BackendError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::backend("recording", "store unavailable"));
        }
        self.created.lock().push(filter.clone());
        Ok(format!("f-{}", self.created.lock().len()))
    }

    async fn update_filter(&self, id: &str, filter: &SavedFilter) -> Result<(), BackendError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::backend("recording", "store unavailable"));
        }
        self.updated.lock().push((id.to_string(), filter.clone()));
        Ok(())
    }

    async fn get_filter(&self, id: &str) -> Result<SavedFilter, BackendError> {
        self.stored
            .lock()
            .clone()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
