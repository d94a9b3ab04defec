//! Backend access
//!
//! The console talks to one audience backend: the remote HTTP service or an
//! in-process store seeded from JSON files.

mod error;
mod http;
mod memory;
mod provider;
#[cfg(test)]
pub(crate) mod testing;

pub use error::BackendError;
pub use http::{HttpBackend, coerce_estimate};
pub use memory::MemoryBackend;
pub use provider::AudienceBackend;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::config::{BackendConfig, BackendKind};
use crate::utils::file::expand_path;

#[derive(Debug, Clone)]
pub struct BackendService {
    provider: Arc<dyn AudienceBackend>,
}

impl BackendService {
    /// Initialize from config. Constructs the appropriate provider.
    pub fn init(config: &BackendConfig) -> Result<Self> {
        let provider: Arc<dyn AudienceBackend> = match config.kind {
            BackendKind::Http => {
                let url = config
                    .url
                    .as_deref()
                    .context("Backend URL is required for the http backend")?;
                Arc::new(HttpBackend::new(
                    url,
                    config.token.as_deref(),
                    config.timeout_secs,
                )?)
            }
            BackendKind::Memory => {
                let catalog = config.memory.catalog_path.as_deref().map(expand_path);
                let profiles = config.memory.profiles_path.as_deref().map(expand_path);
                Arc::new(
                    MemoryBackend::load(catalog.as_deref(), profiles.as_deref())
                        .context("Failed to load memory backend data")?,
                )
            }
        };

        tracing::debug!(backend = provider.name(), "Backend initialized");
        Ok(Self { provider })
    }

    pub fn from_provider(provider: Arc<dyn AudienceBackend>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> Arc<dyn AudienceBackend> {
        self.provider.clone()
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }
}
