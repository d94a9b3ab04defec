use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::filters::{GroupIdPolicy, SessionSettings};
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DEBOUNCE_MS, DEFAULT_NOTICE_TTL_SECS,
    DEFAULT_TIMEOUT_SECS,
};

// =============================================================================
// Backend Kind Enum
// =============================================================================

/// Where catalog, estimates and saved filters come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote audience service
    Http,
    /// In-process store seeded from JSON files
    #[default]
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Http => write!(f, "http"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

// =============================================================================
// File Config Structs (Deserialization)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MemoryFileConfig {
    pub catalog_path: Option<String>,
    pub profiles_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    pub kind: Option<BackendKind>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub memory: Option<MemoryFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EstimateFileConfig {
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BuilderFileConfig {
    pub group_ids: Option<GroupIdPolicy>,
    pub notice_ttl_secs: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub backend: Option<BackendFileConfig>,
    pub estimate: Option<EstimateFileConfig>,
    pub builder: Option<BuilderFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Backend (with nested memory)
        if let Some(backend) = other.backend {
            let current = self.backend.get_or_insert_with(BackendFileConfig::default);
            if backend.kind.is_some() {
                tracing::trace!(kind = ?backend.kind, "Merging backend.kind");
                current.kind = backend.kind;
            }
            if backend.url.is_some() {
                tracing::trace!(url = ?backend.url, "Merging backend.url");
                current.url = backend.url;
            }
            if backend.token.is_some() {
                tracing::trace!("Merging backend.token");
                current.token = backend.token;
            }
            if backend.timeout_secs.is_some() {
                tracing::trace!(timeout_secs = ?backend.timeout_secs, "Merging backend.timeout_secs");
                current.timeout_secs = backend.timeout_secs;
            }
            if let Some(memory) = backend.memory {
                let current_memory = current.memory.get_or_insert_with(MemoryFileConfig::default);
                if memory.catalog_path.is_some() {
                    tracing::trace!(path = ?memory.catalog_path, "Merging backend.memory.catalog_path");
                    current_memory.catalog_path = memory.catalog_path;
                }
                if memory.profiles_path.is_some() {
                    tracing::trace!(path = ?memory.profiles_path, "Merging backend.memory.profiles_path");
                    current_memory.profiles_path = memory.profiles_path;
                }
            }
        }

        // Estimate
        if let Some(estimate) = other.estimate {
            let current = self.estimate.get_or_insert_with(EstimateFileConfig::default);
            if estimate.debounce_ms.is_some() {
                tracing::trace!(debounce_ms = ?estimate.debounce_ms, "Merging estimate.debounce_ms");
                current.debounce_ms = estimate.debounce_ms;
            }
        }

        // Builder
        if let Some(builder) = other.builder {
            let current = self.builder.get_or_insert_with(BuilderFileConfig::default);
            if builder.group_ids.is_some() {
                tracing::trace!(group_ids = ?builder.group_ids, "Merging builder.group_ids");
                current.group_ids = builder.group_ids;
            }
            if builder.notice_ttl_secs.is_some() {
                tracing::trace!(notice_ttl_secs = ?builder.notice_ttl_secs, "Merging builder.notice_ttl_secs");
                current.notice_ttl_secs = builder.notice_ttl_secs;
            }
        }
    }
}

// =============================================================================
// Final Config Structs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    pub catalog_path: Option<String>,
    pub profiles_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub memory: MemoryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: None,
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            memory: MemoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    pub group_ids: GroupIdPolicy,
    pub notice_ttl_secs: u64,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub estimate: EstimateConfig,
    pub builder: BuilderConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.audience/audience.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.audience/audience.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::layer(cli, file_config);
        config.validate()?;
        tracing::debug!(
            backend = %config.backend.kind,
            group_ids = %config.builder.group_ids,
            debounce_ms = config.estimate.debounce_ms,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn layer(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_backend = file_config.backend.unwrap_or_default();
        let file_memory = file_backend.memory.unwrap_or_default();
        let file_estimate = file_config.estimate.unwrap_or_default();
        let file_builder = file_config.builder.unwrap_or_default();

        let url = cli.backend_url.clone().or(file_backend.url);

        // A configured URL implies the http backend unless a kind is set
        let kind = cli.backend.or(file_backend.kind).unwrap_or(if url.is_some() {
            BackendKind::Http
        } else {
            BackendKind::Memory
        });

        let backend = BackendConfig {
            kind,
            url,
            token: cli.backend_token.clone().or(file_backend.token),
            timeout_secs: cli
                .timeout
                .or(file_backend.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            memory: MemoryConfig {
                catalog_path: cli.catalog_file.clone().or(file_memory.catalog_path),
                profiles_path: cli.profiles_file.clone().or(file_memory.profiles_path),
            },
        };

        let estimate = EstimateConfig {
            debounce_ms: cli
                .debounce_ms
                .or(file_estimate.debounce_ms)
                .unwrap_or(DEFAULT_DEBOUNCE_MS),
        };

        let builder = BuilderConfig {
            group_ids: cli.group_ids.or(file_builder.group_ids).unwrap_or_default(),
            notice_ttl_secs: file_builder
                .notice_ttl_secs
                .unwrap_or(DEFAULT_NOTICE_TTL_SECS),
        };

        Self {
            backend,
            estimate,
            builder,
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.backend.timeout_secs == 0 {
            anyhow::bail!("backend.timeout_secs must be greater than 0");
        }

        if self.backend.kind == BackendKind::Http {
            match self.backend.url.as_deref().map(str::trim) {
                None | Some("") => {
                    anyhow::bail!("backend.url is required when backend.kind is http")
                }
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    anyhow::bail!("backend.url must start with http:// or https:// (got {})", url)
                }
                _ => {}
            }
        }

        if self.builder.notice_ttl_secs == 0 {
            anyhow::bail!("builder.notice_ttl_secs must be greater than 0");
        }

        Ok(())
    }

    /// Builder session tunables
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            debounce: Duration::from_millis(self.estimate.debounce_ms),
            notice_ttl: Duration::from_secs(self.builder.notice_ttl_secs),
            group_ids: self.builder.group_ids,
        }
    }
}

/// Get the profile config path (~/.audience/audience.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
