// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "audience";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".audience";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "audience.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "AUDIENCE_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "AUDIENCE_LOG";

// =============================================================================
// Environment Variables - Backend
// =============================================================================

/// Environment variable for backend kind (http or memory)
pub const ENV_BACKEND: &str = "AUDIENCE_BACKEND";

/// Environment variable for the audience service base URL
pub const ENV_BACKEND_URL: &str = "AUDIENCE_BACKEND_URL";

/// Environment variable for the audience service bearer token
pub const ENV_BACKEND_TOKEN: &str = "AUDIENCE_BACKEND_TOKEN";

/// Environment variable for the HTTP request timeout in seconds
pub const ENV_BACKEND_TIMEOUT: &str = "AUDIENCE_BACKEND_TIMEOUT";

/// Environment variable for the memory backend catalog file
pub const ENV_MEMORY_CATALOG: &str = "AUDIENCE_MEMORY_CATALOG";

/// Environment variable for the memory backend profiles file
pub const ENV_MEMORY_PROFILES: &str = "AUDIENCE_MEMORY_PROFILES";

// =============================================================================
// Environment Variables - Builder
// =============================================================================

/// Environment variable for the estimate debounce window in milliseconds
pub const ENV_DEBOUNCE_MS: &str = "AUDIENCE_DEBOUNCE_MS";

/// Environment variable for the group id policy (positional or monotonic)
pub const ENV_GROUP_IDS: &str = "AUDIENCE_GROUP_IDS";

// =============================================================================
// Defaults
// =============================================================================

/// Default HTTP request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Quiet period after the last mutation before an estimate is requested
pub const DEFAULT_DEBOUNCE_MS: u64 = 600;

/// How long a notice stays visible
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 6;

// =============================================================================
// Saved Filters
// =============================================================================

pub const FILTER_NAME_MIN_LEN: usize = 3;
pub const FILTER_NAME_MAX_LEN: usize = 40;

/// Name given to drafts saved without one
pub const DEFAULT_DRAFT_NAME: &str = "Untitled Draft";

/// Description given to drafts saved without one
pub const DEFAULT_DRAFT_DESCRIPTION: &str = "Draft Description";

// =============================================================================
// Custom Criteria Blocks
// =============================================================================

pub const BLOCK_NAME_MIN_LEN: usize = 3;
pub const BLOCK_NAME_MAX_LEN: usize = 30;
