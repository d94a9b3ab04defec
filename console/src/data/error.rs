use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Filter not found: {0}")]
    NotFound(String),

    #[error("Backend error ({backend}): {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("Backend configuration error: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    pub fn backend(backend: &'static str, msg: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: msg.into(),
        }
    }
}
