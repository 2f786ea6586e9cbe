use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not initialized: run 'docsync init'")]
    NotInitialized,

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("invalid identifier '{0}': must be lowercase alphanumeric with hyphens, dots, underscores or slashes")]
    InvalidIdentifier(String),

    #[error("invalid artifact kind: {0}")]
    InvalidKind(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("manifest at {} is corrupt: {source}", .path.display())]
    ManifestCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure retrieving a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Worth retrying: timeouts, connection resets, 429 and 5xx responses.
    #[error("transient fetch failure for {url}: {message}")]
    Transient { url: String, message: String },

    #[error("fetch failed for {url}: {message}")]
    Permanent { url: String, message: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Raw content could not be turned into Markdown.
#[derive(Debug, Error)]
#[error("cannot convert '{identifier}': {reason}")]
pub struct ConversionError {
    pub identifier: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
