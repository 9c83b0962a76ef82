//! Error types for the ingestion pipeline

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Volume selector outside the supported set
    #[error("Unsupported volume: {0} (expected 1 or 2)")]
    UnsupportedVolume(String),

    /// Source document missing on disk
    #[error("PDF not found: {0}")]
    DocumentNotFound(String),

    /// PDF loading or text extraction error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Required environment variables absent
    #[error("Missing env vars: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Embedding provider answered with a non-success status
    #[error("Embedding provider returned {status}: {message}")]
    EmbeddingStatus { status: u16, message: String },

    /// Persistent store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a PDF error
    pub fn pdf(message: impl Into<String>) -> Self {
        Self::Pdf(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True for errors raised before any document work starts
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::UnsupportedVolume(_)
                | Error::DocumentNotFound(_)
                | Error::MissingCredentials(_)
                | Error::Toml(_)
        )
    }
}
