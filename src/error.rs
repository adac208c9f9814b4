//! Error types for diarizer.
//!
//! Every fatal pipeline failure maps to a stable machine-readable code that
//! is returned to the caller; degenerate zero- or one-speaker outcomes are
//! valid results, never errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiarizerError {
    // Request validation errors — rejected before any processing
    #[error("Invalid request: {message}")]
    Validation { message: String },

    // Source fetch errors — the URL in `url` is already redacted
    #[error("Failed to download audio from {url}: {message}")]
    Download { url: String, message: String },

    // Decode/conversion errors
    #[error("Audio conversion failed: {message}")]
    Conversion { message: String },

    // Embedding extraction errors — a single bad window aborts the request
    #[error("Embedding extraction failed on window {window}: {message}")]
    Embedding { window: usize, message: String },

    // Clustering numerical failures, distinct from the single-speaker outcome
    #[error("Speaker clustering failed: {message}")]
    Clustering { message: String },

    // Raised by the HTTP layer when the processing deadline passes
    #[error("Processing timed out after {seconds}s")]
    Timeout { seconds: u64 },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiarizerError {
    /// Stable error code carried in the structured error response.
    pub fn code(&self) -> &'static str {
        match self {
            DiarizerError::Validation { .. } => "validation_error",
            DiarizerError::Download { .. } => "download_error",
            DiarizerError::Conversion { .. } => "conversion_error",
            DiarizerError::Embedding { .. } => "embedding_error",
            DiarizerError::Clustering { .. } => "clustering_error",
            DiarizerError::Timeout { .. } => "timeout_error",
            DiarizerError::ConfigInvalidValue { .. } | DiarizerError::Config(_) => "config_error",
            DiarizerError::Io(_) => "io_error",
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DiarizerError>;
