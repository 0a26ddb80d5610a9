//! Error types for the CRM report generator.
//!
//! Library crates use [`ReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all report operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Configuration loading or validation error (missing credentials, bad values).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of a CRM query (client construction, login transport).
    #[error("network error: {0}")]
    Network(String),

    /// CRM session or query failure. Always fatal for the run.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Narrative generation failure. Recovered inside the gateway.
    #[error("generation error: {0}")]
    Generation(String),

    /// Layout or PDF serialization error.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed record, unexpected response shape).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
