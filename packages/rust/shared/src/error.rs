//! Error types for LeadLoom.
//!
//! Library crates use [`LeadloomError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadLoom operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadloomError {
    /// Configuration loading or validation error (missing credentials,
    /// malformed config file). Fatal to starting a run.
    #[error("config error: {message}")]
    Config { message: String },

    /// Web discovery error (search request, page fetch). Recovered per-row
    /// by keeping the original row.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Extraction client error (API request, malformed response envelope).
    /// Recovered per-row as zero extracted fields.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Malformed structured output from the extraction model (no parsable
    /// JSON object in the completion text).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (invalid state transition, bad input).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadloomError>;

impl LeadloomError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LeadloomError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = LeadloomError::Discovery("no results for \"Acme\"".into());
        assert!(err.to_string().contains("Acme"));

        let err = LeadloomError::validation("pipeline is already processing");
        assert!(err.to_string().contains("already processing"));
    }
}
