//! Error types for Earmark Core

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for fingerprinting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fingerprinting error types
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Failed to decode audio {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid fingerprint document {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    // Store errors
    #[error("Fingerprint store unavailable: {0}")]
    StoreUnavailable(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a decode error for `path`
    pub fn decode(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a fingerprint document error for `path`
    pub fn document(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Error::InvalidDocument {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::StoreUnavailable(msg.into())
    }

    /// Returns true if the failure was caused by the caller's input
    /// rather than by the store or the host.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::InvalidDocument { .. } | Error::InvalidConfig(_)
        )
    }

    /// Returns the error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Decode { .. } => "DECODE",
            Error::InvalidDocument { .. } => "INVALID_DOCUMENT",
            Error::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}
