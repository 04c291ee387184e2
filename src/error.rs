//! Error types for landscape-dl
//!
//! Every failure aborts the acquisition and is returned to the caller
//! untranslated. The only sanctioned retry is the job status poll, which
//! repeats while the job is still running, never after a failed query.

use std::time::Duration;
use thiserror::Error;

use crate::types::{JobId, StatusCode};

/// Result type alias for landscape-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for landscape-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure, non-success HTTP status, or undecodable body
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Well-formed response that is empty or cannot be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Poll budget exhausted before the job reached a terminal status
    #[error("timed out after {attempts} status checks (last status: {last_status:?})")]
    Timeout {
        /// Number of status queries issued
        attempts: u32,
        /// Last status observed, if any
        last_status: Option<StatusCode>,
    },

    /// The service reported a terminal failure status for the job
    #[error("remote extraction failed for job {job}: status {status}")]
    RemoteExtraction {
        /// The failed job
        job: JobId,
        /// Terminal status code reported by the service
        status: StatusCode,
    },

    /// Local file or archive failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Area of interest cannot be requested
    #[error("invalid area of interest: {0}")]
    InvalidArea(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.max_attempts")
        key: Option<String>,
    },

    /// The caller cancelled the acquisition
    #[error("acquisition cancelled")]
    Cancelled,

    /// The whole-acquisition deadline elapsed
    #[error("acquisition deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Network(_) => "network_error",
            Error::InvalidResponse(_) => "invalid_response",
            Error::Timeout { .. } => "timeout",
            Error::RemoteExtraction { .. } => "remote_extraction_error",
            Error::Io(_) => "io_error",
            Error::InvalidArea(_) => "invalid_area",
            Error::Config { .. } => "config_error",
            Error::Cancelled => "cancelled",
            Error::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }

    /// True when the failure was decided by the remote service rather than transport or disk
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::InvalidResponse(_) | Error::RemoteExtraction { .. }
        )
    }
}
