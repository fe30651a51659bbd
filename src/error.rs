//! Error types for the synthetic codec.
//!
//! The generation engine itself is total: frame sizes and durations are
//! floored, and a bitrate update that arrives too early is dropped rather than
//! reported. Errors therefore only come from construction, lifecycle misuse,
//! configuration loading and sinks that stop accepting frames.
//!
//! ```rust
//! use syncodec::CodecError;
//!
//! let error = CodecError::invalid_config("frames_per_second", "must be greater than zero");
//! assert!(!error.is_retryable());
//! assert!(error.to_string().contains("frames_per_second"));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Main error type for codec operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Codec has already been started")]
    AlreadyStarted,

    #[error("Codec has already been closed")]
    AlreadyClosed,

    #[error("Frame sink closed: {reason}")]
    SinkClosed { reason: String },

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },
}

impl CodecError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CodecError::File { .. } => true,
            CodecError::InvalidConfig { .. } => false,
            CodecError::AlreadyStarted => false,
            CodecError::AlreadyClosed => false,
            CodecError::SinkClosed { .. } => false,
            CodecError::Parse { .. } => false,
        }
    }

    /// Helper constructor for configuration invariant violations.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        CodecError::InvalidConfig { field, reason: reason.into() }
    }

    /// Helper constructor for sink failures.
    pub fn sink_closed(reason: impl Into<String>) -> Self {
        CodecError::SinkClosed { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        CodecError::File { path, source }
    }
}

impl From<serde_yaml_ng::Error> for CodecError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        CodecError::Parse { context: "codec config YAML".to_string(), details: err.to_string() }
    }
}
