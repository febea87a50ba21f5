//! Error types for the streaming client.
//!
//! All fallible operations in this crate return [`StreamError`]. The error
//! categories follow the lifecycle of a session:
//!
//! - **Configuration Errors**: invalid sample/probe counts, unknown mode
//!   selectors, malformed settings files. Fatal before any network activity.
//! - **Connection Errors**: the device could not be reached.
//! - **Transport Errors**: a read failed mid-session. Terminal for the session.
//! - **Sink Errors**: a decoded frame could not be persisted.
//!
//! Corrupt (wrongly sized) frames and orderly end of stream are not errors;
//! they are reported through [`Received`](crate::Received).
//!
//! ```rust
//! use amode_stream::StreamError;
//!
//! let error = StreamError::invalid_configuration("sample count must be positive");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for streaming operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Failed to connect to device at {address}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport failure: {source}")]
    Transport {
        #[source]
        source: std::io::Error,
    },

    #[error("Sink failure: {context}")]
    Sink {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Image encoding failed for {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Connection { .. } => true,
            StreamError::Transport { .. } => true,
            StreamError::Sink { .. } => true,
            StreamError::InvalidConfiguration { .. } => false,
            StreamError::File { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::Image { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::InvalidConfiguration { .. } => vec![
                "Use a device preset (raw or depth) instead of custom counts",
                "Check sample and probe counts match the device configuration",
                "Use mode selector 0 for raw or 1 for depth",
            ],
            StreamError::Connection { .. } => vec![
                "Ensure the ultrasound machine is powered on and streaming",
                "Verify the device IP address and port",
                "Check the network cable and firewall rules",
            ],
            StreamError::Transport { .. } => vec![
                "Check the network link to the device",
                "Restart streaming on the ultrasound machine",
                "Reconnect and start a new session",
            ],
            StreamError::Sink { .. } => vec![
                "Check free disk space",
                "Verify the output directory is writable",
            ],
            StreamError::File { .. } => vec![
                "Check the file path exists and is accessible",
                "Check file permissions",
                "Ensure sufficient disk space",
            ],
            StreamError::Config { .. } => vec![
                "Check the settings file is valid YAML",
                "Compare field names against the documented settings",
            ],
            StreamError::Image { .. } => vec![
                "Verify the frame geometry matches the image dimensions",
                "Check the output directory is writable",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        StreamError::InvalidConfiguration { reason: reason.into() }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(address: impl Into<String>, source: std::io::Error) -> Self {
        StreamError::Connection { address: address.into(), source }
    }

    /// Helper constructor for transport read failures.
    pub fn transport(source: std::io::Error) -> Self {
        StreamError::Transport { source }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }

    /// Helper constructor for sink errors.
    pub fn sink_failed(context: impl Into<String>) -> Self {
        StreamError::Sink { context: context.into(), source: None }
    }

    /// Helper constructor for sink errors with source.
    pub fn sink_failed_with_source(
        context: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Sink { context: context.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Transport { source: err }
    }
}
