//! Error types for the media_listener client
//!
//! Provides a unified error type used across the client crates.

use std::path::{Path, PathBuf};

use media_listener_protocol::DecodeError;

/// Main error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Socket not found at {path}")]
    SocketNotFound { path: PathBuf },

    #[error("Connection refused by {path}")]
    ConnectionRefused { path: PathBuf },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Gave up after {attempts} connection attempts")]
    RetriesExhausted { attempts: u32 },

    // === Stream Errors ===

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Event channel closed")]
    ChannelClosed,

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Classify a failed connect on `path`
    pub fn from_connect_error(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::SocketNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::ConnectionRefused => Self::ConnectionRefused {
                path: path.to_path_buf(),
            },
            _ => Self::Connection(format!("{}: {}", path.display(), err)),
        }
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable
    ///
    /// Retryable errors are connection-level faults that the connection
    /// manager answers with a reconnect.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::SocketNotFound { .. }
                | Self::ConnectionRefused { .. }
                | Self::Connection(_)
                | Self::ConnectionClosed
                | Self::FrameTooLarge { .. }
        )
    }

    /// Check if this error only affects a single record
    pub fn is_per_record(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
