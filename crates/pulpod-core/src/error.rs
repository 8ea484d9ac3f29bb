//! Error types for pulpod-core.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pulpod-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while talking to a container backend.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configured flavor has no backend implementation
    #[error("unsupported backend flavor: {0:?}")]
    UnsupportedBackend(String),

    /// Unix socket path does not exist
    #[error("socket path does not exist: {}", .0.display())]
    SocketNotFound(PathBuf),

    /// Daemon unreachable or handshake failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Daemon did not answer before the request deadline
    #[error("daemon did not respond within {0:?}")]
    Timeout(Duration),

    /// Container, image or name unknown to the daemon
    #[error("not found: {0}")]
    NotFound(String),

    /// Daemon rejected the operation
    #[error("backend error: {0}")]
    Backend(String),

    /// Daemon replied with a body we could not decode
    #[error("malformed daemon response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad socket URI, unknown flavor, unreadable config.
    Config,
    /// Socket missing, daemon unreachable, handshake or deadline failure.
    Connection,
    /// Id, name or image unknown to the daemon.
    NotFound,
    /// Daemon accepted the request but refused the operation.
    Backend,
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Config(_) | CoreError::UnsupportedBackend(_) => ErrorKind::Config,
            CoreError::SocketNotFound(_) | CoreError::Connection(_) | CoreError::Timeout(_) => {
                ErrorKind::Connection
            }
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Backend(_) | CoreError::Json(_) => ErrorKind::Backend,
        }
    }

    /// Check if this error indicates a not-found condition.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error came from reaching the daemon rather than from the daemon itself.
    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}
