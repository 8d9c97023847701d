//! Error types for patchy core.

use std::path::PathBuf;

use thiserror::Error;

use crate::patch::Connection;

/// Core error type for patch operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("need ports {0:?}")]
    PortsMissing(Vec<String>),

    #[error("need port {0:?}")]
    PortMissing(String),

    #[error("Failed to connect {connection}: {reason}")]
    ConnectFailed { connection: Connection, reason: String },

    #[error("Failed to disconnect {connection}: {reason}")]
    DisconnectFailed { connection: Connection, reason: String },

    #[error("Malformed patch document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for patch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a registry when changing a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The link is already in place. Callers connecting treat this as success.
    #[error("already connected")]
    AlreadyConnected,

    #[error("{0}")]
    Failed(String),
}
