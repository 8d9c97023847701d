//! JACK error types.

use thiserror::Error;

/// JACK error type.
#[derive(Debug, Error)]
pub enum JackError {
    #[error("JACK client failed: {0}")]
    ClientOpenFailed(String),
}

/// Result type for JACK operations.
pub type JackResult<T> = Result<T, JackError>;
