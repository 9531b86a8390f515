//! Crate error types

use thiserror::Error;

/// Errors that can occur while driving an agent session
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model or search endpoint unreachable, or the request itself failed
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid or missing configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The command process could not be created
    #[error("Failed to spawn command: {0}")]
    Spawn(std::io::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session was interrupted by the user
    #[error("Interrupted")]
    Interrupted,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        AgentError::Other(msg.into())
    }

    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        AgentError::Api {
            status,
            message: message.into(),
        }
    }

    /// Status code of the underlying API error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            AgentError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;
