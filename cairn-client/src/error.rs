//! Error types for the SCM gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A remote command that did not succeed
///
/// Carries the server's message, its exit code and the command text so a
/// build log line is enough to reproduce the call by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (exit code {exit_code}, command: {command})")]
pub struct CommandError {
    pub message: String,
    pub exit_code: i32,
    pub command: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>, exit_code: i32, command: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code,
            command: command.into(),
        }
    }
}

/// Errors that can occur when talking to the SCM server
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The session could not be established
    #[error("An API Session could not be established: {0}")]
    Connection(String),

    /// The requested project configuration does not exist
    #[error("Project not found: {0}")]
    NotFound(String),

    /// A command was rejected or returned an unusable response
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    /// The session was used after `close()`
    #[error("The session has already been closed")]
    SessionClosed,
}

impl GatewayError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Exit code reported by the server, when there is one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Command(err) => Some(err.exit_code),
            _ => None,
        }
    }
}
