//! Error types for ptyshell.

use thiserror::Error;

use crate::{CommandId, SessionId};

/// Main error type for ptyshell operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// No session is currently selected
    #[error("No active session")]
    NoActiveSession,

    /// PTY-related errors
    #[error("PTY error: {0}")]
    PtyError(String),

    /// The PTY input side has been closed
    #[error("Session writer is closed")]
    WriterClosed,

    /// A command is still executing in the target session
    #[error("Command already executing: {0}")]
    CommandInProgress(CommandId),

    /// Session limit reached
    #[error("Session limit reached (max: {0})")]
    SessionLimitReached(usize),

    /// Environment provisioning did not produce a usable shell
    #[error("Environment not ready: {0}")]
    EnvironmentNotReady(String),

    /// Invalid terminal dimensions
    #[error("Invalid dimensions: {rows}x{cols}")]
    InvalidDimensions {
        /// Number of rows
        rows: u16,
        /// Number of columns
        cols: u16,
    },

    /// A user-supplied pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_error() {
        let session_id = SessionId::new();
        let err = Error::SessionNotFound(session_id);
        let display = err.to_string();
        assert!(display.starts_with("Session not found:"));
    }

    #[test]
    fn test_no_active_session_error() {
        assert_eq!(Error::NoActiveSession.to_string(), "No active session");
    }

    #[test]
    fn test_pty_error() {
        let err = Error::PtyError("spawn failed".to_string());
        assert_eq!(err.to_string(), "PTY error: spawn failed");
    }

    #[test]
    fn test_writer_closed_error() {
        assert_eq!(Error::WriterClosed.to_string(), "Session writer is closed");
    }

    #[test]
    fn test_command_in_progress_error() {
        let id = CommandId::new();
        let err = Error::CommandInProgress(id);
        assert_eq!(err.to_string(), format!("Command already executing: {id}"));
    }

    #[test]
    fn test_session_limit_reached_error() {
        let err = Error::SessionLimitReached(10);
        assert_eq!(err.to_string(), "Session limit reached (max: 10)");
    }

    #[test]
    fn test_environment_not_ready_error() {
        let err = Error::EnvironmentNotReady("missing /bin/bash".to_string());
        assert_eq!(err.to_string(), "Environment not ready: missing /bin/bash");
    }

    #[test]
    fn test_invalid_dimensions_error() {
        let err = Error::InvalidDimensions { rows: 0, cols: 100 };
        assert_eq!(err.to_string(), "Invalid dimensions: 0x100");
    }

    #[test]
    fn test_invalid_pattern_error() {
        let err = Error::InvalidPattern("([unclosed".to_string());
        assert_eq!(err.to_string(), "Invalid pattern: ([unclosed");
    }

    #[test]
    fn test_config_error() {
        let err = Error::Config("missing field: shell".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field: shell");
    }

    #[test]
    fn test_other_error() {
        let err = Error::Other("unknown error".to_string());
        assert_eq!(err.to_string(), "unknown error");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
