//! Session identity, lifecycle and launch types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::Dimensions;

/// Unique identifier for a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a command history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Create a new random command ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initialization protocol state of a session.
///
/// Transitions only move forward: `Initializing` → `LoggedIn` →
/// `AwaitingFirstPrompt` → `Ready`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionInitState {
    /// Waiting for the login marker
    #[default]
    Initializing,
    /// Login marker seen, waiting for the readiness marker echo
    LoggedIn,
    /// Readiness marker seen, waiting for the first shell prompt
    AwaitingFirstPrompt,
    /// Steady state
    Ready,
}

impl SessionInitState {
    /// Whether the session has reached its steady state.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Process status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Environment is being prepared or the process is being spawned
    #[default]
    Starting,
    /// Process is running and its output is being read
    Running,
    /// Output stream ended
    Exited,
    /// Environment preparation or process start failed
    Failed,
}

/// Everything needed to start a shell process attached to a PTY.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Program to execute
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Environment variables
    pub env: BTreeMap<String, String>,
    /// Working directory
    pub working_directory: Option<String>,
    /// Initial terminal dimensions
    pub dimensions: Dimensions,
}

impl LaunchSpec {
    /// Create a launch spec for a program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
            dimensions: Dimensions::default(),
        }
    }

    /// Add arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the terminal dimensions.
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_creation() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new();
        let display = format!("{id}");
        assert_eq!(display.len(), 36); // UUID format length
    }

    #[test]
    fn test_command_id_unique() {
        assert_ne!(CommandId::new(), CommandId::new());
    }

    #[test]
    fn test_init_state_default_and_ready() {
        assert_eq!(SessionInitState::default(), SessionInitState::Initializing);
        assert!(!SessionInitState::AwaitingFirstPrompt.is_ready());
        assert!(SessionInitState::Ready.is_ready());
    }

    #[test]
    fn test_init_state_serialization() {
        let json = serde_json::to_string(&SessionInitState::AwaitingFirstPrompt).unwrap();
        assert_eq!(json, "\"awaiting_first_prompt\"");
    }

    #[test]
    fn test_launch_spec_builder() {
        let spec = LaunchSpec::new("/bin/sh")
            .with_args(["-c", "echo hi"])
            .with_env("TERM", "xterm-256color")
            .with_working_directory("/tmp")
            .with_dimensions(Dimensions::new(30, 100));

        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["-c", "echo hi"]);
        assert_eq!(spec.env.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!(spec.working_directory.as_deref(), Some("/tmp"));
        assert_eq!(spec.dimensions.rows, 30);
    }

    #[test]
    fn test_launch_spec_serialization() {
        let spec = LaunchSpec::new("/bin/bash").with_args(["-il"]);
        let json = serde_json::to_string(&spec).unwrap();
        let back: LaunchSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
