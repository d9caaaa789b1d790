//! Discrete events published alongside the state snapshot.

use serde::Serialize;

use ptyshell_core::{CommandId, SessionId};

/// Something that happened in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalEvent {
    /// A session was added
    SessionCreated {
        /// New session
        session_id: SessionId,
        /// Its title
        title: String,
    },
    /// A session was removed
    SessionClosed {
        /// Removed session
        session_id: SessionId,
    },
    /// A command started, produced a line, or finished
    CommandExecution {
        /// Owning session
        session_id: SessionId,
        /// History entry of the command
        command_id: CommandId,
        /// Line just added (empty on start and completion)
        output_chunk: String,
        /// Whether the command finished
        is_completed: bool,
    },
    /// A prompt reported a new working directory
    DirectoryChanged {
        /// Owning session
        session_id: SessionId,
        /// New directory
        directory: String,
    },
}

impl TerminalEvent {
    /// Session the event belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::SessionClosed { session_id }
            | Self::CommandExecution { session_id, .. }
            | Self::DirectoryChanged { session_id, .. } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = TerminalEvent::DirectoryChanged {
            session_id: SessionId::new(),
            directory: "/root".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "directory_changed");
        assert_eq!(json["directory"], "/root");
    }

    #[test]
    fn test_event_session_id() {
        let id = SessionId::new();
        let event = TerminalEvent::CommandExecution {
            session_id: id,
            command_id: CommandId::new(),
            output_chunk: String::new(),
            is_completed: true,
        };
        assert_eq!(event.session_id(), id);
    }
}
