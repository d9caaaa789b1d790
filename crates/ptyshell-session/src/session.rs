//! Session and command history data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ptyshell_core::{CommandId, SessionId, SessionInitState, SessionStatus};

use crate::output::{limit_output, OutputBuffer};

/// Origin of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A command submitted by the user
    Command,
    /// A message produced by ptyshell or unsolicited shell output
    System,
    /// The welcome entry shown once login succeeds
    Welcome,
}

/// One entry of a session's command history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandHistoryEntry {
    /// Entry identifier
    pub id: CommandId,
    /// Origin of the entry
    pub kind: EntryKind,
    /// Prompt label shown in front of the command
    pub prompt: String,
    /// Command text (empty for non-command entries)
    pub command: String,
    /// Accumulated output
    pub output: String,
    /// Whether the command is still running
    pub is_executing: bool,
    /// When the entry was created
    pub started_at: DateTime<Utc>,
}

impl CommandHistoryEntry {
    /// Create an executing command entry.
    pub fn command(prompt: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            kind: EntryKind::Command,
            prompt: prompt.into(),
            command: command.into(),
            output: String::new(),
            is_executing: true,
            started_at: Utc::now(),
        }
    }

    /// Create a finished entry carrying only output.
    pub fn system(output: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            kind: EntryKind::System,
            prompt: String::new(),
            command: String::new(),
            output: output.into(),
            is_executing: false,
            started_at: Utc::now(),
        }
    }

    /// Create the welcome entry.
    pub fn welcome(message: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Welcome,
            ..Self::system(message)
        }
    }

    /// Append a line to the output.
    pub fn append_line(&mut self, line: &str, max_lines: usize) {
        if self.output.is_empty() {
            self.output = line.to_string();
        } else {
            self.output.push('\n');
            self.output.push_str(line);
        }
        self.output = limit_output(&self.output, max_lines);
    }

    /// Replace the last output line, or append when the output is empty.
    pub fn replace_last_line(&mut self, line: &str, max_lines: usize) {
        match self.output.rfind('\n') {
            Some(idx) => {
                self.output.truncate(idx + 1);
                self.output.push_str(line);
            }
            None => self.output = line.to_string(),
        }
        self.output = limit_output(&self.output, max_lines);
    }

    /// The last output line.
    pub fn last_line(&self) -> Option<&str> {
        if self.output.is_empty() {
            None
        } else {
            self.output.rsplit('\n').next()
        }
    }
}

/// A shell session and its structured history.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalSession {
    /// Session identifier
    pub id: SessionId,
    /// Display title
    pub title: String,
    /// Working directory reported by the last prompt (empty until then)
    pub current_directory: String,
    /// Ordered history, oldest first
    pub command_history: Vec<CommandHistoryEntry>,
    /// Output of the executing command since it started
    pub current_output: OutputBuffer,
    /// Whether the running program waits for a confirmation
    pub is_waiting_for_interactive_input: bool,
    /// Text of the confirmation prompt being waited on
    pub last_interactive_prompt: String,
    /// Whether input goes to an interactive program rather than the shell
    pub is_interactive_mode: bool,
    /// Prompt shown by the interactive program
    pub interactive_prompt: String,
    /// Whether a full-screen program owns the terminal
    pub is_fullscreen: bool,
    /// Rendered screen of the full-screen program
    pub screen_content: String,
    /// Initialization protocol state
    pub init_state: SessionInitState,
    /// Process status
    pub status: SessionStatus,
    /// Whether the next line overwrites the most recent output line
    pub last_line_overwritable: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl TerminalSession {
    /// Create a session in its initial state.
    pub fn new(id: SessionId, title: impl Into<String>, max_output_lines: usize) -> Self {
        Self {
            id,
            title: title.into(),
            current_directory: String::new(),
            command_history: Vec::new(),
            current_output: OutputBuffer::new(max_output_lines),
            is_waiting_for_interactive_input: false,
            last_interactive_prompt: String::new(),
            is_interactive_mode: false,
            interactive_prompt: String::new(),
            is_fullscreen: false,
            screen_content: String::new(),
            init_state: SessionInitState::Initializing,
            status: SessionStatus::Starting,
            last_line_overwritable: false,
            created_at: Utc::now(),
        }
    }

    /// Label recorded as the prompt of a new command.
    pub fn prompt_label(&self) -> String {
        if self.current_directory.is_empty() {
            "$ ".to_string()
        } else {
            format!("{} $", self.current_directory)
        }
    }

    /// Index of the executing entry, if any.
    pub fn executing_index(&self) -> Option<usize> {
        self.command_history.iter().rposition(|e| e.is_executing)
    }

    /// The executing entry, if any.
    pub fn executing_entry(&self) -> Option<&CommandHistoryEntry> {
        self.executing_index().map(|idx| &self.command_history[idx])
    }

    /// Number of executing entries.
    pub fn executing_count(&self) -> usize {
        self.command_history.iter().filter(|e| e.is_executing).count()
    }

    /// Append an entry, dropping the oldest ones beyond `max_items`.
    pub fn push_entry(&mut self, entry: CommandHistoryEntry, max_items: usize) {
        self.command_history.push(entry);
        if self.command_history.len() > max_items {
            let excess = self.command_history.len() - max_items;
            self.command_history.drain(..excess);
        }
    }

    /// Append a message as its own finished entry.
    pub fn push_system_entry(&mut self, message: impl Into<String>, max_items: usize) {
        self.push_entry(CommandHistoryEntry::system(message), max_items);
    }

    /// Clear the interactive-prompt flags.
    pub fn clear_interactive(&mut self) {
        self.is_waiting_for_interactive_input = false;
        self.last_interactive_prompt.clear();
        self.is_interactive_mode = false;
        self.interactive_prompt.clear();
    }
}

/// Aggregate state of all sessions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TerminalState {
    /// Sessions in creation order
    pub sessions: Vec<TerminalSession>,
    /// Identifier of the selected session
    pub current_session_id: Option<SessionId>,
    /// Whether a session is being created
    pub is_loading: bool,
    /// Last manager-level error
    pub error: Option<String>,
}

impl TerminalState {
    /// The selected session.
    pub fn current_session(&self) -> Option<&TerminalSession> {
        self.current_session_id.and_then(|id| self.session(&id))
    }

    /// Look up a session.
    pub fn session(&self, id: &SessionId) -> Option<&TerminalSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Look up a session for mutation.
    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut TerminalSession> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    /// Position of a session in the list.
    pub fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }
}
