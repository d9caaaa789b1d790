//! Text rendering of sessions and events for the console.

use ptyshell_core::SessionStatus;
use ptyshell_session::{
    CommandHistoryEntry, EntryKind, TerminalEvent, TerminalSession, TerminalState,
};

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Starting => "starting",
        SessionStatus::Running => "running",
        SessionStatus::Exited => "exited",
        SessionStatus::Failed => "failed",
    }
}

/// One line per session, marking the selected one with `*`.
pub fn session_list(state: &TerminalState) -> String {
    if state.sessions.is_empty() {
        return "(no sessions)".to_string();
    }
    state
        .sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if state.current_session_id == Some(s.id) {
                '*'
            } else {
                ' '
            };
            let directory = if s.current_directory.is_empty() {
                "-"
            } else {
                s.current_directory.as_str()
            };
            format!(
                "{marker} {}. {} [{}] {directory}",
                i + 1,
                s.title,
                status_label(s.status)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single history entry.
pub fn entry(entry: &CommandHistoryEntry) -> String {
    let mut out = match entry.kind {
        EntryKind::Command => {
            let mut header = format!("{} {}", entry.prompt, entry.command);
            if entry.is_executing {
                header.push_str("  (running)");
            }
            header
        }
        EntryKind::System => "[system]".to_string(),
        EntryKind::Welcome => "[welcome]".to_string(),
    };
    if !entry.output.is_empty() {
        out.push('\n');
        out.push_str(&entry.output);
    }
    out
}

/// Render a session's whole history.
pub fn history(session: &TerminalSession) -> String {
    session
        .command_history
        .iter()
        .map(entry)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Console prompt for the selected session.
pub fn prompt(state: &TerminalState) -> String {
    match state.current_session() {
        Some(session) if session.is_waiting_for_interactive_input => "? ".to_string(),
        Some(session) => format!("[{}] {} ", session.title, session.prompt_label()),
        None => "> ".to_string(),
    }
}

/// Text to print for an event, if any.
///
/// Output lines and directory changes are shown only for the selected
/// session; lifecycle events are shown for every session.
pub fn event(state: &TerminalState, event: &TerminalEvent) -> Option<String> {
    match event {
        TerminalEvent::SessionCreated { title, .. } => Some(format!("-- {title} created")),
        TerminalEvent::SessionClosed { session_id } => {
            Some(format!("-- session {session_id} closed"))
        }
        TerminalEvent::CommandExecution {
            session_id,
            output_chunk,
            is_completed,
            ..
        } => {
            if state.current_session_id != Some(*session_id) {
                return None;
            }
            if *is_completed {
                let session = state.session(session_id)?;
                if session.is_waiting_for_interactive_input {
                    return None;
                }
                Some(format!("-- done ({})", session.title))
            } else if output_chunk.is_empty() {
                None
            } else {
                Some(output_chunk.clone())
            }
        }
        TerminalEvent::DirectoryChanged {
            session_id,
            directory,
        } => {
            if state.current_session_id != Some(*session_id) {
                return None;
            }
            Some(format!("-- cwd {directory}"))
        }
    }
}
