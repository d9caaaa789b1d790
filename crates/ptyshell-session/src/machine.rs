//! Per-session state machine.
//!
//! [`SessionStateMachine`] applies resolved output units to a
//! [`TerminalSession`]. It is pure: no I/O, no locking. Callers run it inside
//! [`TerminalStore::update_session`](crate::store::TerminalStore::update_session)
//! and the events it collects are published afterwards.
//!
//! ```text
//! Initializing --login marker--> LoggedIn --ready marker--> AwaitingFirstPrompt
//!     --first prompt--> Ready
//! ```
//!
//! In `Ready`, each line goes through marker suppression, echo suppression,
//! interactive-prompt handling, prompt handling and finally output
//! accumulation.

use tracing::{debug, info};

use ptyshell_core::{AppConfig, CommandId, Error, Result, SessionInitState};
use ptyshell_detector::{strip_ansi, Classifier, LineClass, LineContext, PromptMatch};

use crate::events::TerminalEvent;
use crate::reassembler::Unit;
use crate::session::{CommandHistoryEntry, EntryKind, TerminalSession};

/// Per-session history limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Maximum history entries per session
    pub max_history_items: usize,
    /// Maximum output lines per entry
    pub max_output_lines: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_history_items: 500,
            max_output_lines: 1000,
        }
    }
}

/// What submitting a command did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDisposition {
    /// A new executing entry was created
    Started(CommandId),
    /// The text answers a pending interactive prompt
    InteractiveAnswer,
    /// History was cleared down to the welcome entry
    Cleared,
    /// Blank input; nothing recorded
    Blank,
}

impl CommandDisposition {
    /// Identifier of the created entry, if any.
    pub fn command_id(&self) -> Option<CommandId> {
        match self {
            Self::Started(id) => Some(*id),
            _ => None,
        }
    }
}

/// Applies output and input to sessions.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    classifier: Classifier,
    welcome_message: String,
    limits: HistoryLimits,
}

impl SessionStateMachine {
    /// Create a state machine.
    pub fn new(
        classifier: Classifier,
        welcome_message: impl Into<String>,
        limits: HistoryLimits,
    ) -> Self {
        Self {
            classifier,
            welcome_message: welcome_message.into(),
            limits,
        }
    }

    /// Create a state machine from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let classifier = Classifier::new(&config.protocol, &config.classifier)?;
        Ok(Self::new(
            classifier,
            config.protocol.welcome_message.clone(),
            HistoryLimits {
                max_history_items: config.session.max_history_items,
                max_output_lines: config.session.max_output_lines,
            },
        ))
    }

    /// The line classifier.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// History limits.
    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Apply one resolved unit.
    pub fn apply(
        &self,
        session: &mut TerminalSession,
        unit: &Unit,
        events: &mut Vec<TerminalEvent>,
    ) {
        match unit {
            Unit::Line(line) => self.apply_line(session, line, events),
            Unit::Progress(text) => self.apply_progress(session, text, events),
        }
    }

    /// Apply a full line.
    pub fn apply_line(
        &self,
        session: &mut TerminalSession,
        line: &str,
        events: &mut Vec<TerminalEvent>,
    ) {
        let clean = strip_ansi(line);
        debug!("Session '{}' line ({:?}): {:?}", session.id, session.init_state, clean);

        match session.init_state {
            SessionInitState::Initializing => {
                if self.classifier.contains_login_marker(&clean) {
                    info!("Session '{}' logged in", session.id);
                    session.init_state = SessionInitState::LoggedIn;
                    session.command_history.clear();
                    session
                        .command_history
                        .push(CommandHistoryEntry::welcome(self.welcome_message.clone()));
                    session.current_output.clear();
                    session.last_line_overwritable = false;
                }
            }
            SessionInitState::LoggedIn => {
                if self.classifier.is_ready_marker(&clean) {
                    info!("Session '{}' saw ready marker", session.id);
                    session.init_state = SessionInitState::AwaitingFirstPrompt;
                }
            }
            SessionInitState::AwaitingFirstPrompt => {
                if let Some(prompt) = self.classifier.detect_prompt(&clean) {
                    info!("Session '{}' is ready", session.id);
                    self.handle_prompt(session, prompt, false, events);
                    session.init_state = SessionInitState::Ready;
                }
            }
            SessionInitState::Ready => self.apply_ready_line(session, &clean, events),
        }
    }

    fn apply_ready_line(
        &self,
        session: &mut TerminalSession,
        line: &str,
        events: &mut Vec<TerminalEvent>,
    ) {
        let class = {
            let context = match session.executing_entry() {
                Some(entry) => {
                    LineContext::executing(&entry.command, session.current_output.is_empty())
                }
                None => LineContext::idle(),
            };
            self.classifier.classify(line, &context)
        };

        match class {
            LineClass::ReadyMarker => debug!("Suppressed ready marker"),
            LineClass::Echo => debug!("Suppressed command echo: {:?}", line),
            LineClass::Interactive => {
                let prompt = line.trim().to_string();
                info!("Session '{}' waits for input: {:?}", session.id, prompt);
                session.is_waiting_for_interactive_input = true;
                session.last_interactive_prompt = prompt.clone();
                session.is_interactive_mode = true;
                session.interactive_prompt = prompt;
                self.append_output(session, line, events);
            }
            LineClass::Prompt(prompt) => self.handle_prompt(session, prompt, true, events),
            LineClass::Output => {
                if line.trim().is_empty() {
                    session.last_line_overwritable = false;
                } else {
                    self.append_output(session, line, events);
                }
            }
        }
    }

    /// Apply text ended by a bare carriage return.
    ///
    /// Discarded before the session is ready. Afterwards it overwrites the
    /// most recent output line when that line was itself ended by a carriage
    /// return, or when both look like progress lines; otherwise it is
    /// appended. Either way the next line overwrites it.
    pub fn apply_progress(
        &self,
        session: &mut TerminalSession,
        text: &str,
        events: &mut Vec<TerminalEvent>,
    ) {
        if !session.init_state.is_ready() {
            debug!("Discarding progress before ready: {:?}", text);
            return;
        }
        let clean = strip_ansi(text);
        if clean.trim().is_empty() {
            return;
        }

        let last = match session.executing_index() {
            Some(_) => session.current_output.last_line().map(str::to_string),
            None => session
                .command_history
                .last()
                .filter(|e| e.kind == EntryKind::System)
                .and_then(|e| e.last_line().map(str::to_string)),
        };
        let replace = session.last_line_overwritable
            || last.is_some_and(|last| {
                self.classifier.is_progress_line(&last) && self.classifier.is_progress_line(&clean)
            });

        session.last_line_overwritable = replace;
        self.append_output(session, &clean, events);
        session.last_line_overwritable = true;
    }

    fn append_output(
        &self,
        session: &mut TerminalSession,
        line: &str,
        events: &mut Vec<TerminalEvent>,
    ) {
        let overwrite = std::mem::take(&mut session.last_line_overwritable);
        let max_lines = self.limits.max_output_lines;

        match session.executing_index() {
            Some(idx) => {
                if overwrite {
                    session.current_output.replace_last(line);
                } else {
                    session.current_output.push_line(line);
                }
                let rendered = session.current_output.render();
                let entry = &mut session.command_history[idx];
                entry.output = rendered;
                events.push(TerminalEvent::CommandExecution {
                    session_id: session.id,
                    command_id: entry.id,
                    output_chunk: line.to_string(),
                    is_completed: false,
                });
            }
            None => {
                let trailing = session
                    .command_history
                    .last()
                    .is_some_and(|e| e.kind == EntryKind::System);
                if !trailing {
                    session.push_entry(
                        CommandHistoryEntry::system(""),
                        self.limits.max_history_items,
                    );
                }
                if let Some(entry) = session.command_history.last_mut() {
                    if overwrite {
                        entry.replace_last_line(line, max_lines);
                    } else {
                        entry.append_line(line, max_lines);
                    }
                }
            }
        }
    }

    fn handle_prompt(
        &self,
        session: &mut TerminalSession,
        prompt: PromptMatch,
        include_preceding: bool,
        events: &mut Vec<TerminalEvent>,
    ) {
        if include_preceding {
            if let Some(before) = &prompt.preceding_output {
                self.append_output(session, before, events);
            }
        }
        if let Some(directory) = prompt.directory {
            if directory != session.current_directory {
                debug!("Session '{}' directory: '{}'", session.id, directory);
                session.current_directory = directory.clone();
                events.push(TerminalEvent::DirectoryChanged {
                    session_id: session.id,
                    directory,
                });
            }
        }
        self.finish_current_command(session, events);
    }

    /// Finish the executing command, if any.
    ///
    /// Freezes its output, clears the output buffer and the interactive
    /// flags.
    pub fn finish_current_command(
        &self,
        session: &mut TerminalSession,
        events: &mut Vec<TerminalEvent>,
    ) {
        session.clear_interactive();
        session.last_line_overwritable = false;

        if let Some(idx) = session.executing_index() {
            let output = session.current_output.render();
            let entry = &mut session.command_history[idx];
            entry.output = output;
            entry.is_executing = false;
            info!("Command '{}' finished in session '{}'", entry.command, session.id);
            events.push(TerminalEvent::CommandExecution {
                session_id: session.id,
                command_id: entry.id,
                output_chunk: String::new(),
                is_completed: true,
            });
        }
        session.current_output.clear();
    }

    /// Switch the session into full-screen mode.
    pub fn enter_fullscreen(&self, session: &mut TerminalSession, screen: String) {
        info!("Session '{}' entered full-screen mode", session.id);
        session.is_fullscreen = true;
        session.screen_content = screen;
    }

    /// Replace the rendered full-screen content.
    pub fn update_screen(&self, session: &mut TerminalSession, screen: String) {
        session.screen_content = screen;
    }

    /// Leave full-screen mode.
    ///
    /// Non-blank lines of `trailing` are appended to the executing command,
    /// which is then finished.
    pub fn exit_fullscreen(
        &self,
        session: &mut TerminalSession,
        trailing: &str,
        events: &mut Vec<TerminalEvent>,
    ) {
        info!("Session '{}' left full-screen mode", session.id);
        let clean = strip_ansi(trailing);
        let lines = clean
            .split(|c: char| c == '\n' || c == '\r')
            .filter(|l| !l.trim().is_empty());
        for line in lines {
            if session.executing_index().is_some() {
                self.append_output(session, line, events);
            }
        }
        session.is_fullscreen = false;
        session.screen_content.clear();
        self.finish_current_command(session, events);
    }

    /// Record a submitted command.
    ///
    /// Fails with [`Error::CommandInProgress`] when another command is still
    /// executing and no interactive prompt is pending.
    pub fn begin_command(
        &self,
        session: &mut TerminalSession,
        command: &str,
        events: &mut Vec<TerminalEvent>,
    ) -> Result<CommandDisposition> {
        if session.is_waiting_for_interactive_input {
            debug!("Session '{}' interactive answer: {:?}", session.id, command);
            session.clear_interactive();
            return Ok(CommandDisposition::InteractiveAnswer);
        }
        if let Some(entry) = session.executing_entry() {
            return Err(Error::CommandInProgress(entry.id));
        }

        let trimmed = command.trim();
        if trimmed.is_empty() {
            return Ok(CommandDisposition::Blank);
        }
        if trimmed == "clear" {
            session.command_history.retain(|e| e.kind == EntryKind::Welcome);
            session.current_output.clear();
            session.last_line_overwritable = false;
            return Ok(CommandDisposition::Cleared);
        }

        let entry = CommandHistoryEntry::command(session.prompt_label(), command);
        let id = entry.id;
        session.current_output.clear();
        session.last_line_overwritable = false;
        session.push_entry(entry, self.limits.max_history_items);
        info!("Session '{}' executing '{}'", session.id, command);
        events.push(TerminalEvent::CommandExecution {
            session_id: session.id,
            command_id: id,
            output_chunk: String::new(),
            is_completed: false,
        });
        Ok(CommandDisposition::Started(id))
    }

    /// Record raw input sent outside the command protocol.
    pub fn note_input(&self, session: &mut TerminalSession) {
        if session.is_waiting_for_interactive_input {
            session.clear_interactive();
        }
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        let config = AppConfig::default();
        Self::new(
            Classifier::default(),
            config.protocol.welcome_message,
            HistoryLimits::default(),
        )
    }
}
