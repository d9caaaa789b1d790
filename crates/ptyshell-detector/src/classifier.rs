//! Line classification for steady-state sessions.
//!
//! [`Classifier::classify`] applies the checks in a fixed order; the first
//! one that matches decides the class:
//!
//! 1. readiness marker
//! 2. command echo
//! 3. interactive prompt
//! 4. shell prompt
//! 5. plain output

use ptyshell_core::{ClassifierSettings, ProtocolSettings, Result};

use crate::ansi::strip_ansi;
use crate::interactive::InteractiveDetector;
use crate::progress::is_progress_line;
use crate::prompt::{detect_prompt, is_prompt, PromptMatch};

/// What the session knows about the command currently executing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineContext<'a> {
    /// Text of the executing command, if any
    pub executing_command: Option<&'a str>,
    /// Whether the executing command has produced no output yet
    pub output_is_empty: bool,
}

impl<'a> LineContext<'a> {
    /// Context with no executing command.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Context for an executing command.
    pub fn executing(command: &'a str, output_is_empty: bool) -> Self {
        Self {
            executing_command: Some(command),
            output_is_empty,
        }
    }
}

/// Classification of one ANSI-stripped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// The readiness marker echoed back by the shell
    ReadyMarker,
    /// The terminal's echo of the executing command
    Echo,
    /// The running program waits for a confirmation
    Interactive,
    /// A shell prompt; the executing command has finished
    Prompt(PromptMatch),
    /// Anything else
    Output,
}

/// Whether `line` is the echo of `command`: the first output line of the
/// command and equal to it after trimming.
pub fn is_command_echo(line: &str, context: &LineContext<'_>) -> bool {
    match context.executing_command {
        Some(command) => context.output_is_empty && line.trim() == command.trim(),
        None => false,
    }
}

/// Session classifier combining markers, prompt, interactive and progress rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    login_marker: String,
    ready_marker: String,
    interactive: InteractiveDetector,
}

impl Classifier {
    /// Create a classifier from protocol and classifier settings.
    pub fn new(protocol: &ProtocolSettings, settings: &ClassifierSettings) -> Result<Self> {
        Ok(Self {
            login_marker: protocol.login_marker.clone(),
            ready_marker: protocol.ready_marker.clone(),
            interactive: InteractiveDetector::new(&settings.extra_interactive_patterns)?,
        })
    }

    /// The readiness marker.
    pub fn ready_marker(&self) -> &str {
        &self.ready_marker
    }

    /// Whether the line carries the login-success marker anywhere.
    pub fn contains_login_marker(&self, line: &str) -> bool {
        line.contains(&self.login_marker)
    }

    /// Whether the ANSI-stripped line is exactly the readiness marker.
    pub fn is_ready_marker(&self, line: &str) -> bool {
        line.trim() == self.ready_marker
    }

    /// Whether the line is a shell prompt.
    pub fn is_prompt(&self, line: &str) -> bool {
        is_prompt(line)
    }

    /// Detect a shell prompt and extract its directory.
    pub fn detect_prompt(&self, line: &str) -> Option<PromptMatch> {
        detect_prompt(line)
    }

    /// Whether the line is an interactive prompt.
    pub fn is_interactive_prompt(&self, line: &str) -> bool {
        self.interactive.is_interactive_prompt(line)
    }

    /// Whether the line looks like a progress indicator.
    pub fn is_progress_line(&self, line: &str) -> bool {
        is_progress_line(line)
    }

    /// Whether an unterminated buffer tail should be flushed as a line now.
    ///
    /// Prompts are rarely newline-terminated, so a tail that already looks
    /// like one is not held back.
    pub fn should_flush_partial(&self, raw: &str) -> bool {
        let clean = strip_ansi(raw);
        self.is_prompt(&clean) || self.is_interactive_prompt(&clean)
    }

    /// Classify an ANSI-stripped line of a steady-state session.
    pub fn classify(&self, line: &str, context: &LineContext<'_>) -> LineClass {
        if self.is_ready_marker(line) {
            LineClass::ReadyMarker
        } else if is_command_echo(line, context) {
            LineClass::Echo
        } else if self.is_interactive_prompt(line) {
            LineClass::Interactive
        } else if let Some(prompt) = self.detect_prompt(line) {
            LineClass::Prompt(prompt)
        } else {
            LineClass::Output
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let protocol = ProtocolSettings::default();
        Self {
            login_marker: protocol.login_marker,
            ready_marker: protocol.ready_marker,
            interactive: InteractiveDetector::default(),
        }
    }
}
