//! Executes console commands against a [`SessionManager`].

use std::sync::Arc;

use ptyshell_core::SessionId;
use ptyshell_session::SessionManager;
use thiserror::Error;
use tracing::debug;

use crate::console::{ConsoleCommand, HELP};
use crate::render;

/// Errors surfaced to the console user.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A session number outside `1..=count`
    #[error("No session number {index} (have {count})")]
    NoSuchSession {
        /// Requested number
        index: usize,
        /// Number of sessions
        count: usize,
    },

    /// Failure reported by the session manager
    #[error(transparent)]
    Session(#[from] ptyshell_core::Error),
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading, printing this text if present
    Continue(Option<String>),
    /// Leave the loop
    Quit,
}

/// Console driver over a shared manager.
#[derive(Debug, Clone)]
pub struct Driver {
    manager: Arc<SessionManager>,
}

impl Driver {
    /// Create a driver.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// The driven manager.
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    fn session_at(&self, index: usize) -> Result<SessionId, DriverError> {
        let state = self.manager.snapshot();
        index
            .checked_sub(1)
            .and_then(|i| state.sessions.get(i))
            .map(|s| s.id)
            .ok_or(DriverError::NoSuchSession {
                index,
                count: state.sessions.len(),
            })
    }

    fn current(&self) -> Result<SessionId, DriverError> {
        self.manager
            .snapshot()
            .current_session_id
            .ok_or(DriverError::Session(ptyshell_core::Error::NoActiveSession))
    }

    /// Execute one command.
    pub async fn execute(&self, command: ConsoleCommand) -> Result<Flow, DriverError> {
        debug!("Console command: {:?}", command);
        let text = match command {
            ConsoleCommand::New => {
                self.manager.create_session().await?;
                None
            }
            ConsoleCommand::Switch { index } => {
                let id = self.session_at(index)?;
                self.manager.switch_to_session(&id).await?;
                Some(render::session_list(&self.manager.snapshot()))
            }
            ConsoleCommand::Close { index } => {
                let id = match index {
                    Some(index) => self.session_at(index)?,
                    None => self.current()?,
                };
                self.manager.close_session(&id).await?;
                None
            }
            ConsoleCommand::List => Some(render::session_list(&self.manager.snapshot())),
            ConsoleCommand::History => {
                let session = self.manager.get_session(&self.current()?)?;
                Some(render::history(&session))
            }
            ConsoleCommand::Screen => {
                let session = self.manager.get_session(&self.current()?)?;
                Some(if session.is_fullscreen {
                    session.screen_content
                } else {
                    "(not in full-screen mode)".to_string()
                })
            }
            ConsoleCommand::Input { text } => {
                self.manager.send_input(&text).await?;
                None
            }
            ConsoleCommand::Interrupt => {
                self.manager.send_interrupt_signal().await?;
                None
            }
            ConsoleCommand::Resize { rows, cols } => {
                self.manager
                    .resize_session(&self.current()?, rows, cols)
                    .await?;
                None
            }
            ConsoleCommand::Help => Some(HELP.to_string()),
            ConsoleCommand::Quit => {
                self.manager.close_all().await;
                return Ok(Flow::Quit);
            }
            ConsoleCommand::Run { command } => {
                self.manager.send_command(&command).await?;
                None
            }
        };
        Ok(Flow::Continue(text))
    }
}
