//! # ptyshell-session
//!
//! Sessions for ptyshell: structured command history built from PTY output.
//!
//! This crate provides:
//! - The session and command history data model
//! - Chunk-to-line reassembly
//! - The per-session state machine (login, readiness, prompts, full-screen)
//! - A shared store with state snapshots and event fan-out
//! - The per-session runtime (PTY reader, read loop, writer)
//! - The session manager (create, switch, close, send)
//!
//! ## Architecture
//!
//! This is Layer 3 in the architecture - it depends on ptyshell-core,
//! ptyshell-emulator and ptyshell-detector.
//!
//! ```text
//! PTY -> reader thread -> read loop -> OutputProcessor
//!          -> LineReassembler -> SessionStateMachine -> TerminalStore
//!          -> ScreenParser (full-screen mode)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod events;
pub mod machine;
pub mod manager;
pub mod output;
pub mod processor;
pub mod provision;
pub mod reassembler;
pub mod runtime;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use decoder::Utf8Decoder;
pub use events::TerminalEvent;
pub use machine::{CommandDisposition, HistoryLimits, SessionStateMachine};
pub use manager::SessionManager;
pub use output::OutputBuffer;
pub use processor::{OutputProcessor, ENTER_FULLSCREEN, EXIT_FULLSCREEN};
pub use provision::{ConfiguredEnvironment, EnvironmentProvisioner};
pub use reassembler::{LineReassembler, Unit};
pub use runtime::{RuntimeOptions, SessionRuntime};
pub use session::{CommandHistoryEntry, EntryKind, TerminalSession, TerminalState};
pub use store::{Removal, TerminalStore};
