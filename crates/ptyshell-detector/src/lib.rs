//! # ptyshell-detector
//!
//! Line classification for ptyshell.
//!
//! This crate provides:
//! - ANSI escape stripping
//! - Shell prompt detection with working-directory extraction
//! - Interactive (confirmation) prompt detection
//! - Progress-line heuristics
//! - Command-echo and protocol-marker rules
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on ptyshell-core only.
//! Every function here is pure: a cleaned line in, a classification out.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ansi;
pub mod classifier;
pub mod interactive;
pub mod progress;
pub mod prompt;

// Re-export commonly used types
pub use ansi::strip_ansi;
pub use classifier::{is_command_echo, Classifier, LineClass, LineContext};
pub use interactive::InteractiveDetector;
pub use progress::is_progress_line;
pub use prompt::{detect_prompt, is_prompt, PromptKind, PromptMatch};
