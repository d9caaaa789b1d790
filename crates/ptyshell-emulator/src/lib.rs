//! # ptyshell-emulator
//!
//! Terminal emulation primitives for ptyshell.
//!
//! This crate provides:
//! - A fixed-size character grid with cursor tracking
//! - A VTE-based parser for the CSI subset used by fullscreen programs
//! - PTY (pseudo-terminal) process lifecycle management
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on ptyshell-core
//! and provides terminal emulation functionality.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod grid;
pub mod parser;
pub mod pty;

// Re-export commonly used types
pub use grid::{EraseMode, Grid};
pub use parser::ScreenParser;
pub use pty::PtyHandle;
