//! # ptyshell-core
//!
//! Core types for ptyshell.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other ptyshell crates. It provides:
//!
//! - Session and command identifiers, init states and launch specs
//! - Geometry types (Position, Dimensions)
//! - Cell and color types for the fullscreen screen grid
//! - Error types
//! - YAML configuration
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other ptyshell crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod config;
pub mod error;
pub mod geometry;
pub mod session;

// Re-export commonly used types
pub use cell::{Cell, Color};
pub use config::{
    AppConfig, ClassifierSettings, ProtocolSettings, SessionSettings, ShellSettings,
    TerminalSettings,
};
pub use error::{Error, Result};
pub use geometry::{Dimensions, Position};
pub use session::{CommandId, LaunchSpec, SessionId, SessionInitState, SessionStatus};
