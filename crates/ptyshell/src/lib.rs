//! # ptyshell
//!
//! Console front end for ptyshell sessions.
//!
//! ## Architecture
//!
//! This is Layer 4 - the binary that ties together:
//! - ptyshell-core: Core types and configuration
//! - ptyshell-session: Session manager and command history
//!
//! Lines typed at the console are parsed by [`console`], executed by
//! [`driver`], and session events are printed through [`render`].

pub mod console;
pub mod driver;
pub mod render;

// Re-export commonly used types
pub use console::{parse_line, ConsoleCommand, ParseError};
pub use driver::{Driver, DriverError, Flow};
