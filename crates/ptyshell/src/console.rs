//! Console command parsing.
//!
//! Lines starting with `:` control ptyshell itself; every other line is a
//! command for the selected session.

use thiserror::Error;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Create and select a new session
    New,
    /// Select the session with this 1-based number
    Switch {
        /// 1-based session number
        index: usize,
    },
    /// Close the numbered session, or the selected one
    Close {
        /// 1-based session number
        index: Option<usize>,
    },
    /// List sessions
    List,
    /// Print the selected session's history
    History,
    /// Print the selected session's full-screen content
    Screen,
    /// Send raw text without a newline
    Input {
        /// Text to send
        text: String,
    },
    /// Send Ctrl+C
    Interrupt,
    /// Resize the selected session
    Resize {
        /// Rows
        rows: u16,
        /// Columns
        cols: u16,
    },
    /// Show help
    Help,
    /// Close everything and exit
    Quit,
    /// Run a shell command in the selected session
    Run {
        /// Command line
        command: String,
    },
}

/// Console parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown `:` directive
    #[error("Unknown command ':{0}' (try :help)")]
    UnknownDirective(String),

    /// A numeric argument was missing or malformed
    #[error("Invalid argument for ':{directive}': '{value}'")]
    InvalidArgument {
        /// Directive name
        directive: String,
        /// Offending value
        value: String,
    },
}

/// Help text for the console.
pub const HELP: &str = "\
:new               create a session
:switch <n>        select session n
:close [n]         close session n (default: selected)
:list              list sessions
:history           show the selected session's history
:screen            show the full-screen program's screen
:input <text>      send text without a newline
:int               send Ctrl+C
:resize <rows> <cols>
:help              show this help
:quit              close all sessions and exit
anything else      run it in the selected session";

fn number<T: std::str::FromStr>(directive: &str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidArgument {
        directive: directive.to_string(),
        value: value.to_string(),
    })
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, ParseError> {
    let Some(directive) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Run {
            command: line.to_string(),
        });
    };

    let (name, rest) = match directive.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (directive.trim(), ""),
    };

    match name {
        "new" => Ok(ConsoleCommand::New),
        "switch" | "s" => Ok(ConsoleCommand::Switch {
            index: number(name, rest)?,
        }),
        "close" => {
            let index = if rest.is_empty() {
                None
            } else {
                Some(number(name, rest)?)
            };
            Ok(ConsoleCommand::Close { index })
        }
        "list" | "ls" => Ok(ConsoleCommand::List),
        "history" => Ok(ConsoleCommand::History),
        "screen" => Ok(ConsoleCommand::Screen),
        "input" => {
            // Keep the text verbatim after the single separating space.
            let text = directive
                .strip_prefix("input")
                .and_then(|t| t.strip_prefix(' '))
                .unwrap_or("");
            Ok(ConsoleCommand::Input {
                text: text.to_string(),
            })
        }
        "int" | "interrupt" => Ok(ConsoleCommand::Interrupt),
        "resize" => {
            let mut parts = rest.split_whitespace();
            let rows = number(name, parts.next().unwrap_or(""))?;
            let cols = number(name, parts.next().unwrap_or(""))?;
            Ok(ConsoleCommand::Resize { rows, cols })
        }
        "help" | "h" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(ParseError::UnknownDirective(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_command() {
        assert_eq!(
            parse_line("ls -la").unwrap(),
            ConsoleCommand::Run {
                command: "ls -la".to_string()
            }
        );
        assert_eq!(
            parse_line("").unwrap(),
            ConsoleCommand::Run {
                command: String::new()
            }
        );
    }

    #[test]
    fn test_directives() {
        assert_eq!(parse_line(":new").unwrap(), ConsoleCommand::New);
        assert_eq!(parse_line(":list").unwrap(), ConsoleCommand::List);
        assert_eq!(parse_line(":int").unwrap(), ConsoleCommand::Interrupt);
        assert_eq!(parse_line(":q").unwrap(), ConsoleCommand::Quit);
        assert_eq!(
            parse_line(":switch 2").unwrap(),
            ConsoleCommand::Switch { index: 2 }
        );
        assert_eq!(
            parse_line(":close").unwrap(),
            ConsoleCommand::Close { index: None }
        );
        assert_eq!(
            parse_line(":close 3").unwrap(),
            ConsoleCommand::Close { index: Some(3) }
        );
        assert_eq!(
            parse_line(":resize 40 120").unwrap(),
            ConsoleCommand::Resize { rows: 40, cols: 120 }
        );
    }

    #[test]
    fn test_input_keeps_spacing() {
        assert_eq!(
            parse_line(":input  y ").unwrap(),
            ConsoleCommand::Input {
                text: " y ".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(
            parse_line(":switch two").unwrap_err(),
            ParseError::InvalidArgument {
                directive: "switch".to_string(),
                value: "two".to_string()
            }
        );
        assert!(parse_line(":resize 40").is_err());
        assert_eq!(
            parse_line(":bogus").unwrap_err(),
            ParseError::UnknownDirective("bogus".to_string())
        );
    }
}
