//! Configuration types for ptyshell.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Dimensions, Error};

/// Application configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shell launch settings
    pub shell: ShellSettings,
    /// Terminal settings
    pub terminal: TerminalSettings,
    /// Session bootstrap protocol settings
    pub protocol: ProtocolSettings,
    /// Session limits
    pub session: SessionSettings,
    /// Line classifier settings
    pub classifier: ClassifierSettings,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shell: ShellSettings::default(),
            terminal: TerminalSettings::default(),
            protocol: ProtocolSettings::default(),
            session: SessionSettings::default(),
            classifier: ClassifierSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.shell.program.trim().is_empty() {
            return Err(Error::Config("shell.program cannot be empty".to_string()));
        }

        if self.terminal.rows == 0 || self.terminal.cols == 0 {
            return Err(Error::Config("terminal dimensions must be > 0".to_string()));
        }

        if self.protocol.login_marker.trim().is_empty()
            || self.protocol.ready_marker.trim().is_empty()
        {
            return Err(Error::Config("protocol markers cannot be empty".to_string()));
        }

        self.session.validate()?;

        for pattern in &self.classifier.extra_interactive_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                Error::Config(format!("Invalid interactive pattern '{pattern}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Terminal dimensions for new sessions.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.terminal.rows, self.terminal.cols)
    }
}

/// How the shell process is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Program to execute
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Working directory (None = inherit)
    pub working_directory: Option<String>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    /// Directories prepended to PATH
    pub path: Vec<String>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            program: "/bin/bash".to_string(),
            args: vec![
                "-c".to_string(),
                "echo LOGIN_SUCCESSFUL; exec /bin/bash -il".to_string(),
            ],
            working_directory: None,
            env: BTreeMap::from([("LANG".to_string(), "en_US.UTF-8".to_string())]),
            path: Vec::new(),
        }
    }
}

/// Terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Terminal rows
    pub rows: u16,
    /// Terminal columns
    pub cols: u16,
    /// TERM environment variable value
    pub term: String,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            term: "xterm-256color".to_string(),
        }
    }
}

/// Markers and texts used by the session bootstrap protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Marker printed by the login script once the userland is entered
    pub login_marker: String,
    /// Marker echoed back after the first input line
    pub ready_marker: String,
    /// Text of the synthetic entry shown once login succeeds
    pub welcome_message: String,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            login_marker: "LOGIN_SUCCESSFUL".to_string(),
            ready_marker: "TERMINAL_READY".to_string(),
            welcome_message: concat!(
                "             _         _          _ _ \n",
                " _ __  _   _| |_ _   _| |__   ___| | |\n",
                "| '_ \\| | | | __| | | | '_ \\ / _ \\ | |\n",
                "| |_) | |_| | |_| |_| | | | |  __/ | |\n",
                "| .__/ \\__, |\\__|\\__, |_| |_|\\___|_|_|\n",
                "|_|    |___/     |___/                \n",
                "\n",
                "  >> Your sandboxed shell is ready <<"
            )
            .to_string(),
        }
    }
}

/// Limits applied to sessions and their history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Maximum history entries kept per session
    pub max_history_items: usize,
    /// Maximum output lines kept per history entry
    pub max_output_lines: usize,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Size of a single PTY read
    pub read_buffer_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            max_history_items: 500,
            max_output_lines: 1000,
            event_capacity: 256,
            read_buffer_size: 4096,
        }
    }
}

impl SessionSettings {
    /// Validate session limits.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_sessions == 0 {
            return Err(Error::Config("session.max_sessions must be > 0".to_string()));
        }
        if self.max_history_items < 2 {
            return Err(Error::Config(
                "session.max_history_items must be >= 2".to_string(),
            ));
        }
        if self.max_output_lines == 0 {
            return Err(Error::Config(
                "session.max_output_lines must be > 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("session.event_capacity must be > 0".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config(
                "session.read_buffer_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Line classifier settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Extra case-insensitive regexes that mark an interactive prompt
    pub extra_interactive_patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.shell.program, "/bin/bash");
        assert_eq!(config.session.max_sessions, 10);
        assert_eq!(config.session.max_history_items, 500);
        assert_eq!(config.session.max_output_lines, 1000);
        assert_eq!(config.protocol.ready_marker, "TERMINAL_READY");
        assert_eq!(config.dimensions(), Dimensions::new(24, 80));
    }

    #[test]
    fn test_default_shell_emits_login_marker() {
        let config = AppConfig::default();
        let script = config.shell.args.join(" ");
        assert!(script.contains(&config.protocol.login_marker));
    }

    #[test]
    fn test_config_validation() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_max_sessions() {
        let mut config = AppConfig::default();
        config.session.max_sessions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_history_limit() {
        let mut config = AppConfig::default();
        config.session.max_history_items = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut config = AppConfig::default();
        config.terminal.rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_program() {
        let mut config = AppConfig::default();
        config.shell.program = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_marker() {
        let mut config = AppConfig::default();
        config.protocol.ready_marker = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
shell:
  program: /usr/bin/zsh
  args: ["-il"]
  working_directory: /home/user
  env:
    TERM: screen
  path:
    - /opt/rootfs/bin

terminal:
  rows: 30
  cols: 120

protocol:
  ready_marker: SHELL_UP

session:
  max_sessions: 3
  max_output_lines: 200

log_level: debug
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.shell.program, "/usr/bin/zsh");
        assert_eq!(config.shell.args, vec!["-il"]);
        assert_eq!(config.shell.working_directory.as_deref(), Some("/home/user"));
        assert_eq!(config.shell.env.get("TERM").map(String::as_str), Some("screen"));
        assert_eq!(config.shell.path, vec!["/opt/rootfs/bin"]);
        assert_eq!(config.terminal.rows, 30);
        assert_eq!(config.terminal.cols, 120);
        assert_eq!(config.terminal.term, "xterm-256color");
        assert_eq!(config.protocol.ready_marker, "SHELL_UP");
        assert_eq!(config.protocol.login_marker, "LOGIN_SUCCESSFUL");
        assert_eq!(config.session.max_sessions, 3);
        assert_eq!(config.session.max_output_lines, 200);
        assert_eq!(config.session.max_history_items, 500);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_extra_interactive_patterns() {
        let yaml = r#"
classifier:
  extra_interactive_patterns:
    - "overwrite .*\\?"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.classifier.extra_interactive_patterns.len(), 1);
    }

    #[test]
    fn test_invalid_regex_pattern() {
        let yaml = r#"
classifier:
  extra_interactive_patterns:
    - "([unclosed"
"#;
        let result = AppConfig::from_yaml(yaml);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = AppConfig::from_yaml("session: [not, a, map]");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
