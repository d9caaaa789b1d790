//! Boundary to the environment that hosts the shell.

use std::path::Path;

use tracing::{debug, info};

use ptyshell_core::{Dimensions, Error, LaunchSpec, Result, ShellSettings, TerminalSettings};

/// Prepares the environment a session runs in and says how to start its
/// shell.
pub trait EnvironmentProvisioner: Send + Sync {
    /// Make the environment usable and return the shell's launch spec.
    fn prepare(&self) -> Result<LaunchSpec>;
}

/// Provisioner driven by [`ShellSettings`]: checks that the shell and working
/// directory exist and assembles the environment.
#[derive(Debug, Clone)]
pub struct ConfiguredEnvironment {
    shell: ShellSettings,
    terminal: TerminalSettings,
}

impl ConfiguredEnvironment {
    /// Create a provisioner.
    pub fn new(shell: ShellSettings, terminal: TerminalSettings) -> Self {
        Self { shell, terminal }
    }

    fn search_path(&self, inherited: Option<&str>) -> String {
        let mut entries: Vec<&str> = self.shell.path.iter().map(String::as_str).collect();
        if let Some(inherited) = inherited.filter(|p| !p.is_empty()) {
            entries.push(inherited);
        }
        entries.join(":")
    }
}

impl EnvironmentProvisioner for ConfiguredEnvironment {
    fn prepare(&self) -> Result<LaunchSpec> {
        let program = Path::new(&self.shell.program);
        if program.is_absolute() && !program.is_file() {
            return Err(Error::EnvironmentNotReady(format!(
                "shell '{}' does not exist",
                self.shell.program
            )));
        }
        if let Some(dir) = &self.shell.working_directory {
            if !Path::new(dir).is_dir() {
                return Err(Error::EnvironmentNotReady(format!(
                    "working directory '{dir}' does not exist"
                )));
            }
        }

        let mut spec = LaunchSpec::new(&self.shell.program)
            .with_args(self.shell.args.iter().cloned())
            .with_env("TERM", &self.terminal.term)
            .with_dimensions(Dimensions::new(self.terminal.rows, self.terminal.cols));
        for (key, value) in &self.shell.env {
            spec = spec.with_env(key, value);
        }
        let inherited = std::env::var("PATH").ok();
        let path = self.search_path(inherited.as_deref());
        if !path.is_empty() {
            spec = spec.with_env("PATH", path);
        }
        if let Some(dir) = &self.shell.working_directory {
            spec = spec.with_working_directory(dir);
        }

        debug!("Prepared launch spec: {:?}", spec);
        info!("Environment ready for '{}'", spec.program);
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(program: &str) -> ShellSettings {
        ShellSettings {
            program: program.to_string(),
            args: vec!["-c".to_string(), "true".to_string()],
            path: vec!["/opt/tools/bin".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_shell_rejected() {
        let env = ConfiguredEnvironment::new(
            settings("/nonexistent/shell"),
            TerminalSettings::default(),
        );
        let err = env.prepare().unwrap_err();
        assert!(matches!(err, Error::EnvironmentNotReady(_)));
    }

    #[test]
    fn test_missing_working_directory_rejected() {
        let mut shell = settings("/bin/sh");
        shell.working_directory = Some("/nonexistent/dir".to_string());
        let env = ConfiguredEnvironment::new(shell, TerminalSettings::default());
        assert!(matches!(env.prepare(), Err(Error::EnvironmentNotReady(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_spec_assembled() {
        let mut shell = settings("/bin/sh");
        shell.working_directory = Some("/tmp".to_string());
        let terminal = TerminalSettings {
            rows: 30,
            cols: 100,
            term: "xterm".to_string(),
        };
        let spec = ConfiguredEnvironment::new(shell, terminal).prepare().unwrap();

        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["-c", "true"]);
        assert_eq!(spec.env.get("TERM").map(String::as_str), Some("xterm"));
        assert_eq!(spec.env.get("LANG").map(String::as_str), Some("en_US.UTF-8"));
        assert!(spec.env["PATH"].starts_with("/opt/tools/bin"));
        assert_eq!(spec.working_directory.as_deref(), Some("/tmp"));
        assert_eq!(spec.dimensions, Dimensions::new(30, 100));
    }

    #[test]
    fn test_search_path() {
        let env = ConfiguredEnvironment::new(settings("/bin/sh"), TerminalSettings::default());
        assert_eq!(env.search_path(Some("/usr/bin")), "/opt/tools/bin:/usr/bin");
        assert_eq!(env.search_path(None), "/opt/tools/bin");
    }
}
