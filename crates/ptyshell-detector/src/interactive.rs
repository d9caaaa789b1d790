//! Interactive (y/n, confirmation) prompt detection.

use regex::{RegexSet, RegexSetBuilder};
use tracing::debug;

use ptyshell_core::{Error, Result};

/// Built-in patterns, matched case-insensitively anywhere in the trimmed line.
pub const BUILTIN_PATTERNS: &[&str] = &[
    r"\[y/n\]",
    r"\[y/n/.*\]",
    r"\(y/n\)",
    r"\(yes/no\)",
    r"continue\?",
    r"proceed\?",
    r"do you want",
    r"are you sure",
    r"confirm.*\?",
    r"press.*to continue",
    r"\[.*y.*n.*\]",
];

/// Detector for prompts where the running program waits for a confirmation.
#[derive(Debug, Clone)]
pub struct InteractiveDetector {
    patterns: RegexSet,
}

impl InteractiveDetector {
    /// Build a detector from the built-in patterns plus `extra` ones.
    pub fn new(extra: &[String]) -> Result<Self> {
        let patterns = RegexSetBuilder::new(
            BUILTIN_PATTERNS
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str)),
        )
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::InvalidPattern(e.to_string()))?;

        if !extra.is_empty() {
            debug!("Interactive detector loaded {} extra patterns", extra.len());
        }
        Ok(Self { patterns })
    }

    /// Whether an ANSI-stripped line is an interactive prompt.
    pub fn is_interactive_prompt(&self, line: &str) -> bool {
        let clean = line.trim().to_lowercase();
        !clean.is_empty() && self.patterns.is_match(&clean)
    }

    /// Number of active patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for InteractiveDetector {
    fn default() -> Self {
        let patterns = RegexSetBuilder::new(BUILTIN_PATTERNS)
            .case_insensitive(true)
            .build()
            .expect("invalid built-in interactive patterns");
        Self { patterns }
    }
}
