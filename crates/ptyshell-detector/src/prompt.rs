//! Shell prompt detection and working-directory extraction.
//!
//! Two prompt shapes are recognized:
//!
//! - **Structured**: the shell's prompt embeds `<cwd>PATH</cwd>` before the
//!   trailing `#`/`$`. The path is taken verbatim and any text before the
//!   marker is output that shared the prompt's line.
//! - **Fallback**: the trimmed line ends with `$` or `#`, or looks like
//!   `user@host:path$`. The directory is whatever follows the last `:`.
//!
//! Both are heuristics; program output that looks like a prompt is treated
//! as one.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CWD_PROMPT: Regex = Regex::new(r"<cwd>(.*)</cwd>.*[#$]").expect("invalid regex");
    static ref USER_HOST_PROMPT: Regex =
        Regex::new(r"^.*@[a-zA-Z0-9.\-]+\s?:\s?~?/?.*[#$]\s*$").expect("invalid regex");
    static ref ROOT_PROMPT: Regex =
        Regex::new(r"^root@[a-zA-Z0-9.\-]+:\s?~?/?.*#\s*$").expect("invalid regex");
    static ref FALLBACK_DIRECTORY: Regex =
        Regex::new(r"^.*:\s*(~?/?.*)\s*[#$]$").expect("invalid regex");
}

/// How a prompt was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// `<cwd>…</cwd>` marker emitted by the shell's prompt configuration
    Structured,
    /// Generic `$`/`#` or `user@host:path` shape
    Fallback,
}

/// A detected shell prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMatch {
    /// Which pattern matched
    pub kind: PromptKind,
    /// Working directory, if one could be extracted
    pub directory: Option<String>,
    /// Non-blank text that preceded the prompt marker on the same line
    pub preceding_output: Option<String>,
}

fn is_fallback_prompt(trimmed: &str) -> bool {
    trimmed.ends_with('$')
        || trimmed.ends_with('#')
        || USER_HOST_PROMPT.is_match(trimmed)
        || ROOT_PROMPT.is_match(trimmed)
}

fn fallback_directory(trimmed: &str) -> Option<String> {
    let directory = match FALLBACK_DIRECTORY.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
        None => trimmed
            .trim_end_matches(|c: char| c == '$' || c == '#')
            .trim()
            .to_string(),
    };
    (!directory.is_empty()).then_some(directory)
}

/// Detect a shell prompt in an ANSI-stripped line.
pub fn detect_prompt(line: &str) -> Option<PromptMatch> {
    if let Some(caps) = CWD_PROMPT.captures(line) {
        let whole = caps.get(0)?;
        let directory = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "~".to_string());
        let before = &line[..whole.start()];
        return Some(PromptMatch {
            kind: PromptKind::Structured,
            directory: Some(directory),
            preceding_output: (!before.trim().is_empty()).then(|| before.to_string()),
        });
    }

    let trimmed = line.trim();
    if !is_fallback_prompt(trimmed) {
        return None;
    }

    Some(PromptMatch {
        kind: PromptKind::Fallback,
        directory: fallback_directory(trimmed),
        preceding_output: None,
    })
}

/// Whether an ANSI-stripped line looks like a shell prompt.
pub fn is_prompt(line: &str) -> bool {
    CWD_PROMPT.is_match(line) || is_fallback_prompt(line.trim())
}
