//! Progress-line heuristic.

use lazy_static::lazy_static;
use regex::Regex;

const BLOCK_CHARS: &[char] = &['█', '▓', '░', '▌', '▎', '▍', '▋', '▊', '▉'];

const KEYWORDS: &[&str] = &[
    "downloading",
    "installing",
    "progress",
    "Loading",
    "Downloading",
    "Installing",
];

lazy_static! {
    static ref RATIO: Regex = Regex::new(r"\d+/\d+").expect("invalid regex");
    static ref GAUGE: Regex = Regex::new(r"\[.*\]").expect("invalid regex");
}

/// Whether an ANSI-stripped line looks like a progress indicator.
///
/// Keywords are matched case-sensitively.
pub fn is_progress_line(line: &str) -> bool {
    let clean = line.trim();
    clean.contains('%')
        || clean.contains(BLOCK_CHARS)
        || RATIO.is_match(clean)
        || GAUGE.is_match(clean)
        || KEYWORDS.iter().any(|keyword| clean.contains(keyword))
}
