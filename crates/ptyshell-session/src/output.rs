//! Output accumulation for the executing command.

use std::collections::VecDeque;

use serde::Serialize;

/// Header placed in front of output that lost its oldest lines.
pub fn truncation_header(kept: usize) -> String {
    format!("... (output truncated, showing last {kept} lines) ...")
}

/// Cap `text` to its last `max_lines` lines.
///
/// Text already carrying a truncation header is re-truncated without counting
/// the old header.
pub fn limit_output(text: &str, max_lines: usize) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines
        .first()
        .is_some_and(|first| first.starts_with("... (output truncated, showing last "))
    {
        lines.remove(0);
    }
    if lines.len() <= max_lines {
        return text.to_string();
    }
    let kept = &lines[lines.len() - max_lines..];
    format!("{}\n{}", truncation_header(max_lines), kept.join("\n"))
}

/// Lines produced by the executing command since it started.
///
/// Only the newest `max_lines` lines are kept; the number of dropped lines is
/// remembered so that rendering can say the output was cut.
#[derive(Debug, Clone, Serialize)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    dropped: usize,
    max_lines: usize,
}

impl OutputBuffer {
    /// Create an empty buffer keeping at most `max_lines` lines.
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            dropped: 0,
            max_lines: max_lines.max(1),
        }
    }

    /// Append a line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
            self.dropped += 1;
        }
    }

    /// Replace the most recent line, or append if the buffer is empty.
    pub fn replace_last(&mut self, line: impl Into<String>) {
        match self.lines.back_mut() {
            Some(last) => *last = line.into(),
            None => self.push_line(line),
        }
    }

    /// The most recent line.
    pub fn last_line(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Whether nothing has been accumulated since the last clear.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.dropped == 0
    }

    /// Number of lines currently kept.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Number of lines dropped from the front.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.dropped = 0;
    }

    /// Render the kept lines, trimmed, with a truncation header when lines
    /// were dropped.
    pub fn render(&self) -> String {
        let body = self
            .lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if self.dropped > 0 {
            format!("{}\n{}", truncation_header(self.lines.len()), body.trim())
        } else {
            body.trim().to_string()
        }
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
