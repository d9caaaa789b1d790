//! Chunk-to-line reassembly.
//!
//! PTY output arrives in arbitrary chunks. [`LineReassembler`] buffers the
//! unterminated tail and yields:
//!
//! - [`Unit::Line`] for text terminated by `\n` or `\r\n`
//! - [`Unit::Progress`] for text terminated by a bare `\r`
//!
//! An unterminated tail that already looks like a shell or interactive prompt
//! is flushed as a line, since prompts are rarely newline-terminated.

use tracing::trace;

use ptyshell_detector::Classifier;

/// A unit of output resolved from the raw stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A complete line
    Line(String),
    /// Text ended by a bare carriage return; it overwrites the last line
    Progress(String),
}

/// Buffers raw output until it resolves into [`Unit`]s.
#[derive(Debug, Clone, Default)]
pub struct LineReassembler {
    buffer: String,
}

impl LineReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every unit it completes.
    pub fn push(&mut self, chunk: &str, classifier: &Classifier) -> Vec<Unit> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.push_str(chunk);
        self.drain(classifier)
    }

    fn drain(&mut self, classifier: &Classifier) -> Vec<Unit> {
        let mut units = Vec::new();
        loop {
            let newline = self.buffer.find('\n');
            let carriage = self.buffer.find('\r');

            match (carriage, newline) {
                (Some(cr), nl) if nl.map_or(true, |nl| cr < nl) => {
                    if cr + 1 == self.buffer.len() {
                        // Undecided until the next chunk shows whether `\n` follows.
                        break;
                    }
                    let text = self.buffer[..cr].to_string();
                    if self.buffer[cr + 1..].starts_with('\n') {
                        self.buffer.drain(..cr + 2);
                        units.push(Unit::Line(text));
                    } else {
                        self.buffer.drain(..cr + 1);
                        units.push(Unit::Progress(text));
                    }
                }
                (_, Some(nl)) => {
                    let text = self.buffer[..nl].to_string();
                    self.buffer.drain(..nl + 1);
                    units.push(Unit::Line(text));
                }
                _ => {
                    if !self.buffer.is_empty() && classifier.should_flush_partial(&self.buffer) {
                        trace!("Flushing prompt-like partial line: {:?}", self.buffer);
                        units.push(Unit::Line(std::mem::take(&mut self.buffer)));
                    }
                    break;
                }
            }
        }
        units
    }

    /// Unresolved tail.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Take the unresolved tail, leaving the reassembler empty.
    pub fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop the unresolved tail.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
