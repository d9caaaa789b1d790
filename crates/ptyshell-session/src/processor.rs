//! Routes raw output of one session through reassembly, classification and
//! the screen parser.
//!
//! An [`OutputProcessor`] is owned by the session's read loop and is the only
//! component touching that session's unresolved buffer and screen grid.

use std::sync::Arc;

use tracing::{debug, info};

use ptyshell_core::{Dimensions, SessionId};
use ptyshell_emulator::ScreenParser;

use crate::machine::SessionStateMachine;
use crate::reassembler::{LineReassembler, Unit};
use crate::store::TerminalStore;

/// Sequence switching to the alternate screen buffer.
pub const ENTER_FULLSCREEN: &str = "\x1b[?1049h";
/// Sequence switching back to the main screen buffer.
pub const EXIT_FULLSCREEN: &str = "\x1b[?1049l";

/// Length of the longest suffix of `text` that is a proper prefix of `pattern`.
fn partial_suffix_len(text: &str, pattern: &str) -> usize {
    (1..pattern.len())
        .rev()
        .find(|&len| text.ends_with(&pattern[..len]))
        .unwrap_or(0)
}

/// Per-session output pipeline.
#[derive(Debug)]
pub struct OutputProcessor {
    session_id: SessionId,
    store: Arc<TerminalStore>,
    machine: Arc<SessionStateMachine>,
    reassembler: LineReassembler,
    screen: ScreenParser,
    fullscreen: bool,
    /// Possible start of [`EXIT_FULLSCREEN`] held back from the screen parser
    screen_tail: String,
}

impl OutputProcessor {
    /// Create a processor for `session_id`.
    pub fn new(
        session_id: SessionId,
        store: Arc<TerminalStore>,
        machine: Arc<SessionStateMachine>,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            session_id,
            store,
            machine,
            reassembler: LineReassembler::new(),
            screen: ScreenParser::new(dimensions),
            fullscreen: false,
            screen_tail: String::new(),
        }
    }

    /// Session this processor feeds.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether a full-screen program owns the terminal.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Unresolved text held by the reassembler.
    pub fn pending(&self) -> &str {
        self.reassembler.buffer()
    }

    /// Process one chunk of decoded output.
    pub fn process_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        debug!("Session '{}' chunk: {:?}", self.session_id, chunk);

        let mut remaining = chunk.to_string();
        while !remaining.is_empty() {
            remaining = if self.fullscreen {
                self.process_fullscreen(remaining)
            } else {
                self.process_lines(remaining)
            };
        }
    }

    /// Resize the screen grid. Its content is cleared.
    pub fn resize(&mut self, dimensions: Dimensions) {
        self.screen.resize(dimensions);
        if self.fullscreen {
            let rendered = self.screen.render();
            let machine = Arc::clone(&self.machine);
            self.store.update_session(&self.session_id, |session, _| {
                machine.update_screen(session, rendered);
            });
        }
    }

    /// Handle text outside full-screen mode. Returns text following an
    /// enter sequence, to be handled in full-screen mode.
    ///
    /// An exit sequence seen here still finishes the executing command.
    fn process_lines(&mut self, text: String) -> String {
        let mut combined = self.reassembler.take_buffer();
        combined.push_str(&text);

        let marker = [ENTER_FULLSCREEN, EXIT_FULLSCREEN]
            .into_iter()
            .filter_map(|m| combined.find(m).map(|idx| (idx, m)))
            .min_by_key(|&(idx, _)| idx);

        let Some((idx, marker)) = marker else {
            let units = self.reassembler.push(&combined, self.machine.classifier());
            self.apply_units(&units);
            return String::new();
        };

        let after = combined[idx + marker.len()..].to_string();
        let mut units = self.reassembler.push(&combined[..idx], self.machine.classifier());
        let tail = self.reassembler.take_buffer();
        let tail = tail.trim_end_matches('\r');
        if !tail.trim().is_empty() {
            units.push(Unit::Line(tail.to_string()));
        }
        self.apply_units(&units);

        let machine = Arc::clone(&self.machine);
        if marker == ENTER_FULLSCREEN {
            info!("Session '{}' switching to full-screen mode", self.session_id);
            self.fullscreen = true;
            self.screen.reset();
            self.screen_tail.clear();
            let screen = self.screen.render();
            self.store.update_session(&self.session_id, |session, _| {
                machine.enter_fullscreen(session, screen);
            });
        } else {
            info!("Session '{}' left the alternate screen", self.session_id);
            self.store.update_session(&self.session_id, |session, events| {
                machine.exit_fullscreen(session, "", events);
            });
        }
        after
    }

    /// Handle text in full-screen mode. Returns text following an exit
    /// sequence, to be handled as lines.
    fn process_fullscreen(&mut self, text: String) -> String {
        let mut data = std::mem::take(&mut self.screen_tail);
        data.push_str(&text);

        match data.find(EXIT_FULLSCREEN) {
            Some(idx) => {
                let before = &data[..idx];
                let after = data[idx + EXIT_FULLSCREEN.len()..].to_string();
                info!("Session '{}' leaving full-screen mode", self.session_id);
                self.fullscreen = false;
                self.screen.reset();
                let machine = Arc::clone(&self.machine);
                self.store.update_session(&self.session_id, |session, events| {
                    machine.exit_fullscreen(session, before, events);
                });
                after
            }
            None => {
                let keep = partial_suffix_len(&data, EXIT_FULLSCREEN);
                let split = data.len() - keep;
                self.screen.process(data[..split].as_bytes());
                self.screen_tail = data[split..].to_string();

                let rendered = self.screen.render();
                let machine = Arc::clone(&self.machine);
                self.store.update_session(&self.session_id, |session, _| {
                    machine.update_screen(session, rendered);
                });
                String::new()
            }
        }
    }

    fn apply_units(&self, units: &[Unit]) {
        if units.is_empty() {
            return;
        }
        let machine = Arc::clone(&self.machine);
        self.store.update_session(&self.session_id, |session, events| {
            for unit in units {
                machine.apply(session, unit, events);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptyshell_core::SessionInitState;

    use crate::session::TerminalSession;

    fn setup() -> (Arc<TerminalStore>, OutputProcessor) {
        let store = Arc::new(TerminalStore::new(64));
        let mut session = TerminalSession::new(SessionId::new(), "Session 1", 1000);
        session.init_state = SessionInitState::Ready;
        let id = session.id;
        store.add_session(session, true);
        let processor = OutputProcessor::new(
            id,
            Arc::clone(&store),
            Arc::new(SessionStateMachine::default()),
            Dimensions::new(5, 20),
        );
        (store, processor)
    }

    #[test]
    fn test_partial_suffix_len() {
        assert_eq!(partial_suffix_len("abc", EXIT_FULLSCREEN), 0);
        assert_eq!(partial_suffix_len("abc\x1b", EXIT_FULLSCREEN), 1);
        assert_eq!(partial_suffix_len("abc\x1b[?104", EXIT_FULLSCREEN), 7);
        assert_eq!(partial_suffix_len(EXIT_FULLSCREEN, EXIT_FULLSCREEN), 0);
    }

    #[test]
    fn test_lines_reach_store() {
        let (store, mut processor) = setup();
        processor.process_chunk("hello\nwor");
        processor.process_chunk("ld\n");
        let session = store.current_session().unwrap();
        assert_eq!(session.command_history.len(), 1);
        assert_eq!(session.command_history[0].output, "hello\nworld");
        assert!(processor.pending().is_empty());
    }

    #[test]
    fn test_fullscreen_roundtrip() {
        let (store, mut processor) = setup();
        let id = processor.session_id();
        store.update_session(&id, |s, ev| {
            SessionStateMachine::default().begin_command(s, "vim", ev).unwrap();
        });

        processor.process_chunk("vim\r\n\x1b[?1049h\x1b[2J\x1b[1;1Hfile");
        assert!(processor.is_fullscreen());
        let session = store.current_session().unwrap();
        assert!(session.is_fullscreen);
        assert!(session.screen_content.starts_with("file"));

        processor.process_chunk("\x1b[?1049l");
        assert!(!processor.is_fullscreen());
        let session = store.current_session().unwrap();
        assert!(!session.is_fullscreen);
        assert!(!session.command_history[0].is_executing);
        assert_eq!(session.command_history[0].output, "");
    }

    #[test]
    fn test_exit_sequence_split_across_chunks() {
        let (store, mut processor) = setup();
        processor.process_chunk("\x1b[?1049hX\x1b[?10");
        assert!(processor.is_fullscreen());
        processor.process_chunk("49lafter\n");
        assert!(!processor.is_fullscreen());
        let session = store.current_session().unwrap();
        assert_eq!(session.command_history.last().unwrap().output, "after");
    }

    #[test]
    fn test_exit_sequence_in_line_mode_finishes_command() {
        let (store, mut processor) = setup();
        let id = processor.session_id();
        store.update_session(&id, |s, ev| {
            SessionStateMachine::default()
                .begin_command(s, "tput rmcup", ev)
                .unwrap();
        });

        processor.process_chunk("tput rmcup\r\n\x1b[?1049l");
        assert!(!processor.is_fullscreen());
        let session = store.current_session().unwrap();
        assert_eq!(session.executing_count(), 0);
        assert!(!session.is_fullscreen);
    }

    #[test]
    fn test_exit_sequence_split_in_line_mode() {
        let (store, mut processor) = setup();
        let id = processor.session_id();
        store.update_session(&id, |s, ev| {
            SessionStateMachine::default().begin_command(s, "reset", ev).unwrap();
        });

        processor.process_chunk("reset\r\nok\r\n\x1b[?10");
        assert_eq!(store.current_session().unwrap().executing_count(), 1);
        processor.process_chunk("49l");
        let session = store.current_session().unwrap();
        assert_eq!(session.executing_count(), 0);
        assert_eq!(session.command_history[0].output, "ok");
    }

    #[test]
    fn test_held_carriage_return_dropped_before_fullscreen() {
        let (store, mut processor) = setup();
        let id = processor.session_id();
        store.update_session(&id, |s, ev| {
            SessionStateMachine::default().begin_command(s, "prog", ev).unwrap();
        });

        processor.process_chunk("prog\r\nabc\r");
        processor.process_chunk("\x1b[?1049hX\x1b[?1049l");
        let session = store.current_session().unwrap();
        let entry = &session.command_history[0];
        assert!(!entry.is_executing);
        assert_eq!(entry.output, "abc\nX");
    }

    #[test]
    fn test_enter_sequence_split_across_chunks() {
        let (store, mut processor) = setup();
        processor.process_chunk("\x1b[?10");
        assert!(!processor.is_fullscreen());
        processor.process_chunk("49hdraw");
        assert!(processor.is_fullscreen());
        assert!(store.current_session().unwrap().screen_content.starts_with("draw"));
    }
}
