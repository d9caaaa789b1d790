//! ANSI/VT escape sequence parser for fullscreen programs, using the VTE crate.

use tracing::{debug, trace};
use vte::{Params, Perform};

use ptyshell_core::{Color, Dimensions, Position};

use crate::grid::{EraseMode, Grid};

/// Screen parser: a persistent VTE state machine driving a [`Grid`].
///
/// The VTE state survives between calls, so an escape sequence split across
/// two chunks is still recognized.
pub struct ScreenParser {
    state: vte::Parser,
    performer: GridPerformer,
}

impl std::fmt::Debug for ScreenParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenParser")
            .field("grid", &self.performer.grid)
            .finish_non_exhaustive()
    }
}

impl ScreenParser {
    /// Create a parser with an empty grid of the given dimensions.
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            state: vte::Parser::new(),
            performer: GridPerformer {
                grid: Grid::new(dimensions),
            },
        }
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &Grid {
        &self.performer.grid
    }

    /// Feed raw bytes through the VTE parser.
    pub fn process(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state.advance(&mut self.performer, *byte);
        }
    }

    /// Feed text and return the rendered screen.
    pub fn parse(&mut self, text: &str) -> String {
        self.process(text.as_bytes());
        self.render()
    }

    /// Render the screen as text, rows joined by newlines.
    pub fn render(&self) -> String {
        self.performer.grid.render()
    }

    /// Resize the screen. Content is cleared.
    pub fn resize(&mut self, dimensions: Dimensions) {
        debug!("Resizing screen to {}x{}", dimensions.rows, dimensions.cols);
        self.performer.grid.resize(dimensions);
    }

    /// Clear the screen and drop any half-parsed sequence.
    pub fn reset(&mut self) {
        self.state = vte::Parser::new();
        self.performer.grid.clear();
    }
}

/// VTE callback target that applies actions to the grid.
#[derive(Debug)]
struct GridPerformer {
    grid: Grid,
}

fn first_param(params: &Params, default: u16) -> u16 {
    params
        .iter()
        .next()
        .and_then(|p| p.first().copied())
        .unwrap_or(default)
}

impl GridPerformer {
    /// Process SGR (Select Graphic Rendition) parameters.
    fn process_sgr(&mut self, params: &Params) {
        let mut iter = params.iter().map(|p| p.first().copied().unwrap_or(0));
        let mut any = false;

        while let Some(code) = iter.next() {
            any = true;
            match code {
                0 => self.grid.reset_style(),
                1 => self.grid.set_bold(true),
                22 => self.grid.set_bold(false),
                30..=37 => self.grid.set_fg(Color::from_ansi(code - 30)),
                39 => self.grid.set_fg(Color::Default),
                40..=47 => self.grid.set_bg(Color::from_ansi(code - 40)),
                49 => self.grid.set_bg(Color::Default),
                90..=97 => self.grid.set_fg(Color::Bright((code - 90) as u8)),
                100..=107 => self.grid.set_bg(Color::Bright((code - 100) as u8)),

                // Extended colors (38;5;n / 38;2;r;g;b and the 48 equivalents)
                38 | 48 => {
                    let color = match iter.next() {
                        Some(5) => iter.next().map(|idx| Color::Indexed(idx as u8)),
                        Some(2) => match (iter.next(), iter.next(), iter.next()) {
                            (Some(r), Some(g), Some(b)) => Some(Color::Rgb {
                                r: r as u8,
                                g: g as u8,
                                b: b as u8,
                            }),
                            _ => None,
                        },
                        _ => None,
                    };
                    if let Some(color) = color {
                        if code == 38 {
                            self.grid.set_fg(color);
                        } else {
                            self.grid.set_bg(color);
                        }
                    }
                }

                _ => {} // Accepted, no rendering effect
            }
        }

        if !any {
            self.grid.reset_style();
        }
    }
}

impl Perform for GridPerformer {
    fn print(&mut self, c: char) {
        self.grid.put_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x08 => self.grid.backspace(),
            0x09 => self.grid.tab(),
            0x0A..=0x0C => self.grid.line_feed(),
            0x0D => self.grid.carriage_return(),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, c: char) {
        match c {
            // Cursor Position (CUP / HVP), 1-based
            'H' | 'f' => {
                let mut iter = params.iter().map(|p| p.first().copied().unwrap_or(0));
                let row = iter.next().unwrap_or(1).max(1) - 1;
                let col = iter.next().unwrap_or(1).max(1) - 1;
                self.grid.set_cursor(Position::new(row, col));
            }

            // Cursor Up / Down / Forward / Backward (CUU, CUD, CUF, CUB)
            'A' | 'B' | 'C' | 'D' => {
                let n = first_param(params, 1).max(1);
                let Position { row, col } = self.grid.cursor();
                let target = match c {
                    'A' => Position::new(row.saturating_sub(n), col),
                    'B' => Position::new(row.saturating_add(n), col),
                    'C' => Position::new(row, col.saturating_add(n)),
                    _ => Position::new(row, col.saturating_sub(n)),
                };
                self.grid.set_cursor(target);
            }

            // Erase in Display (ED)
            'J' => {
                if let Some(mode) = EraseMode::from_param(first_param(params, 0)) {
                    self.grid.erase_display(mode);
                }
            }

            // Erase in Line (EL)
            'K' => {
                if let Some(mode) = EraseMode::from_param(first_param(params, 0)) {
                    self.grid.erase_line(mode);
                }
            }

            'm' => self.process_sgr(params),

            // Set/Reset Mode
            'h' | 'l' => {
                let private = if intermediates.contains(&b'?') { "?" } else { "" };
                debug!(
                    "Set/Reset mode: {}{} {}",
                    private,
                    first_param(params, 0),
                    c
                );
            }

            _ => trace!("Skipping unsupported CSI command '{}'", c),
        }
    }
}
