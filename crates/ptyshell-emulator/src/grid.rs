//! Fixed-size character grid with cursor tracking.

use ptyshell_core::{Cell, Color, Dimensions, Position};

/// Erase mode shared by erase-in-display and erase-in-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    /// From the cursor to the end (inclusive)
    ToEnd,
    /// From the start to the cursor (inclusive)
    FromStart,
    /// Everything
    All,
}

impl EraseMode {
    /// Map a CSI parameter to an erase mode.
    ///
    /// `3` (erase scrollback) is treated as `All` since the grid has no scrollback.
    pub fn from_param(param: u16) -> Option<Self> {
        match param {
            0 => Some(Self::ToEnd),
            1 => Some(Self::FromStart),
            2 | 3 => Some(Self::All),
            _ => None,
        }
    }
}

/// Screen grid used while a session is in fullscreen mode.
///
/// Writing past the last column wraps to the next row; the cursor pins to the
/// bottom row instead of scrolling.
#[derive(Debug)]
pub struct Grid {
    /// Cell storage (row-major order)
    cells: Vec<Cell>,
    /// Grid dimensions
    dimensions: Dimensions,
    /// Cursor position
    cursor: Position,
    /// Current foreground color
    current_fg: Color,
    /// Current background color
    current_bg: Color,
    /// Current bold flag
    current_bold: bool,
}

impl Grid {
    /// Create a new grid with the given dimensions.
    ///
    /// All cells are initialized to default (empty space).
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            cells: vec![Cell::default(); dimensions.cell_count()],
            dimensions,
            cursor: Position::origin(),
            current_fg: Color::Default,
            current_bg: Color::Default,
            current_bold: false,
        }
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        if row < self.dimensions.rows && col < self.dimensions.cols {
            Some(row as usize * self.dimensions.cols as usize + col as usize)
        } else {
            None
        }
    }

    /// Get cell at position.
    ///
    /// Returns None if position is out of bounds.
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        self.index(row, col).and_then(|idx| self.cells.get(idx))
    }

    /// Get mutable cell at position.
    pub fn cell_mut(&mut self, row: u16, col: u16) -> Option<&mut Cell> {
        self.index(row, col).and_then(move |idx| self.cells.get_mut(idx))
    }

    /// Get entire row as a slice.
    pub fn row(&self, row: u16) -> Option<&[Cell]> {
        if row < self.dimensions.rows {
            let start = row as usize * self.dimensions.cols as usize;
            let end = start + self.dimensions.cols as usize;
            self.cells.get(start..end)
        } else {
            None
        }
    }

    /// Get dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Get cursor position.
    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor, clamping to grid bounds.
    pub fn set_cursor(&mut self, position: Position) {
        self.cursor = position.clamped(self.dimensions);
    }

    /// Set current foreground color.
    pub fn set_fg(&mut self, color: Color) {
        self.current_fg = color;
    }

    /// Set current background color.
    pub fn set_bg(&mut self, color: Color) {
        self.current_bg = color;
    }

    /// Set current bold flag.
    pub fn set_bold(&mut self, bold: bool) {
        self.current_bold = bold;
    }

    /// Reset colors and bold to defaults.
    pub fn reset_style(&mut self) {
        self.current_fg = Color::Default;
        self.current_bg = Color::Default;
        self.current_bold = false;
    }

    /// Write a character at the cursor and advance it.
    pub fn put_char(&mut self, c: char) {
        let Position { row, col } = self.cursor;
        let (fg, bg, bold) = (self.current_fg, self.current_bg, self.current_bold);
        if let Some(cell) = self.cell_mut(row, col) {
            *cell = Cell {
                character: c,
                fg,
                bg,
                bold,
            };
        }

        let dims = self.dimensions;
        self.cursor.col += 1;
        if self.cursor.col >= dims.cols {
            self.cursor.col = 0;
            self.cursor.row = (self.cursor.row + 1).min(dims.rows.saturating_sub(1));
        }
    }

    /// Move the cursor one row down, pinned to the bottom row.
    pub fn line_feed(&mut self) {
        self.cursor.row = (self.cursor.row + 1).min(self.dimensions.rows.saturating_sub(1));
    }

    /// Move the cursor to column 0.
    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    /// Move the cursor one column left.
    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    /// Move the cursor to the next tab stop (every 8 columns).
    pub fn tab(&mut self) {
        let next_tab = ((self.cursor.col / 8) + 1) * 8;
        self.cursor.col = next_tab.min(self.dimensions.cols.saturating_sub(1));
    }

    fn blank_range(&mut self, row: u16, cols: std::ops::Range<u16>) {
        let blank = Cell::blank(self.current_bg);
        for col in cols {
            if let Some(cell) = self.cell_mut(row, col) {
                *cell = blank;
            }
        }
    }

    /// Erase part of the screen relative to the cursor.
    ///
    /// Erasing everything also homes the cursor.
    pub fn erase_display(&mut self, mode: EraseMode) {
        let Position { row, col } = self.cursor;
        let Dimensions { rows, cols } = self.dimensions;
        match mode {
            EraseMode::ToEnd => {
                self.blank_range(row, col..cols);
                for r in (row + 1)..rows {
                    self.blank_range(r, 0..cols);
                }
            }
            EraseMode::FromStart => {
                for r in 0..row {
                    self.blank_range(r, 0..cols);
                }
                self.blank_range(row, 0..col.saturating_add(1));
            }
            EraseMode::All => {
                for r in 0..rows {
                    self.blank_range(r, 0..cols);
                }
                self.cursor = Position::origin();
            }
        }
    }

    /// Erase part of the cursor row.
    pub fn erase_line(&mut self, mode: EraseMode) {
        let Position { row, col } = self.cursor;
        let cols = self.dimensions.cols;
        match mode {
            EraseMode::ToEnd => self.blank_range(row, col..cols),
            EraseMode::FromStart => self.blank_range(row, 0..col.saturating_add(1)),
            EraseMode::All => self.blank_range(row, 0..cols),
        }
    }

    /// Render the grid as text, one line per row.
    pub fn render(&self) -> String {
        let cols = self.dimensions.cols.max(1) as usize;
        self.cells
            .chunks(cols)
            .map(|row| row.iter().map(|cell| cell.character).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Resize the grid. Content is cleared and the cursor is homed.
    pub fn resize(&mut self, new_dimensions: Dimensions) {
        self.cells = vec![Cell::default(); new_dimensions.cell_count()];
        self.dimensions = new_dimensions;
        self.cursor = Position::origin();
    }

    /// Clear every cell, home the cursor and reset the style.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
        self.cursor = Position::origin();
        self.reset_style();
    }
}
