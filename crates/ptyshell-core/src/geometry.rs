//! Geometry types for screen coordinates.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Position in the screen grid (row, column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row index (0-based)
    pub row: u16,
    /// Column index (0-based)
    pub col: u16,
}

impl Position {
    /// Create a new position.
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Origin position (0, 0).
    pub fn origin() -> Self {
        Self { row: 0, col: 0 }
    }

    /// Clamp the position so it lies inside `dims`.
    pub fn clamped(self, dims: Dimensions) -> Self {
        Self {
            row: self.row.min(dims.rows.saturating_sub(1)),
            col: self.col.min(dims.cols.saturating_sub(1)),
        }
    }
}

/// Dimensions of a terminal screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Create dimensions, rejecting a zero-sized screen.
    pub fn checked(rows: u16, cols: u16) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    /// Total cell count (rows * cols).
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_creation() {
        let pos = Position::new(5, 10);
        assert_eq!(pos.row, 5);
        assert_eq!(pos.col, 10);
    }

    #[test]
    fn test_position_clamped() {
        let dims = Dimensions::new(24, 80);
        assert_eq!(Position::new(100, 200).clamped(dims), Position::new(23, 79));
        assert_eq!(Position::new(3, 4).clamped(dims), Position::new(3, 4));
    }

    #[test]
    fn test_dimensions_default() {
        let dims = Dimensions::default();
        assert_eq!(dims.rows, 24);
        assert_eq!(dims.cols, 80);
        assert_eq!(dims.cell_count(), 1920);
    }

    #[test]
    fn test_dimensions_checked() {
        assert!(Dimensions::checked(24, 80).is_ok());
        assert!(matches!(
            Dimensions::checked(0, 80),
            Err(Error::InvalidDimensions { rows: 0, cols: 80 })
        ));
    }
}
