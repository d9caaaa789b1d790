//! Property-based tests for the screen parser.
//!
//! Uses proptest to feed arbitrary input and verify grid invariants.

use proptest::prelude::*;

use ptyshell_core::Dimensions;
use ptyshell_emulator::ScreenParser;

/// Generate a random grid size within reasonable bounds.
fn grid_dimensions() -> impl Strategy<Value = (u16, u16)> {
    (1u16..40, 1u16..120)
}

/// Escape-heavy text: fragments of CSI sequences mixed with printable text.
fn escape_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z ]{0,8}",
            Just("\x1b[".to_string()),
            "[0-9;?]{0,6}",
            "[A-Za-z@]",
            Just("\r\n".to_string()),
            Just("\x1b[?1049h".to_string()),
            Just("\x1b[2J".to_string()),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn assert_shape(screen: &str, rows: u16, cols: u16) {
    let lines: Vec<&str> = screen.split('\n').collect();
    assert_eq!(lines.len(), rows as usize);
    for line in lines {
        assert_eq!(line.chars().count(), cols as usize);
    }
}

proptest! {
    /// Arbitrary bytes never panic and always render a full grid.
    #[test]
    fn parser_never_panics_on_bytes(
        (rows, cols) in grid_dimensions(),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut parser = ScreenParser::new(Dimensions::new(rows, cols));
        parser.process(&bytes);
        assert_shape(&parser.render(), rows, cols);
        let cursor = parser.grid().cursor();
        prop_assert!(cursor.row < rows);
        prop_assert!(cursor.col < cols);
    }

    /// Escape sequences never leak control bytes into the grid.
    #[test]
    fn no_control_bytes_leak(
        (rows, cols) in grid_dimensions(),
        text in escape_soup(),
    ) {
        let mut parser = ScreenParser::new(Dimensions::new(rows, cols));
        let screen = parser.parse(&text);
        assert_shape(&screen, rows, cols);
        prop_assert!(!screen.contains('\x1b'));
        prop_assert!(!screen.contains('\r'));
    }

    /// Splitting input at any point renders the same screen.
    #[test]
    fn split_point_independent(text in escape_soup(), split in 0usize..400) {
        let dims = Dimensions::new(6, 20);
        let bytes = text.as_bytes();
        let split = split.min(bytes.len());

        let mut whole = ScreenParser::new(dims);
        whole.process(bytes);

        let mut parts = ScreenParser::new(dims);
        parts.process(&bytes[..split]);
        parts.process(&bytes[split..]);

        prop_assert_eq!(whole.render(), parts.render());
    }

    /// Resizing to any dimension keeps the grid consistent.
    #[test]
    fn resize_never_panics(
        (rows, cols) in grid_dimensions(),
        (new_rows, new_cols) in grid_dimensions(),
        text in "[a-z\n]{0,200}",
    ) {
        let mut parser = ScreenParser::new(Dimensions::new(rows, cols));
        parser.parse(&text);
        parser.resize(Dimensions::new(new_rows, new_cols));
        let screen = parser.parse(&text);
        assert_shape(&screen, new_rows, new_cols);
    }
}
