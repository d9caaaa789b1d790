//! ANSI escape stripping.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    /// CSI, OSC (BEL or ST terminated), charset designation, and two-byte
    /// ESC commands such as keypad modes and save/restore cursor.
    static ref ESCAPE_SEQUENCE: Regex = Regex::new(concat!(
        r"\x1B\[[0-?]*[ -/]*[@-~]",
        r"|\x1B\][^\x07\x1B]*(?:\x07|\x1B\\)",
        r"|\x1B[()*+][0-9A-Za-z]",
        r"|\x1B[=>78cDEHMNOZ]",
    ))
    .expect("invalid regex");
}

/// Remove terminal escape sequences from `text`.
///
/// Incomplete sequences are left in place. Returns the input unchanged
/// (borrowed) when it contains no escapes.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    ESCAPE_SEQUENCE.replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text_borrows() {
        assert!(matches!(strip_ansi("hello"), Cow::Borrowed("hello")));
    }

    #[test]
    fn test_strip_colors() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m text"), "red text");
        assert_eq!(strip_ansi("\x1b[1;32muser@host\x1b[m:~$ "), "user@host:~$ ");
    }

    #[test]
    fn test_strip_private_modes() {
        assert_eq!(strip_ansi("\x1b[?2004hroot@box:/# "), "root@box:/# ");
    }

    #[test]
    fn test_strip_window_title() {
        assert_eq!(
            strip_ansi("\x1b]0;user@host: ~\x07user@host:~$ "),
            "user@host:~$ "
        );
        assert_eq!(strip_ansi("\x1b]2;title\x1b\\done"), "done");
    }

    #[test]
    fn test_strip_charset_and_keypad() {
        assert_eq!(strip_ansi("\x1b(Bplain\x1b="), "plain");
        assert_eq!(strip_ansi("\x1b7saved\x1b8"), "saved");
    }

    #[test]
    fn test_strip_keeps_incomplete_sequence() {
        assert_eq!(strip_ansi("abc\x1b["), "abc\x1b[");
        assert_eq!(strip_ansi("abc\x1b]0;title"), "abc\x1b]0;title");
    }
}
