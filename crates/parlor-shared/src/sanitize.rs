//! Message-text sanitization and username validation.
//!
//! Every username crossing a trust boundary (session, path parameter,
//! payload field, stored record) goes through [`validate_username`], and
//! every message body goes through [`sanitize_text`] exactly once before it
//! enters persisted state.

use crate::constants::{MAX_MESSAGE_CHARS, MAX_USERNAME_CHARS};

/// Sanitize a raw message body for storage.
///
/// Pipeline: strip control characters (newline, carriage return and tab
/// survive), truncate to [`MAX_MESSAGE_CHARS`], HTML-escape markup
/// characters, re-encode `\n` as `<br>` and `\t` as four spaces, trim.
///
/// NOT idempotent: running it twice double-escapes entities, so callers
/// sanitize at ingress and never again at persistence time.
pub fn sanitize_text(raw: &str) -> String {
    let mut text: String = raw
        .chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .take(MAX_MESSAGE_CHARS)
        .collect();

    text = escape_html(&text);
    text = text.replace('\n', "<br>");
    text = text.replace('\t', "    ");

    text.trim().to_string()
}

/// Escape the five markup-significant characters so embedded script-like
/// content becomes inert literal text.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Returns `true` iff `s` is 1–50 characters of `[A-Za-z0-9_-]`.
pub fn validate_username(s: &str) -> bool {
    if s.is_empty() || s.chars().count() > MAX_USERNAME_CHARS {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_escapes_markup() {
        let out = sanitize_text("<script>alert('xss')</script>");
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
        assert_eq!(
            out,
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_sanitize_newlines_become_breaks() {
        assert_eq!(sanitize_text("hello\nworld"), "hello<br>world");
    }

    #[test]
    fn test_sanitize_tabs_become_spaces() {
        assert_eq!(sanitize_text("a\tb"), "a    b");
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_text("a\x00b\x07c\x7fd"), "abcd");
    }

    #[test]
    fn test_sanitize_truncates_long_input() {
        let input = "x".repeat(MAX_MESSAGE_CHARS + 100);
        assert_eq!(sanitize_text(&input).chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize_text("  hi  "), "hi");
    }

    #[test]
    fn test_sanitize_preserves_non_ascii() {
        assert_eq!(sanitize_text("héllo wörld"), "héllo wörld");
    }

    #[test]
    fn test_sanitize_is_not_idempotent() {
        let once = sanitize_text("a & b");
        let twice = sanitize_text(&once);
        assert_eq!(once, "a &amp; b");
        assert_eq!(twice, "a &amp;amp; b");
    }

    #[test]
    fn test_validate_username_accepts_word_characters() {
        assert!(validate_username("alice"));
        assert!(validate_username("bob_42"));
        assert!(validate_username("kim-lee"));
    }

    #[test]
    fn test_validate_username_rejects_bad_input() {
        assert!(!validate_username(""));
        assert!(!validate_username("has space"));
        assert!(!validate_username("semi;colon"));
        assert!(!validate_username("../etc/passwd"));
        assert!(!validate_username(&"a".repeat(51)));
    }
}
