// ABOUTME: Text helpers for line handling, previews and file extensions
// ABOUTME: Keeps encoding rules in one place for reads and writes

use std::path::Path;

/// Splits text into lines on `\n`, `\r\n` or a lone `\r`.
/// A trailing terminator does not produce an empty final line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Terminates every line, including the last, with `eol`.
pub fn terminate_lines(lines: &[String], eol: &str) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push_str(eol);
    }
    out
}

pub fn has_txt_extension(name: &str) -> bool {
    Path::new(name).extension().and_then(|e| e.to_str()) == Some("txt")
}

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

/// HTTP header values must be ASCII, so non-ASCII characters in JSON
/// arguments are written as `\uXXXX` escapes (surrogate pairs above the BMP).
pub fn ascii_json(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_mixed_terminators() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_split_lines_trailing_terminator() {
        assert_eq!(split_lines("x\n"), vec!["x"]);
        assert_eq!(split_lines("x\r\n\r\n"), vec!["x", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_terminate_lines() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(terminate_lines(&lines, "\n"), "a\nb\n");
        assert_eq!(terminate_lines(&lines, "\r\n"), "a\r\nb\r\n");
        assert_eq!(terminate_lines(&[], "\n"), "");
    }

    #[test]
    fn test_split_terminate_keeps_blank_lines() {
        let lines = vec!["".to_string(), "a".to_string(), "".to_string()];
        assert_eq!(split_lines(&terminate_lines(&lines, "\r\n")), lines);
    }

    #[test]
    fn test_has_txt_extension_is_case_sensitive() {
        assert!(has_txt_extension("todo.txt"));
        assert!(!has_txt_extension("TODO.TXT"));
        assert!(!has_txt_extension("notes.md"));
        assert!(!has_txt_extension("txt"));
    }

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(truncate_str("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        let result = truncate_str("hello world", 7);
        assert!(result.starts_with("hello"));
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_str_utf8() {
        // Multi-byte characters must not split mid-codepoint
        let text = "Hello 世界 World";
        let result = truncate_str(text, 10);
        assert!(!result.is_empty());
        assert!(result.len() <= 13);
    }

    #[test]
    fn test_ascii_json_escapes_non_ascii() {
        let arg = serde_json::json!({ "path": "/ä.txt" });
        assert_eq!(ascii_json(&arg), r#"{"path":"/\u00e4.txt"}"#);

        let emoji = serde_json::json!("🎉");
        assert_eq!(ascii_json(&emoji), r#""\ud83c\udf89""#);
    }
}
