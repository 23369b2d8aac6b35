//! Small text helpers shared by the extractor, the sinks and logging.

use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}\u{2009}\u{202f}]+").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Length in characters, which is what the record invariants are stated in.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and the number
/// of dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = char_len(s);
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Collapse runs of spaces and tabs inside each line, trim every line, and
/// squeeze three or more consecutive newlines down to two.
pub fn normalize_whitespace(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = unified
        .lines()
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES.replace_all(&joined, "\n\n").trim().to_string()
}
