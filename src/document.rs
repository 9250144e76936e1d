//! # ABC Documents
//!
//! Lightweight handling of whole ABC tunes without a full notation parser.
//!
//! ## Structure
//! ```text
//! X:1              ┐
//! T:The Kesh       │ headers (up to and including the first K: line)
//! M:6/8            │
//! K:G              ┘
//! |:GAG GAB|ABA ABd|...   body (everything after)
//! ```
//!
//! The first line starting with `K:` is the boundary. [`AbcDocument::parse`] treats a
//! missing `K:` line as an error; the lenient helpers ([`music_body`]) fall back to the
//! whole text instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::CeolError;

static ONLY_REPEAT_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s:12]*$").expect("marker pattern is a valid regex"));

const REQUIRED_HEADERS: &[&str] = &["X:", "T:", "M:", "L:", "K:"];

/// Index of the first line that starts with `K:`
pub(crate) fn key_line_index(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| line.starts_with("K:"))
}

/// A tune split into header block and music body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbcDocument {
    /// Header lines up to and including the `K:` line, joined with `\n`
    pub headers: String,
    /// Everything after the `K:` line, joined with `\n`
    pub body: String,
}

impl AbcDocument {
    /// Split at the first `K:` line.
    ///
    /// # Errors
    /// [`CeolError::MissingKeyHeader`] when no line starts with `K:`.
    pub fn parse(text: &str) -> Result<Self, CeolError> {
        let lines: Vec<&str> = text.split('\n').collect();
        let key_idx = key_line_index(&lines).ok_or(CeolError::MissingKeyHeader)?;

        Ok(Self {
            headers: lines[..=key_idx].join("\n"),
            body: lines[key_idx + 1..].join("\n"),
        })
    }

    /// The key label written in the `K:` header, trimmed.
    pub fn key(&self) -> &str {
        self.headers
            .rsplit('\n')
            .next()
            .and_then(|line| line.strip_prefix("K:"))
            .map_or("", str::trim)
    }

    /// Join headers and body back into one text.
    pub fn rebuild(&self) -> String {
        format!("{}\n{}", self.headers, self.body)
    }
}

/// The music body after the `K:` line, or the whole text when there is none.
pub fn music_body(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    match key_line_index(&lines) {
        Some(idx) => lines[idx + 1..].join("\n"),
        None => text.to_string(),
    }
}

/// First `count` bars of a body, skipping segments that only hold repeat or
/// ending markers.
pub fn get_bars(body: &str, count: usize) -> Vec<String> {
    body.split('|')
        .filter(|bar| !ONLY_REPEAT_MARKERS.is_match(bar))
        .map(|bar| bar.trim().to_string())
        .filter(|bar| !bar.is_empty())
        .take(count)
        .collect()
}

/// A bar containing a searched-for lick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LickOccurrence {
    pub bar_index: usize,
    pub bar: String,
}

fn strip_spacing(s: &str) -> String {
    s.chars().filter(|c| *c != ' ' && *c != '\n').collect()
}

/// Every bar (indexed by raw `|` segment) that contains `lick`, ignoring spaces and
/// line breaks on both sides.
pub fn find_lick_occurrences(body: &str, lick: &str) -> Vec<LickOccurrence> {
    let clean_lick = strip_spacing(lick);
    body.split('|')
        .enumerate()
        .filter(|(_, bar)| strip_spacing(bar).contains(&clean_lick))
        .map(|(bar_index, bar)| LickOccurrence {
            bar_index,
            bar: bar.trim().to_string(),
        })
        .collect()
}

/// Basic sanity check: all of X:, T:, M:, L: and K: appear somewhere in the text.
pub fn has_required_headers(abc: &str) -> bool {
    REQUIRED_HEADERS.iter().all(|header| abc.contains(header))
}

/// Remove a Markdown code fence wrapped around ABC text.
///
/// The opening fence line (with or without a language tag) is dropped, and so is the
/// last line when it is a closing fence. Text that doesn't start with a fence is only
/// trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|line| line.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNE: &str = "X:1\nT:The Kesh\nM:6/8\nL:1/8\nK:G\n|:GAG GAB|ABA ABd:|\n|:edd gdd|edB dBA:|";

    #[test]
    fn test_parse_splits_at_key_line() {
        let doc = AbcDocument::parse(TUNE).unwrap();
        assert_eq!(doc.headers, "X:1\nT:The Kesh\nM:6/8\nL:1/8\nK:G");
        assert_eq!(doc.body, "|:GAG GAB|ABA ABd:|\n|:edd gdd|edB dBA:|");
        assert_eq!(doc.key(), "G");
        assert_eq!(doc.rebuild(), TUNE);
    }

    #[test]
    fn test_parse_without_key_is_error() {
        let result = AbcDocument::parse("X:1\nT:No key\nABC|DEF");
        assert!(matches!(result, Err(CeolError::MissingKeyHeader)));
    }

    #[test]
    fn test_first_key_line_wins() {
        let doc = AbcDocument::parse("X:1\nK:D\nABC|\nK:G\ndef|").unwrap();
        assert_eq!(doc.key(), "D");
        assert_eq!(doc.body, "ABC|\nK:G\ndef|");
    }

    #[test]
    fn test_music_body_lenient() {
        assert_eq!(music_body(TUNE), "|:GAG GAB|ABA ABd:|\n|:edd gdd|edB dBA:|");
        assert_eq!(music_body("ABC|DEF"), "ABC|DEF");
    }

    #[test]
    fn test_get_bars_skips_markers() {
        let bars = get_bars("|:GAG GAB|ABA ABd:|1 dBA:|2 dBG|", 10);
        // Segments are kept verbatim apart from trimming
        assert_eq!(bars, vec![":GAG GAB", "ABA ABd:", "1 dBA:", "2 dBG"]);
        assert_eq!(get_bars("|:GAG GAB|ABA ABd:|", 1), vec![":GAG GAB"]);
        assert!(get_bars("|: :|", 5).is_empty());
    }

    #[test]
    fn test_find_lick_occurrences() {
        let body = "eAA Bcd|efe dBA|eA ABcd|gfg";
        let found = find_lick_occurrences(body, "eAABcd");
        assert_eq!(
            found,
            vec![
                LickOccurrence { bar_index: 0, bar: "eAA Bcd".to_string() },
                LickOccurrence { bar_index: 2, bar: "eA ABcd".to_string() },
            ]
        );
    }

    #[test]
    fn test_required_headers() {
        assert!(has_required_headers(TUNE));
        assert!(!has_required_headers("X:1\nT:t\nK:G\nABC"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```abc\nX:1\nK:G\nGAB\n```"), "X:1\nK:G\nGAB");
        assert_eq!(strip_code_fence("```\nX:1\nK:G"), "X:1\nK:G");
        assert_eq!(strip_code_fence("  X:1\nK:G\n"), "X:1\nK:G");
    }
}
