//! # Repetition Detection
//!
//! Finds measures and multi-bar phrases that recur in a tune. Irish dance tunes repeat
//! heavily, and the repeated licks are where variations are worth trying.
//!
//! ## Two Views of the Same Bars
//! - [`extract_measures_with_durations`] - literal measure text (markers and spaces
//!   removed) used for display and for rebuilding a tune
//! - [`extract_measures`] - the same measures normalized with [`normalize_measure`]
//!   (octave markers dropped, lowercased) used as matching keys
//!
//! Both come from one segmentation, so index `i` refers to the same bar in each.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::document::music_body;

/// Default minimum number of occurrences for something to count as repeated
pub const DEFAULT_MIN_OCCURRENCES: usize = 2;

const MAX_TARGET_LICKS: usize = 3;

/// Repeat signs and first/second-ending numbers at the start of a segment
static LEADING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[:\]]*(?:\[?\d+)?").expect("leading marker pattern is valid"));

/// Repeat signs (and an opening `[` of `|[`) at the end of a segment
static TRAILING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[:\[]*$").expect("trailing marker pattern is valid"));

/// Measures of the music body with repeat and ending markers stripped and all
/// whitespace removed. Empty segments are dropped.
pub fn extract_measures_with_durations(abc: &str) -> Vec<String> {
    music_body(abc)
        .split('|')
        .filter_map(|segment| {
            let segment = segment.trim();
            let segment = LEADING_MARKERS.replace(segment, "");
            let segment = TRAILING_MARKERS.replace(&segment, "");
            let measure: String = segment.chars().filter(|c| !c.is_whitespace()).collect();
            (!measure.is_empty()).then_some(measure)
        })
        .collect()
}

/// Measures normalized for matching, aligned with [`extract_measures_with_durations`].
pub fn extract_measures(abc: &str) -> Vec<String> {
    extract_measures_with_durations(abc)
        .iter()
        .map(|m| normalize_measure(m))
        .collect()
}

/// Drop octave markers and lowercase, so `D,EF` and `def` compare equal.
pub fn normalize_measure(measure: &str) -> String {
    measure
        .chars()
        .filter(|c| *c != ',' && *c != '\'')
        .collect::<String>()
        .to_lowercase()
}

/// Normalized measure → 0-based bar indices, for measures occurring at least
/// `min_occurrences` times.
///
/// # Example
/// ```rust
/// use ceol::repetition::find_repeated_measures;
///
/// let repeated = find_repeated_measures("ABC|DEF|ABC|GAB", 2);
/// assert_eq!(repeated["abc"], vec![0, 2]);
/// assert_eq!(repeated.len(), 1);
/// ```
pub fn find_repeated_measures(abc: &str, min_occurrences: usize) -> BTreeMap<String, Vec<usize>> {
    let mut positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, measure) in extract_measures(abc).into_iter().enumerate() {
        positions.entry(measure).or_default().push(i);
    }
    positions.retain(|_, indices| indices.len() >= min_occurrences);
    positions
}

/// A run of consecutive measures that recurs in the tune
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatedPhrase {
    /// Normalized measures joined with `|`
    pub phrase: String,
    /// Number of measures in the phrase
    pub length: usize,
    /// 0-based index of the first measure of every occurrence
    pub occurrences: Vec<usize>,
    /// Literal text of the first occurrence, joined with `|`
    pub original_text: String,
}

/// Phrases of `phrase_length` measures that occur at least `min_occurrences` times,
/// most repeated first. Equal counts keep first-seen order.
pub fn find_repeated_phrases(
    abc: &str,
    phrase_length: usize,
    min_occurrences: usize,
) -> Vec<RepeatedPhrase> {
    if phrase_length == 0 {
        return Vec::new();
    }

    let literal = extract_measures_with_durations(abc);
    let normalized: Vec<String> = literal.iter().map(|m| normalize_measure(m)).collect();

    let mut order: Vec<&[String]> = Vec::new();
    let mut starts: HashMap<&[String], Vec<usize>> = HashMap::new();
    for (i, window) in normalized.windows(phrase_length).enumerate() {
        starts
            .entry(window)
            .or_insert_with(|| {
                order.push(window);
                Vec::new()
            })
            .push(i);
    }

    let mut phrases: Vec<RepeatedPhrase> = order
        .into_iter()
        .filter_map(|window| {
            let occurrences = starts.remove(window)?;
            if occurrences.len() < min_occurrences {
                return None;
            }
            let first = occurrences[0];
            Some(RepeatedPhrase {
                phrase: window.join("|"),
                length: phrase_length,
                original_text: literal[first..first + phrase_length].join("|"),
                occurrences,
            })
        })
        .collect();

    phrases.sort_by(|a, b| b.occurrences.len().cmp(&a.occurrences.len()));
    phrases
}

/// Measure, 2-bar and 4-bar repetition found in one tune
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionReport {
    pub repeated_measures: BTreeMap<String, Vec<usize>>,
    pub repeated_phrases_2bar: Vec<RepeatedPhrase>,
    pub repeated_phrases_4bar: Vec<RepeatedPhrase>,
    pub summary: String,
    pub has_repetition: bool,
}

/// Run measure, 2-bar and 4-bar detection and summarize.
pub fn detect_repetition(abc: &str) -> RepetitionReport {
    let repeated_measures = find_repeated_measures(abc, DEFAULT_MIN_OCCURRENCES);
    let repeated_phrases_2bar = find_repeated_phrases(abc, 2, DEFAULT_MIN_OCCURRENCES);
    let repeated_phrases_4bar = find_repeated_phrases(abc, 4, DEFAULT_MIN_OCCURRENCES);

    let mut parts = Vec::new();
    if !repeated_measures.is_empty() {
        parts.push(format!("Found {} repeated measures", repeated_measures.len()));
    }
    if let Some(top) = repeated_phrases_2bar.first() {
        let bars: Vec<String> = top.occurrences.iter().map(|i| (i + 1).to_string()).collect();
        parts.push(format!(
            "Most repeated 2-bar phrase appears {} times (bars {})",
            top.occurrences.len(),
            bars.join(", ")
        ));
    }
    if !repeated_phrases_4bar.is_empty() {
        parts.push(format!(
            "Found {} repeated 4-bar phrases",
            repeated_phrases_4bar.len()
        ));
    }

    let has_repetition = !parts.is_empty();
    let summary = if has_repetition {
        parts.join(". ")
    } else {
        "No clear repetition detected".to_string()
    };

    log::debug!("repetition: {}", summary);

    RepetitionReport {
        repeated_measures,
        repeated_phrases_2bar,
        repeated_phrases_4bar,
        summary,
        has_repetition,
    }
}

/// Literal licks worth varying: the top three repeated 2-bar phrases, or failing
/// that up to three repeated single measures in order of first appearance.
pub fn target_licks(abc: &str) -> Vec<String> {
    let report = detect_repetition(abc);

    if !report.repeated_phrases_2bar.is_empty() {
        return report
            .repeated_phrases_2bar
            .iter()
            .take(MAX_TARGET_LICKS)
            .map(|phrase| phrase.original_text.clone())
            .collect();
    }

    let literal = extract_measures_with_durations(abc);
    let mut first_seen: Vec<usize> = report
        .repeated_measures
        .values()
        .map(|indices| indices[0])
        .collect();
    first_seen.sort_unstable();
    first_seen
        .into_iter()
        .take(MAX_TARGET_LICKS)
        .map(|i| literal[i].clone())
        .collect()
}
