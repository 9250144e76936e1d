use super::types::PhraseNote;

/// Unit notes per beat in 6/8 (three eighths)
const BEAT_UNITS: u32 = 3;

/// Parse a short phrase into `(pitch, duration)` notes.
///
/// Spaces, ties (`-`) and bar lines are skipped. A pitch is an optional run of
/// accidentals, one character and any octave markers; a following integer is its
/// duration in unit notes (default 1).
///
/// ```rust
/// use ceol::variation::{parse_phrase, PhraseNote};
///
/// assert_eq!(
///     parse_phrase("D2A ^c'"),
///     vec![PhraseNote::new("D", 2), PhraseNote::new("A", 1), PhraseNote::new("^c'", 1)]
/// );
/// ```
pub fn parse_phrase(text: &str) -> Vec<PhraseNote> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '|')
        .collect();

    let mut notes = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let mut pitch = String::new();
        while i < chars.len() && matches!(chars[i], '^' | '_' | '=') {
            pitch.push(chars[i]);
            i += 1;
        }
        let Some(&letter) = chars.get(i) else {
            break;
        };
        pitch.push(letter);
        i += 1;

        while i < chars.len() && matches!(chars[i], '\'' | ',') {
            pitch.push(chars[i]);
            i += 1;
        }

        let digits_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let duration = chars[digits_start..i]
            .iter()
            .collect::<String>()
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .unwrap_or(1);

        notes.push(PhraseNote { pitch, duration });
    }
    notes
}

/// Render notes back to ABC, beamed in groups of three unit notes.
pub fn render_phrase(notes: &[PhraseNote]) -> String {
    let mut out = String::new();
    let mut total = 0;
    for (i, note) in notes.iter().enumerate() {
        out.push_str(&note.pitch);
        if note.duration != 1 {
            out.push_str(&note.duration.to_string());
        }
        total += note.duration;
        if total % BEAT_UNITS == 0 && i + 1 < notes.len() {
            out.push(' ');
        }
    }
    out
}

/// Positional differences between two note lists plus their length difference.
pub(crate) fn note_changes(original: &[PhraseNote], variation: &[PhraseNote]) -> usize {
    let mismatched = original
        .iter()
        .zip(variation)
        .filter(|(a, b)| a != b)
        .count();
    mismatched + original.len().abs_diff(variation.len())
}

/// How many notes differ between two phrases, compared position by position.
pub fn count_changes(original: &str, variation: &str) -> usize {
    note_changes(&parse_phrase(original), &parse_phrase(variation))
}

/// Total length of a note list in unit notes.
pub fn phrase_length(notes: &[PhraseNote]) -> u32 {
    notes.iter().map(|n| n.duration).sum()
}
