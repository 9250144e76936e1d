//! # Transposition
//!
//! Rewrites the note tokens of an ABC body by a semitone interval while leaving every
//! other character (bar lines, spaces, chord symbols, decorations) untouched.
//!
//! ## Spelling Policies
//! Two policies are in use and they are intentionally different:
//! - [`transpose`] spells every note from the destination key: sharps when the label
//!   contains `#` or names a sharp-side major key, flats otherwise.
//! - [`shift_octave`] keeps each note's own bias: sharp or unmarked notes are spelled
//!   with sharps, flat or natural-marked notes with flats.
//!
//! ## Octave Register
//! Pitch is moved by the exact interval implied by the two key labels. `G` → `D` is
//! -5 semitones, not +7, so tunes keep roughly the same register.

use crate::document::key_line_index;
use crate::error::CeolError;
use crate::key::{interval_between, prefers_sharps};
use crate::note::{encode, NoteToken, NOTE_PATTERN};

/// Largest octave shift accepted from user input, either direction
pub const MAX_OCTAVE_SHIFT: i32 = 10;

/// Average pitch reported for a body with no decodable notes (treated as middle register).
pub const DEFAULT_AVERAGE_PITCH: f64 = 60.0;

/// Scan `body` for note tokens and let `rewrite` replace each one.
///
/// `rewrite` receives the token and its absolute semitone and returns the new note text
/// (without duration) or `None` to keep the original text. Durations are re-attached
/// verbatim. Tokens that fail to decode are passed through unchanged.
pub(crate) fn rewrite_notes<F>(body: &str, mut rewrite: F) -> String
where
    F: FnMut(&NoteToken, i32) -> Option<String>,
{
    NOTE_PATTERN
        .replace_all(body, |caps: &regex::Captures<'_>| {
            let original = caps.get(0).map_or("", |m| m.as_str());
            let token = NoteToken::from_captures(caps);
            let Ok(semitone) = token.semitone() else {
                return original.to_string();
            };
            match rewrite(&token, semitone) {
                Some(note) => note + &token.duration,
                None => original.to_string(),
            }
        })
        .into_owned()
}

/// Move every note in `body` by `interval` semitones, spelling with one global policy.
pub fn transpose_by(body: &str, interval: i32, prefer_sharps: bool) -> String {
    rewrite_notes(body, |_, semitone| Some(encode(semitone + interval, prefer_sharps)))
}

/// Transpose a music body (no headers) from one key label to another.
///
/// # Example
/// ```rust
/// use ceol::transpose::transpose;
///
/// // G -> D is down a fourth; F# is spelled with a sharp in D
/// assert_eq!(transpose("GAB|c2", "G", "D"), "DE^F|G2");
/// ```
pub fn transpose(body: &str, from_key: &str, to_key: &str) -> String {
    let interval = interval_between(from_key, to_key);
    let prefer_sharps = prefers_sharps(to_key);
    log::debug!(
        "transposing {} -> {} by {} semitones (sharps: {})",
        from_key,
        to_key,
        interval,
        prefer_sharps
    );
    transpose_by(body, interval, prefer_sharps)
}

/// Transpose a full tune to `to_key`, rewriting its `K:` header.
///
/// The source key is read from the first `K:` line. Without one there is nothing to
/// transpose from and the text is returned unchanged.
///
/// # Example
/// ```rust
/// use ceol::transpose::transpose_document;
///
/// let tune = "X:1\nT:Tune\nK:G\nGAB|";
/// assert_eq!(transpose_document(tune, "A"), "X:1\nT:Tune\nK: A\nAB^c|");
///
/// let no_key = "T:Tune\nno key header\nABC";
/// assert_eq!(transpose_document(no_key, "D"), no_key);
/// ```
pub fn transpose_document(full: &str, to_key: &str) -> String {
    let lines: Vec<&str> = full.split('\n').collect();
    let Some(key_idx) = key_line_index(&lines) else {
        log::debug!("no K: header, transposition not applicable");
        return full.to_string();
    };

    let from_key = lines[key_idx][2..].trim();
    let key_line = format!("K: {}", to_key);

    let mut headers: Vec<&str> = lines[..key_idx].to_vec();
    headers.push(&key_line);

    let body = lines[key_idx + 1..].join("\n");
    let transposed = transpose(&body, from_key, to_key);

    format!("{}\n{}", headers.join("\n"), transposed)
}

/// Shift every note by whole octaves (positive = up).
///
/// Each note keeps its own spelling bias instead of following a key. A shift too large
/// to represent leaves the body (or the affected note) unchanged.
pub fn shift_octave(body: &str, octaves: i32) -> String {
    if octaves == 0 {
        return body.to_string();
    }
    let Some(interval) = octaves.checked_mul(12) else {
        log::warn!("octave shift {} out of range, leaving notes unchanged", octaves);
        return body.to_string();
    };
    rewrite_notes(body, |token, semitone| {
        semitone
            .checked_add(interval)
            .map(|shifted| encode(shifted, token.leans_sharp()))
    })
}

/// Parse an octave count given on the command line.
///
/// # Errors
/// [`CeolError::InvalidArgument`] when the text is not an integer or lies outside
/// ±[`MAX_OCTAVE_SHIFT`].
pub fn parse_octave_shift(text: &str) -> Result<i32, CeolError> {
    let octaves: i32 = text.trim().parse().map_err(|_| {
        CeolError::InvalidArgument(format!("octaves must be an integer, got '{}'", text))
    })?;
    if octaves.abs() > MAX_OCTAVE_SHIFT {
        return Err(CeolError::InvalidArgument(format!(
            "octaves must be between -{max} and {max}, got {}",
            octaves,
            max = MAX_OCTAVE_SHIFT
        )));
    }
    Ok(octaves)
}

/// Mean absolute semitone over all decodable notes.
///
/// Returns [`DEFAULT_AVERAGE_PITCH`] when the body has no notes.
pub fn average_pitch(body: &str) -> f64 {
    let semitones: Vec<i32> = NOTE_PATTERN
        .captures_iter(body)
        .filter_map(|caps| NoteToken::from_captures(&caps).semitone().ok())
        .collect();

    if semitones.is_empty() {
        return DEFAULT_AVERAGE_PITCH;
    }
    semitones.iter().map(|&s| s as f64).sum::<f64>() / semitones.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::note_tokens;

    fn pitches(body: &str) -> Vec<i32> {
        note_tokens(body)
            .iter()
            .map(|t| t.semitone().unwrap())
            .collect()
    }

    const REEL: &str = "|:d2fd Adfd|^cdec dcBA|G,B,DG _B,2AG|FA=df e2dc:|";

    #[test]
    fn test_transpose_down_a_fourth() {
        assert_eq!(transpose("GAB|c2", "G", "D"), "DE^F|G2");
    }

    #[test]
    fn test_transpose_flat_destination() {
        // D -> Bb is +8, spelled with flats
        assert_eq!(transpose("D A", "D", "Bb"), "_B f");
    }

    #[test]
    fn test_non_note_text_passes_through() {
        let body = "|: \"Am\"A2 B :|] !trill! z2";
        let out = transpose(body, "C", "C");
        assert!(out.starts_with("|: \""));
        assert!(out.contains(":|]"));
        assert!(out.contains("!trill!"));
        assert!(out.ends_with(" z2"));
    }

    #[test]
    fn test_same_key_keeps_pitches() {
        for key in ["G", "D", "Bb", "F#min", "Ador"] {
            let out = transpose(REEL, key, key);
            assert_eq!(pitches(&out), pitches(REEL), "key {}", key);
        }
    }

    #[test]
    fn test_transposition_additivity() {
        for (i1, i2) in [(2, 5), (-5, 7), (12, -3), (-7, -7)] {
            let stepwise = transpose_by(&transpose_by(REEL, i1, true), i2, false);
            let direct = transpose_by(REEL, i1 + i2, true);
            assert_eq!(pitches(&stepwise), pitches(&direct));
        }
    }

    #[test]
    fn test_transpose_document_rewrites_key() {
        let tune = "X:1\nT:The Kesh\nM:6/8\nK:G\n|:GAG GAB|\n|dBG:|";
        let out = transpose_document(tune, "D");
        assert_eq!(out, "X:1\nT:The Kesh\nM:6/8\nK: D\n|:DED DE^F|\n|A^FD:|");
    }

    #[test]
    fn test_transpose_document_headers_untouched() {
        // Header letters must not be treated as notes
        let tune = "X:1\nT:Banish Misfortune\nR:jig\nK:Dmix\nfed cAG|";
        let out = transpose_document(tune, "Emix");
        assert!(out.starts_with("X:1\nT:Banish Misfortune\nR:jig\nK: Emix\n"));
    }

    #[test]
    fn test_transpose_document_without_key() {
        let text = "T:Tune\nno key header\nABC";
        assert_eq!(transpose_document(text, "D"), text);
    }

    #[test]
    fn test_shift_octave_roundtrip() {
        for n in [1, -1, 2, -3] {
            let back = shift_octave(&shift_octave(REEL, n), -n);
            assert_eq!(pitches(&back), pitches(REEL));
        }
    }

    #[test]
    fn test_shift_octave_spelling_follows_note() {
        assert_eq!(shift_octave("^F _B =c D2", 1), "^f _b c' d2");
        assert_eq!(shift_octave("c'", -2), "C");
        assert_eq!(shift_octave("G,", -1), "G,,");
        assert_eq!(shift_octave("ABC", 0), "ABC");
    }

    #[test]
    fn test_shift_octave_overflow_is_inert() {
        assert_eq!(shift_octave("C", 200_000_000), "C");
        assert_eq!(shift_octave("^F2 G", i32::MIN), "^F2 G");
        // The multiplication fits, the per-note addition does not
        assert_eq!(shift_octave("c", i32::MAX / 12), "c");
    }

    #[test]
    fn test_parse_octave_shift() {
        assert_eq!(parse_octave_shift("2").unwrap(), 2);
        assert_eq!(parse_octave_shift(" -10 ").unwrap(), -10);
        for bad in ["11", "-200000000", "two", ""] {
            assert!(
                matches!(parse_octave_shift(bad), Err(CeolError::InvalidArgument(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_transpose_between_modal_keys() {
        // B mixolydian to E mixolydian is down a fifth
        assert_eq!(transpose_document("X:1\nK:Bmix\nB|", "Emix"), "X:1\nK: Emix\nE|");
        assert_eq!(transpose("A", "Ador", "Gdor"), "G");
    }

    #[test]
    fn test_average_pitch() {
        assert_eq!(average_pitch("C c"), 54.0);
        assert_eq!(average_pitch("| z4 |"), DEFAULT_AVERAGE_PITCH);
        assert_eq!(average_pitch(""), DEFAULT_AVERAGE_PITCH);
    }
}
