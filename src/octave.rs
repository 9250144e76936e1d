//! # Octave Register Correction
//!
//! Repairs a transposed tune whose notes drifted by whole octaves, using the original
//! tune as reference. The transposed candidate usually comes from an unreliable
//! outside process that gets the interval right for most notes and lands some of them
//! an octave (or more) too high or low.
//!
//! ## Algorithm
//! 1. Take the bodies (after `K:`) of the original and the candidate
//! 2. Decode both note sequences; they must have the same length
//! 3. `diff[i] = candidate[i] - original[i]`
//! 4. The median diff is the intended interval (a few drifted notes can't move it)
//! 5. Each diff splits into an octave error `round((diff - median) / 12)` and a
//!    residual within ±6 of the median. When the average distance from the median is
//!    below the threshold the candidate is already consistent
//! 6. Notes with a nonzero octave error are re-encoded at `candidate - 12 * error`,
//!    keeping their sharp/flat bias; every other note keeps its exact text
//! 7. Headers come from the candidate, so header edits survive
//!
//! ## Failure Semantics
//! Nothing here returns an error. Missing `K:` lines, empty note lists and note-count
//! mismatches all return the candidate untouched: a wrong correction is audibly worse
//! than no correction.

use serde::Serialize;

use crate::document::key_line_index;
use crate::note::{encode, note_tokens};
use crate::transpose::rewrite_notes;

/// Average deviation (in semitones) below which a candidate counts as consistent.
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 0.5;

/// Statistics comparing an original note sequence with a transposed one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAnalysis {
    pub note_count: usize,
    /// Presumed true transposition interval (median of per-note differences)
    pub median_interval: i32,
    /// Mean of |diff - median| over all notes, octave drift included
    pub average_deviation: f64,
    /// Mean deviation left after snapping every diff to the octave nearest the median
    pub residual_deviation: f64,
    /// Whole-octave error per note position (0 = correct register)
    pub octave_errors: Vec<i32>,
}

impl RegisterAnalysis {
    /// Number of notes sitting in the wrong octave
    pub fn misplaced_notes(&self) -> usize {
        self.octave_errors.iter().filter(|&&e| e != 0).count()
    }
}

fn semitones(body: &str) -> Vec<i32> {
    note_tokens(body)
        .iter()
        .filter_map(|token| token.semitone().ok())
        .collect()
}

fn mean(values: impl Iterator<Item = i32>, count: usize) -> f64 {
    values.map(|v| v as f64).sum::<f64>() / count as f64
}

/// Compare two note sequences position by position.
///
/// Returns `None` when either body has no notes or the note counts differ, since
/// misaligned positions can't be compared.
pub fn analyze_register(original_body: &str, candidate_body: &str) -> Option<RegisterAnalysis> {
    let original = semitones(original_body);
    let candidate = semitones(candidate_body);

    if original.is_empty() || candidate.is_empty() {
        return None;
    }
    if original.len() != candidate.len() {
        log::warn!(
            "note count mismatch ({} original, {} transposed), skipping octave check",
            original.len(),
            candidate.len()
        );
        return None;
    }

    let diffs: Vec<i32> = candidate
        .iter()
        .zip(&original)
        .map(|(c, o)| c - o)
        .collect();

    let mut sorted = diffs.clone();
    sorted.sort_unstable();
    let median = sorted[sorted.len() / 2];

    // Ties (exactly half an octave) round to even, so ±6 stays in place
    let octave_errors: Vec<i32> = diffs
        .iter()
        .map(|d| ((d - median) as f64 / 12.0).round_ties_even() as i32)
        .collect();

    let count = diffs.len();
    let average_deviation = mean(diffs.iter().map(|d| (d - median).abs()), count);
    let residual_deviation = mean(
        diffs
            .iter()
            .zip(&octave_errors)
            .map(|(d, e)| (d - 12 * e - median).abs()),
        count,
    );

    Some(RegisterAnalysis {
        note_count: count,
        median_interval: median,
        average_deviation,
        residual_deviation,
        octave_errors,
    })
}

/// Octave register corrector with a configurable consistency threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveCorrector {
    pub threshold: f64,
}

impl Default for OctaveCorrector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEVIATION_THRESHOLD,
        }
    }
}

impl OctaveCorrector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Return `candidate` with octave-drifted notes moved back into register.
    pub fn correct(&self, original: &str, candidate: &str) -> String {
        let original_lines: Vec<&str> = original.split('\n').collect();
        let candidate_lines: Vec<&str> = candidate.split('\n').collect();

        let (Some(orig_key), Some(cand_key)) = (
            key_line_index(&original_lines),
            key_line_index(&candidate_lines),
        ) else {
            log::debug!("missing K: header, octave correction not applicable");
            return candidate.to_string();
        };

        let original_body = original_lines[orig_key + 1..].join("\n");
        let candidate_body = candidate_lines[cand_key + 1..].join("\n");

        let Some(analysis) = analyze_register(&original_body, &candidate_body) else {
            return candidate.to_string();
        };

        log::debug!(
            "median transposition {} semitones, average deviation {:.2}",
            analysis.median_interval,
            analysis.average_deviation
        );

        if analysis.average_deviation < self.threshold || analysis.misplaced_notes() == 0 {
            return candidate.to_string();
        }

        log::info!(
            "correcting {} of {} notes with inconsistent octaves",
            analysis.misplaced_notes(),
            analysis.note_count
        );

        let mut position = 0;
        let corrected_body = rewrite_notes(&candidate_body, |token, semitone| {
            let error = analysis.octave_errors.get(position).copied().unwrap_or(0);
            position += 1;
            // Correct notes keep their exact text
            (error != 0).then(|| encode(semitone - 12 * error, token.leans_sharp()))
        });

        format!(
            "{}\n{}",
            candidate_lines[..=cand_key].join("\n"),
            corrected_body
        )
    }
}

/// Correct octave drift in `candidate` against `original` with the default threshold.
///
/// # Example
/// ```rust
/// use ceol::octave::correct_octave_register;
///
/// let original = "X:1\nK:C\nCDEF GABc|";
/// // Up a fourth, but the fourth note landed an octave low
/// let candidate = "X:1\nK:F\nFGA_B, cdef|";
/// assert_eq!(correct_octave_register(original, candidate), "X:1\nK:F\nFGA_B cdef|");
/// ```
pub fn correct_octave_register(original: &str, candidate: &str) -> String {
    OctaveCorrector::default().correct(original, candidate)
}
