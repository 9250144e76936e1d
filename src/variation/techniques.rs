use rand::Rng;

use super::parse::{note_changes, parse_phrase, render_phrase};
use super::types::{PhraseNote, Technique, VariationIdea};
use crate::key::{key_signature, parse_key};
use crate::note::{spell_pitch_class, Accidental, NoteName};

/// A chord tone: letter plus the accidental it is spelled with
pub type ChordTone = (NoteName, Option<Accidental>);

/// A pitch broken into its parts
struct Pitch<'a> {
    name: NoteName,
    lowercase: bool,
    octave: &'a str,
}

impl Pitch<'_> {
    fn parse(text: &str) -> Option<Pitch<'_>> {
        let letter_at = text.find(|c: char| !matches!(c, '^' | '_' | '='))?;
        let mut rest = text[letter_at..].chars();
        let (name, lowercase) = NoteName::from_char(rest.next()?)?;
        Some(Pitch {
            name,
            lowercase,
            octave: rest.as_str(),
        })
    }

    /// Another letter in this pitch's case and octave
    fn respell(&self, name: NoteName, accidental: Option<Accidental>) -> String {
        let letter = if self.lowercase { name.lower() } else { name.upper() };
        format!("{}{}{}", accidental.map_or("", Accidental::symbol), letter, self.octave)
    }
}

/// The letter a step above or below, accidentals dropped. `None` for rests and other
/// non-note symbols.
fn neighbor(pitch: &str, up: bool) -> Option<String> {
    let parts = Pitch::parse(pitch)?;
    let name = if up { parts.name.step_up() } else { parts.name.step_down() };
    Some(parts.respell(name, None))
}

fn displace(pitch: &str, up: bool) -> String {
    let (toward, away) = if up { (',', '\'') } else { ('\'', ',') };
    if pitch.contains(toward) {
        pitch.replacen(toward, "", 1)
    } else {
        format!("{}{}", pitch, away)
    }
}

fn repeat_units(out: &mut Vec<PhraseNote>, pitch: &str, count: u32) {
    out.extend((0..count).map(|_| PhraseNote::new(pitch, 1)));
}

fn is_minor_label(label: &str) -> bool {
    let mode: String = label
        .trim()
        .chars()
        .skip(1)
        .skip_while(|c| *c == '#' || *c == 'b')
        .collect::<String>()
        .trim()
        .to_lowercase();
    mode == "m" || ["min", "dor", "aeo", "phr"].iter().any(|m| mode.starts_with(m))
}

/// Root, third and fifth of the tonic triad of `key_label`, spelled from the key's
/// signature (sharps for `Dmix`, flats for `Gm`).
///
/// Minor, dorian, aeolian and phrygian labels get a minor third.
pub fn chord_tones(key_label: &str) -> Vec<ChordTone> {
    let root = parse_key(key_label).offset;
    let third = if is_minor_label(key_label) { 3 } else { 4 };
    let sharps = key_signature(key_label) >= 0;
    [0, third, 7]
        .iter()
        .map(|interval| spell_pitch_class(root + interval, sharps))
        .collect()
}

fn fill_long_notes(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    let mut out = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        if note.is_long() && rng.random_bool(0.7) {
            if let Some(step) = neighbor(&note.pitch, rng.random_bool(0.5)) {
                out.push(PhraseNote::new(note.pitch.as_str(), 1));
                out.push(PhraseNote::new(step, 1));
                repeat_units(&mut out, &note.pitch, note.duration - 2);
                continue;
            }
        }
        out.push(note.clone());
    }
    out
}

fn consolidate_to_long(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    let mut out = Vec::with_capacity(notes.len());
    let mut merged = false;
    let mut i = 0;
    while i < notes.len() {
        if i + 2 < notes.len() && !merged && rng.random_bool(0.5) {
            let duration = notes[i..i + 3].iter().map(|n| n.duration).sum();
            out.push(PhraseNote::new(notes[i].pitch.as_str(), duration));
            merged = true;
            i += 3;
        } else {
            out.push(notes[i].clone());
            i += 1;
        }
    }
    out
}

fn double_notes(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    let mut out = Vec::with_capacity(notes.len() * 2);
    let mut doubled = false;
    for note in notes {
        if note.is_long() && !doubled && rng.random_bool(0.5) {
            repeat_units(&mut out, &note.pitch, note.duration);
            doubled = true;
        } else {
            out.push(note.clone());
        }
    }
    out
}

fn octave_displacement(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    let mut out = notes.to_vec();
    let pitched: Vec<usize> = (0..notes.len())
        .filter(|&i| Pitch::parse(&notes[i].pitch).is_some())
        .collect();
    if pitched.is_empty() || !rng.random_bool(0.7) {
        return out;
    }
    let idx = pitched[rng.random_range(0..pitched.len())];
    let up = rng.random_bool(0.5);
    out[idx].pitch = displace(&notes[idx].pitch, up);
    out
}

fn move_along(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    let mut out = notes.to_vec();
    if notes.len() < 3 || !rng.random_bool(0.7) {
        return out;
    }
    let idx = rng.random_range(0..=(notes.len() - 2).min(2));
    let absorbed = out.remove(idx + 1);
    out[idx].duration += absorbed.duration;
    out
}

fn slide_approach(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    if notes.is_empty() || !rng.random_bool(0.5) {
        return notes.to_vec();
    }
    let long: Vec<usize> = (0..notes.len())
        .filter(|&i| notes[i].is_long() && Pitch::parse(&notes[i].pitch).is_some())
        .collect();
    if long.is_empty() || !rng.random_bool(0.7) {
        return notes.to_vec();
    }

    let target = long[rng.random_range(0..long.len())];
    let mut out = Vec::with_capacity(notes.len() + 2);
    for (i, note) in notes.iter().enumerate() {
        match neighbor(&note.pitch, false) {
            Some(below) if i == target => {
                out.push(PhraseNote::new(below, 1));
                out.push(PhraseNote::new(note.pitch.as_str(), 1));
                if note.duration > 2 {
                    out.push(PhraseNote::new(note.pitch.as_str(), note.duration - 2));
                }
            }
            _ => out.push(note.clone()),
        }
    }
    out
}

fn chord_substitution(
    notes: &[PhraseNote],
    tones: &[ChordTone],
    rng: &mut impl Rng,
) -> Vec<PhraseNote> {
    let mut out = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let parts = Pitch::parse(&note.pitch).filter(|_| note.is_long());
        let Some(parts) = parts else {
            out.push(note.clone());
            continue;
        };
        let available: Vec<&ChordTone> = tones.iter().filter(|(n, _)| *n != parts.name).collect();
        if available.is_empty() {
            out.push(note.clone());
            continue;
        }
        let (name, accidental) = *available[rng.random_range(0..available.len())];
        out.push(PhraseNote::new(note.pitch.as_str(), 1));
        out.push(PhraseNote::new(parts.respell(name, accidental), 1));
        repeat_units(&mut out, &note.pitch, note.duration - 2);
    }
    out
}

fn strategic_lengthening(notes: &[PhraseNote], rng: &mut impl Rng) -> Vec<PhraseNote> {
    if notes.len() < 4 || !rng.random_bool(0.4) {
        return notes.to_vec();
    }
    let mut out = Vec::with_capacity(notes.len());
    let mut i = 0;
    while i < notes.len() {
        if i + 1 < notes.len() && rng.random_bool(0.5) {
            out.push(PhraseNote::new(
                notes[i].pitch.as_str(),
                notes[i].duration + notes[i + 1].duration,
            ));
            i += 2;
        } else {
            out.push(notes[i].clone());
            i += 1;
        }
    }
    out
}

/// One randomized pass of `technique` over `notes`. Total duration is preserved.
pub fn apply_technique(
    technique: Technique,
    notes: &[PhraseNote],
    tones: &[ChordTone],
    rng: &mut impl Rng,
) -> Vec<PhraseNote> {
    match technique {
        Technique::FillLongNotes => fill_long_notes(notes, rng),
        Technique::ConsolidateToLong => consolidate_to_long(notes, rng),
        Technique::DoubleNotes => double_notes(notes, rng),
        Technique::OctaveDisplacement => octave_displacement(notes, rng),
        Technique::MoveAlong => move_along(notes, rng),
        Technique::SlideApproach => slide_approach(notes, rng),
        Technique::ChordSubstitution => chord_substitution(notes, tones, rng),
        Technique::StrategicLengthening => strategic_lengthening(notes, rng),
    }
}

/// Run `technique` up to `attempts` times on `phrase` and keep the changed result with
/// the fewest note differences (earliest wins a tie).
///
/// When no attempt changes the phrase, the phrase comes back re-rendered with an
/// "(original)" description.
pub fn vary_phrase(
    technique: Technique,
    phrase: &str,
    chord_key: &str,
    attempts: usize,
    rng: &mut impl Rng,
) -> VariationIdea {
    let notes = parse_phrase(phrase);
    let original = render_phrase(&notes);
    let tones = chord_tones(chord_key);

    let mut best: Option<(usize, String)> = None;
    for _ in 0..attempts {
        let candidate = apply_technique(technique, &notes, &tones, rng);
        let rendered = render_phrase(&candidate);
        if rendered == original {
            continue;
        }
        let changes = note_changes(&notes, &candidate);
        if best.as_ref().map_or(true, |(fewest, _)| changes < *fewest) {
            best = Some((changes, rendered));
        }
    }

    match best {
        Some((_, abc)) => VariationIdea {
            abc,
            description: technique.description().to_string(),
        },
        None => VariationIdea {
            abc: original,
            description: technique.unchanged_description(),
        },
    }
}
