//! # Note Codec
//!
//! Bidirectional mapping between ABC note tokens and absolute semitone numbers.
//!
//! ## Token Grammar
//! ```text
//! [accidental*][letter][octave-marker*][duration]
//!    ^ _ =      A-G a-g     ' ,         3  /2  3/2
//! ```
//! - Only the first accidental affects pitch (`^^F` decodes like `^F`)
//! - `'` raises and `,` lowers by one octave each, in any order
//! - The duration suffix is opaque here and is carried through verbatim by callers
//!
//! ## Pitch Numbering
//! `absolute = octave * 12 + pitch_class + accidental_offset`
//! - Uppercase letters are octave 4: `C` = 48 ... `B` = 59
//! - Lowercase letters are octave 5: `c` = 60 ... `b` = 71
//!
//! ## Spelling
//! [`encode`] picks between two fixed 12-entry spelling tables (sharps or flats) and a
//! fixed octave table:
//!
//! | octave | letter case | markers        |
//! |--------|-------------|----------------|
//! | > 5    | lower       | `octave - 5` × `'` |
//! | 5      | lower       | none           |
//! | 4      | upper       | none           |
//! | 3      | upper       | one `,`        |
//! | < 3    | upper       | `4 - octave` × `,` |
//!
//! `decode(encode(s, p)) == s` holds for every integer `s` and both preferences.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::CeolError;

/// Note-token pattern shared by every scanner in the crate.
///
/// Groups: 1 = accidentals, 2 = letter, 3 = octave markers, 4 = duration.
pub static NOTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([_=^]*)([A-Ga-g])([,']*)(\d*/?\d*)").expect("note pattern is a valid regex")
});

/// Note names A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Parse a letter of either case. Returns the name and whether it was lowercase.
    pub fn from_char(c: char) -> Option<(Self, bool)> {
        let name = match c.to_ascii_uppercase() {
            'C' => NoteName::C,
            'D' => NoteName::D,
            'E' => NoteName::E,
            'F' => NoteName::F,
            'G' => NoteName::G,
            'A' => NoteName::A,
            'B' => NoteName::B,
            _ => return None,
        };
        Some((name, c.is_ascii_lowercase()))
    }

    /// Semitones above C
    pub fn pitch_class(self) -> i32 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    pub fn upper(self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }

    pub fn lower(self) -> char {
        self.upper().to_ascii_lowercase()
    }

    /// Next letter up, wrapping G -> A
    pub fn step_up(self) -> Self {
        match self {
            NoteName::A => NoteName::B,
            NoteName::B => NoteName::C,
            NoteName::C => NoteName::D,
            NoteName::D => NoteName::E,
            NoteName::E => NoteName::F,
            NoteName::F => NoteName::G,
            NoteName::G => NoteName::A,
        }
    }

    /// Next letter down, wrapping A -> G
    pub fn step_down(self) -> Self {
        match self {
            NoteName::A => NoteName::G,
            NoteName::B => NoteName::A,
            NoteName::C => NoteName::B,
            NoteName::D => NoteName::C,
            NoteName::E => NoteName::D,
            NoteName::F => NoteName::E,
            NoteName::G => NoteName::F,
        }
    }
}

/// ABC accidental prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Sharp,   // ^
    Flat,    // _
    Natural, // =
}

impl Accidental {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '^' => Some(Accidental::Sharp),
            '_' => Some(Accidental::Flat),
            '=' => Some(Accidental::Natural),
            _ => None,
        }
    }

    /// The accidental that governs pitch: the first character of a prefix run.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        prefix.chars().next().and_then(Self::from_char)
    }

    pub fn offset(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::Sharp => "^",
            Accidental::Flat => "_",
            Accidental::Natural => "=",
        }
    }
}

// 0=C, 1=C#/Db, 2=D, 3=D#/Eb, 4=E, 5=F, 6=F#/Gb, 7=G, 8=G#/Ab, 9=A, 10=A#/Bb, 11=B
const SHARP_SPELLINGS: [(NoteName, Option<Accidental>); 12] = [
    (NoteName::C, None),
    (NoteName::C, Some(Accidental::Sharp)),
    (NoteName::D, None),
    (NoteName::D, Some(Accidental::Sharp)),
    (NoteName::E, None),
    (NoteName::F, None),
    (NoteName::F, Some(Accidental::Sharp)),
    (NoteName::G, None),
    (NoteName::G, Some(Accidental::Sharp)),
    (NoteName::A, None),
    (NoteName::A, Some(Accidental::Sharp)),
    (NoteName::B, None),
];

const FLAT_SPELLINGS: [(NoteName, Option<Accidental>); 12] = [
    (NoteName::C, None),
    (NoteName::D, Some(Accidental::Flat)),
    (NoteName::D, None),
    (NoteName::E, Some(Accidental::Flat)),
    (NoteName::E, None),
    (NoteName::F, None),
    (NoteName::G, Some(Accidental::Flat)),
    (NoteName::G, None),
    (NoteName::A, Some(Accidental::Flat)),
    (NoteName::A, None),
    (NoteName::B, Some(Accidental::Flat)),
    (NoteName::B, None),
];

/// Spelling of a pitch class from one of the two fixed tables.
pub fn spell_pitch_class(pitch_class: i32, prefer_sharps: bool) -> (NoteName, Option<Accidental>) {
    let idx = pitch_class.rem_euclid(12) as usize;
    if prefer_sharps {
        SHARP_SPELLINGS[idx]
    } else {
        FLAT_SPELLINGS[idx]
    }
}

/// How an octave is written: letter case plus a run of markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OctaveSpelling {
    Upper { commas: usize },
    Lower { apostrophes: usize },
}

// Octave 3 is always exactly one comma; keep this as an explicit arm.
fn octave_spelling(octave: i32) -> OctaveSpelling {
    match octave {
        4 => OctaveSpelling::Upper { commas: 0 },
        5 => OctaveSpelling::Lower { apostrophes: 0 },
        o if o > 5 => OctaveSpelling::Lower {
            apostrophes: (o - 5) as usize,
        },
        3 => OctaveSpelling::Upper { commas: 1 },
        o => OctaveSpelling::Upper {
            commas: (4 - o) as usize,
        },
    }
}

/// One note token as matched by [`NOTE_PATTERN`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteToken {
    pub accidentals: String,
    pub letter: char,
    pub octave_markers: String,
    pub duration: String,
}

impl NoteToken {
    pub fn from_captures(caps: &Captures<'_>) -> Self {
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
        Self {
            accidentals: group(1),
            letter: caps.get(2).and_then(|m| m.as_str().chars().next()).unwrap_or('?'),
            octave_markers: group(3),
            duration: group(4),
        }
    }

    /// Absolute semitone of this token
    pub fn semitone(&self) -> Result<i32, CeolError> {
        semitone_of(
            Accidental::from_prefix(&self.accidentals),
            self.letter,
            &self.octave_markers,
        )
        .ok_or_else(|| CeolError::InvalidNote {
            token: format!("{}{}{}", self.accidentals, self.letter, self.octave_markers),
        })
    }

    /// Spelling bias carried by the token itself: sharp or unmarked notes lean sharp.
    pub fn leans_sharp(&self) -> bool {
        self.accidentals.contains('^') || self.accidentals.is_empty()
    }
}

/// All note tokens in a stretch of ABC body text, in order.
pub fn note_tokens(body: &str) -> Vec<NoteToken> {
    NOTE_PATTERN
        .captures_iter(body)
        .map(|caps| NoteToken::from_captures(&caps))
        .collect()
}

fn semitone_of(accidental: Option<Accidental>, letter: char, octave_markers: &str) -> Option<i32> {
    let (name, lowercase) = NoteName::from_char(letter)?;
    let mut octave: i32 = if lowercase { 5 } else { 4 };
    for marker in octave_markers.chars() {
        match marker {
            '\'' => octave += 1,
            ',' => octave -= 1,
            _ => {}
        }
    }
    let offset = accidental.map_or(0, Accidental::offset);
    Some(octave * 12 + name.pitch_class() + offset)
}

/// Decode a note token (`^f'`, `B,,3/2`, `=c`) to its absolute semitone.
///
/// # Examples
/// ```
/// use ceol::note::decode;
///
/// assert_eq!(decode("C").unwrap(), 48);
/// assert_eq!(decode("c").unwrap(), 60);
/// assert_eq!(decode("^f'2").unwrap(), 78);
/// assert!(decode("H").is_err());
/// ```
///
/// # Errors
/// [`CeolError::InvalidNote`] when the letter is not A-G or a-g. Accidentals after the
/// first and anything after the octave markers are ignored.
pub fn decode(token: &str) -> Result<i32, CeolError> {
    let invalid = || CeolError::InvalidNote {
        token: token.to_string(),
    };

    let rest = token.trim_start_matches(|c| matches!(c, '^' | '_' | '='));
    let accidental = Accidental::from_prefix(&token[..token.len() - rest.len()]);

    let mut chars = rest.chars();
    let letter = chars.next().ok_or_else(invalid)?;
    let markers: String = chars.take_while(|c| matches!(c, '\'' | ',')).collect();

    semitone_of(accidental, letter, &markers).ok_or_else(invalid)
}

/// Encode an absolute semitone as an ABC note (no duration).
///
/// # Examples
/// ```
/// use ceol::note::encode;
///
/// assert_eq!(encode(48, true), "C");
/// assert_eq!(encode(61, true), "^c");
/// assert_eq!(encode(61, false), "_d");
/// assert_eq!(encode(46, false), "_B,");
/// ```
pub fn encode(semitone: i32, prefer_sharps: bool) -> String {
    let octave = semitone.div_euclid(12);
    let (name, accidental) = spell_pitch_class(semitone, prefer_sharps);

    let mut out = String::new();
    if let Some(acc) = accidental {
        out.push_str(acc.symbol());
    }
    match octave_spelling(octave) {
        OctaveSpelling::Upper { commas } => {
            out.push(name.upper());
            out.push_str(&",".repeat(commas));
        }
        OctaveSpelling::Lower { apostrophes } => {
            out.push(name.lower());
            out.push_str(&"'".repeat(apostrophes));
        }
    }
    out
}
