use std::collections::BTreeMap;

use serde::Serialize;

/// Number of randomized attempts each technique makes before falling back to the
/// unmodified phrase
pub const DEFAULT_ATTEMPTS: usize = 5;

/// Number of ideas returned per lick
pub const DEFAULT_IDEA_COUNT: usize = 5;

/// Key used for chord-tone substitution when none is given
pub const DEFAULT_CHORD_KEY: &str = "D";

/// One note of a phrase: pitch text (accidentals, letter, octave markers) and length in
/// unit notes (1 = one eighth note in 6/8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseNote {
    pub pitch: String,
    pub duration: u32,
}

impl PhraseNote {
    pub fn new(pitch: impl Into<String>, duration: u32) -> Self {
        Self {
            pitch: pitch.into(),
            duration,
        }
    }

    pub fn is_long(&self) -> bool {
        self.duration >= 2
    }
}

/// The eight rewrite techniques ("long notes, short notes")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technique {
    /// `D2` → `DE`: split a long note and step to a neighbor
    FillLongNotes,
    /// `DED` → `D3`: merge a group of three into one long note
    ConsolidateToLong,
    /// `D2` → `DD`: repeat the pitch across a long note's duration
    DoubleNotes,
    /// Move one note up or down exactly one octave
    OctaveDisplacement,
    /// Extend a note over its successor, dropping the successor
    MoveAlong,
    /// Approach a long note from the step below
    SlideApproach,
    /// Replace the second half of a long note with a chord tone
    ChordSubstitution,
    /// Lengthen some notes by dropping the note after them
    StrategicLengthening,
}

impl Technique {
    pub const ALL: [Technique; 8] = [
        Technique::FillLongNotes,
        Technique::ConsolidateToLong,
        Technique::DoubleNotes,
        Technique::OctaveDisplacement,
        Technique::MoveAlong,
        Technique::SlideApproach,
        Technique::ChordSubstitution,
        Technique::StrategicLengthening,
    ];

    /// Short name, used in "(original)" fallback descriptions
    pub fn label(self) -> &'static str {
        match self {
            Technique::FillLongNotes => "Fill long notes",
            Technique::ConsolidateToLong => "Consolidate to long notes",
            Technique::DoubleNotes => "Double/triple notes",
            Technique::OctaveDisplacement => "Octave displacement",
            Technique::MoveAlong => "Move along",
            Technique::SlideApproach => "Slide approach",
            Technique::ChordSubstitution => "Chord tone substitution",
            Technique::StrategicLengthening => "Strategic lengthening",
        }
    }

    /// Description attached to an idea that changed the phrase
    pub fn description(self) -> &'static str {
        match self {
            Technique::FillLongNotes => "Fill long notes with neighbor tones",
            Technique::ConsolidateToLong => "Consolidate to long notes (needs attitude!)",
            Technique::DoubleNotes => "Double/triple notes",
            Technique::OctaveDisplacement => "Octave displacement",
            Technique::MoveAlong => "Move along - extend and eliminate",
            Technique::SlideApproach => "Slide approach from below",
            Technique::ChordSubstitution => "Chord tone substitution",
            Technique::StrategicLengthening => "Strategic lengthening (needs attitude!)",
        }
    }

    /// Description attached when no attempt changed the phrase
    pub fn unchanged_description(self) -> String {
        format!("{} (original)", self.label())
    }
}

/// A candidate rewrite of a lick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationIdea {
    pub abc: String,
    pub description: String,
}

/// Ideas generated for one repeated lick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaGroup {
    pub original: String,
    pub ideas: Vec<VariationIdea>,
}

/// A tune with ideas applied to some occurrences of its repeated phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedVariations {
    pub abc: String,
    /// 1-based bar number → replacement bar text
    pub variation_mapping: BTreeMap<usize, String>,
}

/// Knobs for idea generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationSettings {
    pub attempts: usize,
    pub idea_count: usize,
    pub chord_key: String,
}

impl Default for VariationSettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            idea_count: DEFAULT_IDEA_COUNT,
            chord_key: DEFAULT_CHORD_KEY.to_string(),
        }
    }
}
