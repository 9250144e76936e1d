//! # External Text Transformer
//!
//! Pipelines around an outside text transformer: something that takes ABC text plus a
//! natural-language instruction and returns new ABC text. In practice that is a
//! language model; this crate only sees the [`TextTransformer`] trait.
//!
//! ## Trust Model
//! Output from the transformer is never trusted:
//! - Markdown code fences are stripped before anything else looks at it
//! - Transposed output is checked against the original and octave drift is repaired
//!   ([`crate::octave`])
//! - Output without a `K:` header, or a transformer error, falls back to the
//!   deterministic transposer
//!
//! ## Availability
//! [`TransformerHandle`] carries the transformer (or its absence) explicitly. Whether
//! one is configured is decided once when the handle is built; callers check
//! [`TransformerHandle::is_available`] instead of reading global state.
//!
//! ## Instructions
//! Instruction payloads are opaque strings looked up by [`Instruction`] in an
//! [`InstructionRegistry`]. Defaults ship with the crate and single entries can be
//! overridden from configuration.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::Serialize;

use crate::document::{key_line_index, music_body, strip_code_fence};
use crate::error::CeolError;
use crate::octave::OctaveCorrector;
use crate::transpose::transpose_document;

/// Something that rewrites ABC text according to an instruction
pub trait TextTransformer {
    fn complete(&self, abc: &str, instruction: &str) -> Result<String, CeolError>;
}

/// A text transformer that may be absent
pub struct TransformerHandle {
    transformer: Option<Box<dyn TextTransformer>>,
    available: bool,
}

impl TransformerHandle {
    pub fn new(transformer: Box<dyn TextTransformer>) -> Self {
        Self {
            transformer: Some(transformer),
            available: true,
        }
    }

    /// A handle with no transformer; every pipeline takes its fallback path.
    pub fn unavailable() -> Self {
        Self {
            transformer: None,
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Run the transformer and strip any code fence around its answer.
    pub fn complete(&self, abc: &str, instruction: &str) -> Result<String, CeolError> {
        let transformer = self
            .transformer
            .as_ref()
            .ok_or(CeolError::TransformerUnavailable)?;
        let output = transformer.complete(abc, instruction)?;
        Ok(strip_code_fence(&output))
    }
}

impl Default for TransformerHandle {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Melodic variation kinds handed to the transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MelodicKind {
    Neighbor,
    PhraseEnding,
    NoteConsolidation,
    Arpeggiation,
    MotivicSequence,
    ContourSimplification,
    OctaveDisplacement,
    Chromatic,
    IntervallicExpansion,
    RhythmicConsolidation,
    CrossRhythm,
    RhythmicShift,
    Simplification,
}

impl MelodicKind {
    pub const ALL: [MelodicKind; 13] = [
        MelodicKind::Neighbor,
        MelodicKind::PhraseEnding,
        MelodicKind::NoteConsolidation,
        MelodicKind::Arpeggiation,
        MelodicKind::MotivicSequence,
        MelodicKind::ContourSimplification,
        MelodicKind::OctaveDisplacement,
        MelodicKind::Chromatic,
        MelodicKind::IntervallicExpansion,
        MelodicKind::RhythmicConsolidation,
        MelodicKind::CrossRhythm,
        MelodicKind::RhythmicShift,
        MelodicKind::Simplification,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MelodicKind::Neighbor => "neighbor",
            MelodicKind::PhraseEnding => "phrase_ending",
            MelodicKind::NoteConsolidation => "note_consolidation",
            MelodicKind::Arpeggiation => "arpeggiation",
            MelodicKind::MotivicSequence => "motivic_sequence",
            MelodicKind::ContourSimplification => "contour_simplification",
            MelodicKind::OctaveDisplacement => "octave_displacement",
            MelodicKind::Chromatic => "chromatic",
            MelodicKind::IntervallicExpansion => "intervallic_expansion",
            MelodicKind::RhythmicConsolidation => "rhythmic_consolidation",
            MelodicKind::CrossRhythm => "cross_rhythm",
            MelodicKind::RhythmicShift => "rhythmic_shift",
            MelodicKind::Simplification => "simplification",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Human-readable summary
    pub fn description(self) -> &'static str {
        match self {
            MelodicKind::Neighbor => "Neighbor tone substitution - traditional variation technique",
            MelodicKind::PhraseEnding => "Phrase ending variation - vary cadential patterns",
            MelodicKind::NoteConsolidation => {
                "Note consolidation - combine repeated notes into longer durations"
            }
            MelodicKind::Arpeggiation => "Arpeggiation - replace scales with chord tone arpeggios",
            MelodicKind::MotivicSequence => {
                "Motivic sequence - repeat fragments at different pitch levels"
            }
            MelodicKind::ContourSimplification => {
                "Contour simplification - smooth out melodic zigzags"
            }
            MelodicKind::OctaveDisplacement => "Octave displacement - move phrases up/down an octave",
            MelodicKind::Chromatic => "Chromatic passing tones - bebop-influenced approach",
            MelodicKind::IntervallicExpansion => {
                "Intervallic expansion - widen intervals between notes"
            }
            MelodicKind::RhythmicConsolidation => "Rhythmic consolidation - fewer, longer notes",
            MelodicKind::CrossRhythm => "Cross-rhythm - 3-against-2 polyrhythmic patterns",
            MelodicKind::RhythmicShift => "Rhythmic displacement - shift note positions",
            MelodicKind::Simplification => "Simplification - reduce to essential notes",
        }
    }

    fn default_payload(self) -> &'static str {
        match self {
            MelodicKind::Neighbor => {
                "Decorate sustained notes with an upper or lower neighbor, keeping the contour \
                 recognizable and the 6/8 jig feel intact."
            }
            MelodicKind::PhraseEnding => {
                "Change how phrases resolve at the ends of bars while keeping the strong \
                 cadences and the modal character."
            }
            MelodicKind::NoteConsolidation => {
                "Merge runs of the same note into longer notes (AA becomes A2) without \
                 changing the length of any bar."
            }
            MelodicKind::Arpeggiation => {
                "Swap scale runs for arpeggios of the underlying diatonic chord, keeping a \
                 similar contour and the jig rhythm."
            }
            MelodicKind::MotivicSequence => {
                "Take short two or three note fragments and restate them a second or third \
                 higher or lower, keeping the phrase structure."
            }
            MelodicKind::ContourSimplification => {
                "Remove zigzags and unnecessary neighbor notes so each line moves in a \
                 clearer direction, keeping the rhythm."
            }
            MelodicKind::OctaveDisplacement => {
                "Move whole phrases up or down an octave where the instrument range allows."
            }
            MelodicKind::Chromatic => {
                "Insert chromatic passing notes between chord tones in a bebop manner."
            }
            MelodicKind::IntervallicExpansion => {
                "Widen the intervals between successive notes while keeping the direction \
                 of each move."
            }
            MelodicKind::RhythmicConsolidation => {
                "Rewrite the rhythm with fewer, longer notes, keeping bar lengths."
            }
            MelodicKind::CrossRhythm => {
                "Group notes three against two across the beat for a cross-rhythm effect."
            }
            MelodicKind::RhythmicShift => {
                "Displace notes by an eighth so accents fall off the beat, keeping bar lengths."
            }
            MelodicKind::Simplification => {
                "Reduce each bar to its essential structural notes."
            }
        }
    }
}

/// Whole-tune style transformations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    DroneMinimalist,
    GrooveFusion,
    AmbientChamber,
    BebopJazz,
    Baroque,
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::DroneMinimalist,
        Style::GrooveFusion,
        Style::AmbientChamber,
        Style::BebopJazz,
        Style::Baroque,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Style::DroneMinimalist => "drone_minimalist",
            Style::GrooveFusion => "groove_fusion",
            Style::AmbientChamber => "ambient_chamber",
            Style::BebopJazz => "bebop_jazz",
            Style::Baroque => "baroque",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Style::DroneMinimalist => "drone minimalist style",
            Style::GrooveFusion => "groove fusion style",
            Style::AmbientChamber => "ambient chamber style",
            Style::BebopJazz => "bebop jazz style",
            Style::Baroque => "baroque style",
        }
    }

    fn default_payload(self) -> &'static str {
        match self {
            Style::DroneMinimalist => {
                "Rework the tune as drone minimalism: pedal tones on A and D, only the \
                 essential melody notes, long note values and no ornaments."
            }
            Style::GrooveFusion => {
                "Rework the tune as groove fusion: syncopation, chromatic passing notes, \
                 quartal harmony and double stops on the strong beats."
            }
            Style::AmbientChamber => {
                "Rework the tune as ambient chamber music: parallel thirds and sixths, open \
                 voicings and a countermelody in contrary motion."
            }
            Style::BebopJazz => {
                "Rework the tune as bebop: chromatic approach notes, rhythmic displacement \
                 and a swing feel."
            }
            Style::Baroque => {
                "Rework the tune in a baroque manner: imitative counterpoint, trills and \
                 mordents, harmonic sequences and a walking bass."
            }
        }
    }
}

/// Key into the instruction registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Melodic(MelodicKind),
    Style(Style),
    Transpose,
}

const TRANSPOSE_PAYLOAD: &str = "Transpose this tune to the requested key. Keep every header \
except K:, which must name the new key, and keep the tune in a playable register.";

impl Instruction {
    pub fn name(self) -> &'static str {
        match self {
            Instruction::Melodic(kind) => kind.name(),
            Instruction::Style(style) => style.name(),
            Instruction::Transpose => "transpose",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "transpose" {
            return Some(Instruction::Transpose);
        }
        MelodicKind::from_name(name)
            .map(Instruction::Melodic)
            .or_else(|| Style::from_name(name).map(Instruction::Style))
    }

    /// Every instruction the registry knows about
    pub fn all() -> impl Iterator<Item = Instruction> {
        MelodicKind::ALL
            .into_iter()
            .map(Instruction::Melodic)
            .chain(Style::ALL.into_iter().map(Instruction::Style))
            .chain(std::iter::once(Instruction::Transpose))
    }

    fn default_payload(self) -> &'static str {
        match self {
            Instruction::Melodic(kind) => kind.default_payload(),
            Instruction::Style(style) => style.default_payload(),
            Instruction::Transpose => TRANSPOSE_PAYLOAD,
        }
    }
}

/// Immutable instruction → payload table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRegistry {
    payloads: HashMap<Instruction, String>,
}

impl Default for InstructionRegistry {
    fn default() -> Self {
        Self {
            payloads: Instruction::all()
                .map(|instruction| (instruction, instruction.default_payload().to_string()))
                .collect(),
        }
    }
}

impl InstructionRegistry {
    /// Default payloads with some replaced by name.
    ///
    /// # Errors
    /// [`CeolError::ConfigError`] for a name that is not a known instruction.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, CeolError> {
        let mut registry = Self::default();
        for (name, payload) in overrides {
            let instruction = Instruction::from_name(name)
                .ok_or_else(|| CeolError::ConfigError(format!("unknown instruction '{}'", name)))?;
            registry.payloads.insert(instruction, payload.clone());
        }
        Ok(registry)
    }

    pub fn payload(&self, instruction: Instruction) -> &str {
        self.payloads
            .get(&instruction)
            .map_or_else(|| instruction.default_payload(), String::as_str)
    }
}

/// How a transposition was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranspositionMethod {
    Transformer,
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspositionOutcome {
    pub abc: String,
    pub method: TranspositionMethod,
    /// Whether octave drift in the transformer's answer was repaired
    pub corrected: bool,
}

impl TranspositionOutcome {
    fn deterministic(abc: &str, key: &str) -> Self {
        Self {
            abc: transpose_document(abc, key),
            method: TranspositionMethod::Deterministic,
            corrected: false,
        }
    }
}

/// Transpose a tune with the transformer, repairing its octave drift, or with the
/// deterministic transposer when the transformer is absent, fails, or answers with
/// something that has no `K:` header.
pub fn transpose_tune(
    handle: &TransformerHandle,
    registry: &InstructionRegistry,
    corrector: &OctaveCorrector,
    abc: &str,
    key: &str,
) -> TranspositionOutcome {
    if !handle.is_available() {
        return TranspositionOutcome::deterministic(abc, key);
    }

    let instruction = format!(
        "{}\nTarget key: {}",
        registry.payload(Instruction::Transpose),
        key
    );
    let candidate = match handle.complete(abc, &instruction) {
        Ok(candidate) => candidate,
        Err(e) => {
            log::warn!("{}, transposing deterministically", e);
            return TranspositionOutcome::deterministic(abc, key);
        }
    };

    let lines: Vec<&str> = candidate.split('\n').collect();
    if key_line_index(&lines).is_none() {
        log::warn!("transformer answer has no K: header, transposing deterministically");
        return TranspositionOutcome::deterministic(abc, key);
    }

    let corrected = corrector.correct(abc, &candidate);
    TranspositionOutcome {
        corrected: corrected != candidate,
        abc: corrected,
        method: TranspositionMethod::Transformer,
    }
}

/// A bar that differs between two versions of a tune
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedBar {
    /// 1-based
    pub bar_number: usize,
    pub original: String,
    pub modified: String,
}

fn bars_of(abc: &str) -> Vec<String> {
    music_body(abc.trim())
        .split('|')
        .map(str::trim)
        .filter(|bar| !bar.is_empty())
        .map(str::to_string)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bars that differ (ignoring spacing) between two tunes, compared position by
/// position over the shorter one. `limit` caps the number reported.
pub fn diff_bars(original: &str, modified: &str, limit: Option<usize>) -> Vec<ChangedBar> {
    bars_of(original)
        .into_iter()
        .zip(bars_of(modified))
        .enumerate()
        .filter(|(_, (a, b))| collapse_whitespace(a) != collapse_whitespace(b))
        .map(|(i, (original, modified))| ChangedBar {
            bar_number: i + 1,
            original,
            modified,
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Where a melodic variation should be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationTarget<'a> {
    /// Every occurrence of this lick
    Lick(&'a str),
    /// This many places chosen by the transformer
    Spots(usize),
    /// Two to five places, drawn at random
    AnySpots,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MelodicOutcome {
    pub abc: String,
    pub description: String,
    pub changed_bars: Vec<ChangedBar>,
}

const MIN_SPOTS: usize = 2;
const MAX_SPOTS: usize = 5;

/// Ask the transformer for a melodic variation and report which bars changed.
///
/// Without a transformer, or when it fails, the tune comes back unchanged with the
/// reason as description and no changed bars.
pub fn apply_melodic_variation(
    handle: &TransformerHandle,
    registry: &InstructionRegistry,
    abc: &str,
    kind: MelodicKind,
    target: VariationTarget<'_>,
    rng: &mut impl Rng,
) -> MelodicOutcome {
    let unchanged = |description: String| MelodicOutcome {
        abc: abc.to_string(),
        description,
        changed_bars: Vec::new(),
    };

    if !handle.is_available() {
        return unchanged(CeolError::TransformerUnavailable.to_string());
    }

    let payload = registry.payload(Instruction::Melodic(kind));
    let (instruction, description, limit) = match target {
        VariationTarget::Lick(lick) => (
            format!(
                "{}\nOnly change the lick \"{}\" wherever it appears and leave everything \
                 else as it is. Keep the same headers.",
                payload, lick
            ),
            format!("Applied to lick \"{}\"", lick),
            None,
        ),
        VariationTarget::Spots(_) | VariationTarget::AnySpots => {
            let spots = match target {
                VariationTarget::Spots(n) => n,
                _ => rng.random_range(MIN_SPOTS..=MAX_SPOTS),
            };
            (
                format!(
                    "{}\nApply this in {} different places spread across the tune. Keep the \
                     same headers.",
                    payload, spots
                ),
                format!("Applied to {} different locations", spots),
                Some(spots),
            )
        }
    };

    log::debug!("requesting {} variation", kind.name());

    match handle.complete(abc, &instruction) {
        Ok(modified) => {
            let changed_bars = diff_bars(abc, &modified, limit);
            MelodicOutcome {
                abc: modified,
                description,
                changed_bars,
            }
        }
        Err(e) => {
            log::warn!("melodic variation failed: {}", e);
            unchanged(e.to_string())
        }
    }
}

/// A tune rewritten in another style
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTransformation {
    pub style: Style,
    pub abc: String,
    pub description: String,
}

/// Rewrite a tune in each requested style.
///
/// # Errors
/// [`CeolError::TransformerUnavailable`] without a transformer, or the first error the
/// transformer reports.
pub fn transform_styles(
    handle: &TransformerHandle,
    registry: &InstructionRegistry,
    abc: &str,
    styles: &[Style],
) -> Result<Vec<StyleTransformation>, CeolError> {
    if !handle.is_available() {
        return Err(CeolError::TransformerUnavailable);
    }
    styles
        .iter()
        .map(|&style| -> Result<StyleTransformation, CeolError> {
            let instruction = format!(
                "{}\nReturn only ABC notation with the same headers.",
                registry.payload(Instruction::Style(style))
            );
            Ok(StyleTransformation {
                style,
                abc: handle.complete(abc, &instruction)?,
                description: style.description().to_string(),
            })
        })
        .collect()
}
