//! # Variation Module
//!
//! Rule-based variation ideas for repeated licks, following Brenda Castles' "long
//! notes, short notes" approach to varying Irish dance tunes.
//!
//! ## Purpose
//! A repeated two-bar lick is the natural place for a player to vary a tune. This
//! module rewrites such a lick with simple note arithmetic (no instrument technique
//! required) and can drop the results back into the tune:
//! 1. **Ideas** - every technique applied to a lick, bar by bar
//! 2. **Application** - random ideas substituted into repeated occurrences
//!
//! ## Sub-modules
//! - `types` - PhraseNote, Technique, VariationIdea, IdeaGroup, AppliedVariations
//! - `parse` - phrase parsing, 6/8 rendering and change counting
//! - `techniques` - the eight rewrites and the minimal-edit attempt loop
//! - `generator` - idea generation per lick and application to a whole tune
//!
//! ## Techniques
//! | Technique | Example |
//! |---|---|
//! | Fill long notes | `D2 A` → `DE A` |
//! | Consolidate to long | `DED AGA` → `D3 AGA` |
//! | Double/triple | `D2` → `DD` |
//! | Octave displacement | `DDD` → `D'DD` |
//! | Move along | `d'BcA` → `d'2cA` |
//! | Slide approach | `D2A` → `CDA` |
//! | Chord substitution | `D2A` → `DAA` (in D) |
//! | Strategic lengthening | `ABcdef` → `A2cde2` |
//!
//! Every technique keeps the total duration of the phrase, so bar lengths survive.
//!
//! ## Randomness
//! All draws come from an injected [`rand::Rng`]. Each technique makes a fixed number
//! of attempts and keeps the changed candidate with the fewest note differences; when
//! nothing changed it returns the phrase with an "(original)" description.
//!
//! ## Example
//! ```rust
//! use ceol::variation::{generate_variation_ideas, VariationSettings};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let ideas = generate_variation_ideas("DED A2A|d2B cBA", &VariationSettings::default(), &mut rng);
//!
//! assert!(ideas.len() <= 5);
//! for idea in &ideas {
//!     assert_eq!(idea.abc.split('|').count(), 2);
//! }
//! ```

mod types;
mod parse;
mod techniques;
mod generator;

#[cfg(test)]
mod tests;

pub use types::{
    AppliedVariations, IdeaGroup, PhraseNote, Technique, VariationIdea, VariationSettings,
    DEFAULT_ATTEMPTS, DEFAULT_CHORD_KEY, DEFAULT_IDEA_COUNT,
};
pub use parse::{count_changes, parse_phrase, phrase_length, render_phrase};
pub use techniques::{apply_technique, chord_tones, vary_phrase, ChordTone};
pub use generator::{
    apply_variations_to_tune, generate_variation_ideas, variation_ideas_for_tune, vary_tune,
};
