//! # Configuration
//!
//! Optional YAML settings for the command line and for library callers that want the
//! same knobs:
//!
//! ```yaml
//! deviation-threshold: 0.5   # octave corrector: mean deviation treated as consistent
//! variation-attempts: 5      # attempts per variation technique
//! idea-count: 5              # ideas returned per lick
//! chord-key: D               # key used for chord-tone substitution
//! seed: 42                   # fixed random seed (omit for a fresh one each run)
//! instructions:              # replace transformer instruction payloads by name
//!   baroque: "Rework the tune as a minuet."
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.
//!
//! `instructions` only matters to library callers that drive a
//! [`crate::transformer::TextTransformer`]. The command line has no transformer of its
//! own, so it validates the table (an unknown name is still an error) and leaves it
//! unused.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::CeolError;
use crate::octave::{OctaveCorrector, DEFAULT_DEVIATION_THRESHOLD};
use crate::transformer::InstructionRegistry;
use crate::variation::VariationSettings;

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    deviation_threshold: Option<f64>,
    variation_attempts: Option<usize>,
    idea_count: Option<usize>,
    chord_key: Option<String>,
    seed: Option<u64>,
    instructions: Option<BTreeMap<String, String>>,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub deviation_threshold: f64,
    pub variation: VariationSettings,
    pub seed: Option<u64>,
    /// Payloads for the transformer pipelines; not read by the command line
    pub instructions: InstructionRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            variation: VariationSettings::default(),
            seed: None,
            instructions: InstructionRegistry::default(),
        }
    }
}

impl Config {
    /// Parse and validate YAML configuration text.
    ///
    /// # Errors
    /// [`CeolError::ConfigError`] for malformed YAML, a negative or non-finite threshold,
    /// zero attempts, or an unknown instruction name.
    pub fn from_yaml_str(content: &str) -> Result<Self, CeolError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| CeolError::ConfigError(e.to_string()))?;

        let deviation_threshold = raw.deviation_threshold.unwrap_or(DEFAULT_DEVIATION_THRESHOLD);
        if !deviation_threshold.is_finite() || deviation_threshold < 0.0 {
            return Err(CeolError::ConfigError(format!(
                "deviation-threshold must be a non-negative number, got {}",
                deviation_threshold
            )));
        }

        let defaults = VariationSettings::default();
        let attempts = raw.variation_attempts.unwrap_or(defaults.attempts);
        if attempts == 0 {
            return Err(CeolError::ConfigError(
                "variation-attempts must be at least 1".to_string(),
            ));
        }

        let instructions = match &raw.instructions {
            Some(overrides) => InstructionRegistry::with_overrides(overrides)?,
            None => InstructionRegistry::default(),
        };

        Ok(Self {
            deviation_threshold,
            variation: VariationSettings {
                attempts,
                idea_count: raw.idea_count.unwrap_or(defaults.idea_count),
                chord_key: raw.chord_key.unwrap_or(defaults.chord_key),
            },
            seed: raw.seed,
            instructions,
        })
    }

    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CeolError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn corrector(&self) -> OctaveCorrector {
        OctaveCorrector::new(self.deviation_threshold)
    }
}
