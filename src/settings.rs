//! # Settings Comparison
//!
//! Traditional tunes circulate in many "settings": the same tune as written down by
//! different players, often in different keys. This module lines settings up bar by
//! bar to show where players diverge.
//!
//! Every setting is transposed to the key of the first one before comparing, so a
//! setting in A and one in G can still agree note for note.

use serde::Serialize;

use crate::document::{music_body, AbcDocument};
use crate::error::CeolError;
use crate::transpose::transpose_document;

const MAX_EXAMPLES: usize = 5;
const MAX_EXAMPLE_VERSIONS: usize = 3;

/// Source of settings for a tune (for example a tune database page)
pub trait TuneArchive {
    /// All ABC settings published at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<String>, CeolError>;
}

/// A bar that is not the same in every setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarDifference {
    pub bar_number: usize,
    pub num_variations: usize,
    /// Distinct versions of the bar, in order of first appearance
    pub variations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleChange {
    pub bar_number: usize,
    pub examples: Vec<String>,
    pub description: String,
}

/// A technique and the (1-based) settings that use it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approach {
    pub technique: String,
    pub settings: Vec<usize>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsComparison {
    pub num_variations: usize,
    pub num_bars_analyzed: usize,
    pub differences: Vec<BarDifference>,
    pub unique_approaches: Vec<Approach>,
    pub example_changes: Vec<ExampleChange>,
    /// Share of analysed bars that every setting agrees on
    pub stability_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SettingsComparison {
    fn incomplete(num_variations: usize, message: &str) -> Self {
        Self {
            num_variations,
            num_bars_analyzed: 0,
            differences: Vec::new(),
            unique_approaches: Vec::new(),
            example_changes: Vec::new(),
            stability_score: 0.0,
            message: Some(message.to_string()),
        }
    }
}

fn bars_of(body: &str) -> Vec<String> {
    body.split('|')
        .map(str::trim)
        .filter(|bar| !bar.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compare settings of one tune bar by bar, over the length of the shortest.
///
/// Settings without a `K:` header are skipped; at least two usable settings are needed.
pub fn compare_settings<S: AsRef<str>>(settings: &[S]) -> SettingsComparison {
    let total = settings.len();
    if total < 2 {
        return SettingsComparison::incomplete(total, "Need at least 2 variations to compare");
    }

    let documents: Vec<AbcDocument> = settings
        .iter()
        .filter_map(|abc| match AbcDocument::parse(abc.as_ref()) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::debug!("skipping setting: {}", e);
                None
            }
        })
        .collect();
    if documents.len() < 2 {
        return SettingsComparison::incomplete(total, "Unable to parse variations");
    }

    let target_key = documents[0].key().to_string();
    let bar_lists: Vec<Vec<String>> = documents
        .iter()
        .map(|doc| {
            if doc.key() == target_key {
                bars_of(&doc.body)
            } else {
                log::debug!("transposing setting from {} to {}", doc.key(), target_key);
                bars_of(&music_body(&transpose_document(&doc.rebuild(), &target_key)))
            }
        })
        .collect();

    let num_bars = bar_lists.iter().map(Vec::len).min().unwrap_or(0);
    let differences: Vec<BarDifference> = (0..num_bars)
        .filter_map(|i| {
            let mut versions: Vec<String> = Vec::new();
            for bars in &bar_lists {
                if !versions.contains(&bars[i]) {
                    versions.push(bars[i].clone());
                }
            }
            (versions.len() > 1).then(|| BarDifference {
                bar_number: i + 1,
                num_variations: versions.len(),
                variations: versions,
            })
        })
        .collect();

    let example_changes = differences
        .iter()
        .take(MAX_EXAMPLES)
        .map(|diff| ExampleChange {
            bar_number: diff.bar_number,
            examples: diff
                .variations
                .iter()
                .take(MAX_EXAMPLE_VERSIONS)
                .cloned()
                .collect(),
            description: format!(
                "Bar {} has {} different versions",
                diff.bar_number, diff.num_variations
            ),
        })
        .collect();

    let stability_score = if num_bars > 0 {
        1.0 - differences.len() as f64 / num_bars as f64
    } else {
        0.0
    };

    SettingsComparison {
        num_variations: total,
        num_bars_analyzed: num_bars,
        differences,
        unique_approaches: find_unique_approaches(settings),
        example_changes,
        stability_score,
        message: None,
    }
}

fn uses_accidentals(body: &str) -> bool {
    body.contains(['^', '_', '='])
}

fn uses_triplets(body: &str) -> bool {
    body.contains("(3")
}

fn uses_octave_markers(body: &str) -> bool {
    body.contains(['\'', ','])
}

/// Which settings use chromatic accidentals, triplets or octave markers in their music.
pub fn find_unique_approaches<S: AsRef<str>>(settings: &[S]) -> Vec<Approach> {
    let checks: [(&str, &str, fn(&str) -> bool); 3] = [
        ("Chromatic notes", "Uses sharps/flats beyond key signature", uses_accidentals),
        ("Triplets", "Uses triplet ornaments", uses_triplets),
        ("Octave displacement", "Moves phrases to different octaves", uses_octave_markers),
    ];

    let bodies: Vec<String> = settings.iter().map(|abc| music_body(abc.as_ref())).collect();
    checks
        .iter()
        .filter_map(|(technique, description, uses)| {
            let users: Vec<usize> = bodies
                .iter()
                .enumerate()
                .filter(|(_, body)| uses(body))
                .map(|(i, _)| i + 1)
                .collect();
            (!users.is_empty()).then(|| Approach {
                technique: technique.to_string(),
                settings: users,
                description: description.to_string(),
            })
        })
        .collect()
}

/// Fetch every setting at `url` and compare them.
pub fn analyze_archive(archive: &dyn TuneArchive, url: &str) -> Result<SettingsComparison, CeolError> {
    let settings = archive.fetch(url)?;
    log::info!("fetched {} settings from {}", settings.len(), url);
    if settings.is_empty() {
        return Ok(SettingsComparison::incomplete(0, "No ABC settings found"));
    }
    Ok(compare_settings(settings.as_slice()))
}
