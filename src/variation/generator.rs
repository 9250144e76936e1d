use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use super::techniques::vary_phrase;
use super::types::{AppliedVariations, IdeaGroup, Technique, VariationIdea, VariationSettings};
use crate::document::key_line_index;
use crate::repetition::{
    detect_repetition, extract_measures_with_durations, find_repeated_phrases, target_licks,
    RepeatedPhrase, DEFAULT_MIN_OCCURRENCES,
};

/// Chance that any one occurrence of a repeated phrase gets replaced
const APPLY_PROBABILITY: f64 = 0.7;

const BARS_PER_LINE: usize = 4;

const VARIED_ANNOTATION: &str = "\"^VARIED\"";

fn compact(text: &str, strip: &[char]) -> String {
    text.chars().filter(|c| !strip.contains(c)).collect()
}

fn split_bars(text: &str) -> Vec<&str> {
    text.split('|')
        .map(str::trim)
        .filter(|bar| !bar.is_empty())
        .collect()
}

/// Variation ideas for a lick of one or more bars.
///
/// Every technique runs on each bar separately and the bars are joined back with `|`.
/// Ideas that come out identical to the lick are dropped, and at most
/// `settings.idea_count` are returned.
pub fn generate_variation_ideas(
    lick: &str,
    settings: &VariationSettings,
    rng: &mut impl Rng,
) -> Vec<VariationIdea> {
    let bars = split_bars(lick);
    if bars.is_empty() {
        return Vec::new();
    }
    let original = compact(lick, &['|', '-', ' ']);

    let mut ideas = Vec::with_capacity(Technique::ALL.len());
    for technique in Technique::ALL {
        let varied: Vec<VariationIdea> = bars
            .iter()
            .map(|bar| vary_phrase(technique, bar, &settings.chord_key, settings.attempts, rng))
            .collect();
        let abc = varied
            .iter()
            .map(|idea| idea.abc.as_str())
            .collect::<Vec<_>>()
            .join("|");
        ideas.push(VariationIdea {
            abc,
            description: varied[0].description.clone(),
        });
    }

    ideas
        .into_iter()
        .filter(|idea| compact(&idea.abc, &['|', ' ']) != original)
        .take(settings.idea_count)
        .collect()
}

/// Idea groups for every target lick of a tune.
pub fn variation_ideas_for_tune(
    abc: &str,
    settings: &VariationSettings,
    rng: &mut impl Rng,
) -> Vec<IdeaGroup> {
    target_licks(abc)
        .into_iter()
        .map(|lick| {
            let ideas = generate_variation_ideas(&lick, settings, rng);
            IdeaGroup {
                original: lick,
                ideas,
            }
        })
        .collect()
}

/// Replace occurrences of repeated phrases with randomly chosen ideas.
///
/// Each occurrence of a phrase whose text matches an idea group's lick is replaced with
/// probability 0.7. The body is rebuilt four bars per line and replaced bars carry a
/// `"^VARIED"` annotation. Headers up to `K:` are kept.
pub fn apply_variations_to_tune(
    abc: &str,
    repeated_phrases: &[RepeatedPhrase],
    groups: &[IdeaGroup],
    rng: &mut impl Rng,
) -> AppliedVariations {
    let mut measures = extract_measures_with_durations(abc);
    let mut modified = BTreeSet::new();
    let mut variation_mapping = BTreeMap::new();

    for group in groups.iter().filter(|g| !g.ideas.is_empty()) {
        let lick = compact(&group.original, &['|', ' ']);
        for phrase in repeated_phrases
            .iter()
            .filter(|p| compact(&p.original_text, &['|', ' ']) == lick)
        {
            for &start in &phrase.occurrences {
                if !rng.random_bool(APPLY_PROBABILITY) {
                    continue;
                }
                let idea = &group.ideas[rng.random_range(0..group.ideas.len())];
                let bars = split_bars(&idea.abc);
                for (offset, bar) in bars.iter().take(phrase.length).enumerate() {
                    let idx = start + offset;
                    if idx < measures.len() {
                        measures[idx] = bar.to_string();
                        modified.insert(idx);
                        variation_mapping.insert(idx + 1, bar.to_string());
                    }
                }
            }
        }
    }

    log::debug!("varied {} of {} bars", modified.len(), measures.len());

    let annotated: Vec<String> = measures
        .iter()
        .enumerate()
        .map(|(i, measure)| {
            if modified.contains(&i) {
                format!("{}{}", VARIED_ANNOTATION, measure)
            } else {
                measure.clone()
            }
        })
        .collect();
    let music = annotated
        .chunks(BARS_PER_LINE)
        .map(|line| format!("|{}|", line.join("|")))
        .collect::<Vec<_>>()
        .join("\n");

    let lines: Vec<&str> = abc.split('\n').collect();
    let abc = match key_line_index(&lines) {
        Some(idx) => format!("{}\n{}", lines[..=idx].join("\n"), music),
        None => music,
    };

    AppliedVariations {
        abc,
        variation_mapping,
    }
}

/// Detect repetition, generate ideas for the target licks and apply them.
///
/// Two-bar phrases are varied when the tune has any; otherwise single repeated
/// measures are.
pub fn vary_tune(abc: &str, settings: &VariationSettings, rng: &mut impl Rng) -> AppliedVariations {
    let report = detect_repetition(abc);
    let phrases = if report.repeated_phrases_2bar.is_empty() {
        find_repeated_phrases(abc, 1, DEFAULT_MIN_OCCURRENCES)
    } else {
        report.repeated_phrases_2bar
    };
    let groups = variation_ideas_for_tune(abc, settings, rng);
    apply_variations_to_tune(abc, &phrases, &groups, rng)
}
