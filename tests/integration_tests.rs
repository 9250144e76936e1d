//! Integration tests for ceol
//!
//! Runs whole tunes through the public API the way the command line does.

use ceol::repetition::{extract_measures_with_durations, target_licks};
use ceol::settings::compare_settings;
use ceol::transformer::{
    transpose_tune, InstructionRegistry, TextTransformer, TransformerHandle, TranspositionMethod,
};
use ceol::variation::{generate_variation_ideas, vary_tune, VariationSettings};
use ceol::{
    correct_octave_register, decode, detect_repetition, parse, transpose_document, CeolError,
    Config, OctaveCorrector,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const KESH: &str = "X:1\nT:The Kesh\nR:jig\nM:6/8\nL:1/8\nK:G\n\
|:GAG GAB|ABA ABd|edd gdd|edB dBA|\n\
GAG GAB|ABA ABd|edd gdd|1 edB dBA:|2 edB dBG|";

fn pitches(abc: &str) -> Vec<i32> {
    ceol::note::note_tokens(&ceol::document::music_body(abc))
        .iter()
        .map(|token| token.semitone().unwrap())
        .collect()
}

#[test]
fn test_transpose_keeps_headers_and_shifts_every_note() {
    let out = transpose_document(KESH, "A");
    assert!(out.starts_with("X:1\nT:The Kesh\nR:jig\nM:6/8\nL:1/8\nK: A\n"));

    let before = pitches(KESH);
    let after = pitches(&out);
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(a - b, 2);
    }
}

#[test]
fn test_transpose_round_trip_restores_pitches() {
    let there = transpose_document(KESH, "D");
    let back = transpose_document(&there, "G");
    assert_eq!(pitches(&back), pitches(KESH));
}

#[test]
fn test_correct_register_after_drifting_transposition() {
    let candidate = transpose_document(KESH, "A");
    // Drop a whole bar an octave, as a careless transposer would
    let broken = candidate.replacen("^fee aee", "^FEE AEE", 1);
    assert_ne!(pitches(&broken), pitches(&candidate));

    let repaired = correct_octave_register(KESH, &broken);
    assert_eq!(pitches(&repaired), pitches(&candidate));
}

#[test]
fn test_correct_register_leaves_clean_transposition() {
    let candidate = transpose_document(KESH, "E");
    assert_eq!(correct_octave_register(KESH, &candidate), candidate);
}

#[test]
fn test_repetition_in_a_standard_jig() {
    let report = detect_repetition(KESH);
    assert!(report.has_repetition);
    assert_eq!(report.repeated_measures["gaggab"], vec![0, 4]);
    assert_eq!(report.repeated_phrases_4bar[0].occurrences, vec![0, 4]);

    let licks = target_licks(KESH);
    assert!(!licks.is_empty());
    assert!(licks.len() <= 3);
}

#[test]
fn test_variation_ideas_are_reproducible() {
    let settings = VariationSettings::default();
    let first = generate_variation_ideas("GAG GAB|ABA ABd", &settings, &mut ChaCha8Rng::seed_from_u64(3));
    let second = generate_variation_ideas("GAG GAB|ABA ABd", &settings, &mut ChaCha8Rng::seed_from_u64(3));
    assert_eq!(first, second);
    assert!(first.len() <= settings.idea_count);
    for idea in &first {
        assert_ne!(idea.abc.replace([' ', '|'], ""), "GAGGABABAABd");
    }
}

#[test]
fn test_vary_tune_keeps_bar_count() {
    let measures = extract_measures_with_durations(KESH);
    for seed in 0..10 {
        let applied = vary_tune(KESH, &VariationSettings::default(), &mut ChaCha8Rng::seed_from_u64(seed));
        let doc = parse(&applied.abc).unwrap();
        assert_eq!(doc.key(), "G");
        assert_eq!(extract_measures_with_durations(&applied.abc).len(), measures.len());
        for bar in applied.variation_mapping.keys() {
            assert!(*bar >= 1 && *bar <= measures.len());
        }
    }
}

#[test]
fn test_compare_settings_in_different_keys() {
    let in_d = transpose_document(KESH, "D");
    let comparison = compare_settings(&[KESH, in_d.as_str()]);
    assert!(comparison.differences.is_empty());
    assert_eq!(comparison.stability_score, 1.0);
    assert_eq!(comparison.num_bars_analyzed, 9);
}

struct Drifting;

impl TextTransformer for Drifting {
    fn complete(&self, abc: &str, _instruction: &str) -> Result<String, CeolError> {
        let answer = transpose_document(abc, "A").replacen("^fee aee", "^FEE AEE", 1);
        Ok(format!("```abc\n{}\n```", answer))
    }
}

#[test]
fn test_transformer_transposition_is_repaired() {
    let handle = TransformerHandle::new(Box::new(Drifting));
    let outcome = transpose_tune(
        &handle,
        &InstructionRegistry::default(),
        &OctaveCorrector::default(),
        KESH,
        "A",
    );
    assert_eq!(outcome.method, TranspositionMethod::Transformer);
    assert!(outcome.corrected);
    assert_eq!(pitches(&outcome.abc), pitches(&transpose_document(KESH, "A")));
}

#[test]
fn test_missing_transformer_falls_back() {
    let outcome = transpose_tune(
        &TransformerHandle::unavailable(),
        &InstructionRegistry::default(),
        &OctaveCorrector::default(),
        KESH,
        "A",
    );
    assert_eq!(outcome.method, TranspositionMethod::Deterministic);
    assert_eq!(outcome.abc, transpose_document(KESH, "A"));
}

#[test]
fn test_config_drives_corrector() {
    let config = Config::from_yaml_str("deviation-threshold: 0.1\nseed: 9").unwrap();
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.corrector().threshold, 0.1);
}

#[test]
fn test_decode_reference_notes() {
    assert_eq!(decode("C").unwrap(), 48);
    assert_eq!(decode("c").unwrap(), 60);
    assert!(matches!(decode("H"), Err(CeolError::InvalidNote { .. })));
}
