use super::*;
use crate::repetition::find_repeated_phrases;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const LICKS: &[&str] = &["DED A2A", "d2B cBA", "B3 AGE", "^F2A d2f", "GAB d2e", "z2A B2c"];

fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

fn length_of(abc: &str) -> u32 {
    phrase_length(&parse_phrase(abc))
}

#[test]
fn test_parse_phrase_basic() {
    assert_eq!(
        parse_phrase("DED"),
        vec![PhraseNote::new("D", 1), PhraseNote::new("E", 1), PhraseNote::new("D", 1)]
    );
    assert_eq!(
        parse_phrase("D2A"),
        vec![PhraseNote::new("D", 2), PhraseNote::new("A", 1)]
    );
}

#[test]
fn test_parse_phrase_ties_bars_and_markers() {
    assert_eq!(
        parse_phrase("A-A|d'2 B,"),
        vec![
            PhraseNote::new("A", 1),
            PhraseNote::new("A", 1),
            PhraseNote::new("d'", 2),
            PhraseNote::new("B,", 1),
        ]
    );
    assert_eq!(parse_phrase("_B3 =c"), vec![PhraseNote::new("_B", 3), PhraseNote::new("=c", 1)]);
    assert!(parse_phrase("  | - ").is_empty());
}

#[test]
fn test_render_beams_in_threes() {
    assert_eq!(render_phrase(&parse_phrase("DEDA2A")), "DED A2A");
    assert_eq!(render_phrase(&parse_phrase("D3A3")), "D3 A3");
    assert_eq!(render_phrase(&parse_phrase("d2")), "d2");
    assert_eq!(render_phrase(&[]), "");
}

#[test]
fn test_count_changes() {
    assert_eq!(count_changes("DED A2A", "DED A2A"), 0);
    assert_eq!(count_changes("DED", "DEF"), 1);
    assert_eq!(count_changes("DED", "DE"), 1);
    assert_eq!(count_changes("D2A", "DEA"), 3);
}

#[test]
fn test_chord_tones_follow_key() {
    use crate::note::{Accidental, NoteName};

    assert_eq!(
        chord_tones("D"),
        vec![
            (NoteName::D, None),
            (NoteName::F, Some(Accidental::Sharp)),
            (NoteName::A, None),
        ]
    );
    assert_eq!(
        chord_tones("Em"),
        vec![(NoteName::E, None), (NoteName::G, None), (NoteName::B, None)]
    );
    assert_eq!(
        chord_tones("Bb"),
        vec![
            (NoteName::B, Some(Accidental::Flat)),
            (NoteName::D, None),
            (NoteName::F, None),
        ]
    );
}

#[test]
fn test_chord_tones_spelled_from_modal_signature() {
    use crate::note::{Accidental, NoteName};

    let sharp = |name| (name, Some(Accidental::Sharp));
    let flat = |name| (name, Some(Accidental::Flat));
    let natural = |name| (name, None);

    assert_eq!(chord_tones("Dmix"), vec![natural(NoteName::D), sharp(NoteName::F), natural(NoteName::A)]);
    assert_eq!(chord_tones("Amix"), vec![natural(NoteName::A), sharp(NoteName::C), natural(NoteName::E)]);
    assert_eq!(chord_tones("Bm"), vec![natural(NoteName::B), natural(NoteName::D), sharp(NoteName::F)]);
    assert_eq!(chord_tones("Gm"), vec![natural(NoteName::G), flat(NoteName::B), natural(NoteName::D)]);
    assert_eq!(chord_tones("Fdor"), vec![natural(NoteName::F), flat(NoteName::A), natural(NoteName::C)]);
}

#[test]
fn test_every_technique_keeps_bar_length() {
    for seed in 0..40 {
        let mut rng = rng(seed);
        for lick in LICKS {
            for technique in Technique::ALL {
                let idea = vary_phrase(technique, lick, "D", DEFAULT_ATTEMPTS, &mut rng);
                assert_eq!(
                    length_of(&idea.abc),
                    length_of(lick),
                    "{:?} on {:?} gave {:?}",
                    technique,
                    lick,
                    idea.abc
                );
            }
        }
    }
}

#[test]
fn test_unchanged_phrase_reports_original() {
    // No long notes: nothing to fill, double, slide or substitute
    for technique in [
        Technique::FillLongNotes,
        Technique::DoubleNotes,
        Technique::SlideApproach,
        Technique::ChordSubstitution,
    ] {
        let idea = vary_phrase(technique, "DED AGA", "D", DEFAULT_ATTEMPTS, &mut rng(3));
        assert_eq!(idea.abc, "DED AGA");
        assert_eq!(idea.description, format!("{} (original)", technique.label()));
    }

    // Too short to move along
    let idea = vary_phrase(Technique::MoveAlong, "d2B", "D", DEFAULT_ATTEMPTS, &mut rng(3));
    assert_eq!(idea.description, "Move along (original)");
}

#[test]
fn test_zero_attempts_returns_original() {
    let idea = vary_phrase(Technique::ChordSubstitution, "D2A", "D", 0, &mut rng(1));
    assert_eq!(idea.abc, "D2A");
    assert_eq!(idea.description, "Chord tone substitution (original)");
}

#[test]
fn test_chord_substitution_uses_chord_tones() {
    for seed in 0..20 {
        let idea = vary_phrase(Technique::ChordSubstitution, "D2", "D", 5, &mut rng(seed));
        assert!(idea.abc == "D^F" || idea.abc == "DA", "got {}", idea.abc);
        assert_eq!(idea.description, "Chord tone substitution");
    }
}

#[test]
fn test_octave_displacement_moves_one_note() {
    for seed in 0..20 {
        let idea = vary_phrase(Technique::OctaveDisplacement, "DEF", "D", 5, &mut rng(seed));
        if idea.description == "Octave displacement" {
            assert_eq!(count_changes("DEF", &idea.abc), 1);
            let moved = parse_phrase(&idea.abc);
            assert!(moved.iter().any(|n| n.pitch.ends_with('\'') || n.pitch.ends_with(',')));
        } else {
            assert_eq!(idea.abc, "DEF");
        }
    }
}

#[test]
fn test_octave_displacement_undoes_existing_marker() {
    for seed in 0..20 {
        let idea = vary_phrase(Technique::OctaveDisplacement, "d'", "D", 5, &mut rng(seed));
        assert!(["d'", "d''", "d"].contains(&idea.abc.as_str()), "got {}", idea.abc);
    }
}

#[test]
fn test_minimal_edit_is_kept() {
    let notes = parse_phrase("D2A B2A");
    let tones = chord_tones("D");
    for seed in 0..20 {
        // Replay the same draws to find the best attempt independently
        let mut replay = rng(seed);
        let fewest = (0..DEFAULT_ATTEMPTS)
            .map(|_| apply_technique(Technique::FillLongNotes, &notes, &tones, &mut replay))
            .filter(|candidate| render_phrase(candidate) != render_phrase(&notes))
            .map(|candidate| super::parse::note_changes(&notes, &candidate))
            .min();

        let idea = vary_phrase(Technique::FillLongNotes, "D2A B2A", "D", DEFAULT_ATTEMPTS, &mut rng(seed));
        match fewest {
            Some(changes) => assert_eq!(count_changes("D2A B2A", &idea.abc), changes),
            None => assert_eq!(idea.abc, "D2A B2A"),
        }
    }
}

#[test]
fn test_same_seed_same_ideas() {
    let settings = VariationSettings::default();
    let first = generate_variation_ideas("DED A2A|d2B cBA", &settings, &mut rng(42));
    let second = generate_variation_ideas("DED A2A|d2B cBA", &settings, &mut rng(42));
    assert_eq!(first, second);
}

#[test]
fn test_generated_ideas_differ_from_lick() {
    let settings = VariationSettings::default();
    for seed in 0..20 {
        let ideas = generate_variation_ideas("DED A2A|d2B cBA", &settings, &mut rng(seed));
        assert!(ideas.len() <= DEFAULT_IDEA_COUNT);
        for idea in &ideas {
            assert_ne!(idea.abc.replace(['|', ' '], ""), "DEDA2Ad2BcBA");
            let bars: Vec<&str> = idea.abc.split('|').collect();
            assert_eq!(bars.len(), 2);
            assert_eq!(length_of(bars[0]), 6);
            assert_eq!(length_of(bars[1]), 6);
        }
    }
}

#[test]
fn test_idea_count_limits_results() {
    let settings = VariationSettings {
        idea_count: 2,
        ..VariationSettings::default()
    };
    for seed in 0..10 {
        assert!(generate_variation_ideas("D2A B2A", &settings, &mut rng(seed)).len() <= 2);
    }
    assert!(generate_variation_ideas(" | ", &settings, &mut rng(0)).is_empty());
}

const JIG: &str = "X:1\nT:Test Jig\nM:6/8\nK:D\n|:DED A2A|d2B cBA|GAB d2e|fed e3|\nDED A2A|d2B cBA|GAB AFE|D3 D3:|";

fn body_bars(abc: &str) -> Vec<String> {
    crate::document::music_body(abc)
        .split('|')
        .map(str::trim)
        .filter(|bar| !bar.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_apply_without_ideas_rebuilds_tune() {
    let phrases = find_repeated_phrases(JIG, 2, 2);
    let groups = vec![IdeaGroup {
        original: "DEDA2A|d2BcBA".to_string(),
        ideas: Vec::new(),
    }];
    let applied = apply_variations_to_tune(JIG, &phrases, &groups, &mut rng(0));
    assert!(applied.variation_mapping.is_empty());
    assert_eq!(
        applied.abc,
        "X:1\nT:Test Jig\nM:6/8\nK:D\n|DEDA2A|d2BcBA|GABd2e|fede3|\n|DEDA2A|d2BcBA|GABAFE|D3D3|"
    );
}

#[test]
fn test_apply_marks_replaced_bars() {
    let phrases = find_repeated_phrases(JIG, 2, 2);
    let groups = vec![IdeaGroup {
        original: "DEDA2A|d2BcBA".to_string(),
        ideas: vec![VariationIdea {
            abc: "D3 A2A|d2B c3".to_string(),
            description: "Consolidate to long notes (needs attitude!)".to_string(),
        }],
    }];

    let mut varied_any = false;
    for seed in 0..20 {
        let applied = apply_variations_to_tune(JIG, &phrases, &groups, &mut rng(seed));
        let original = crate::repetition::extract_measures_with_durations(JIG);
        let bars = body_bars(&applied.abc);
        assert_eq!(bars.len(), original.len());

        for (i, bar) in bars.iter().enumerate() {
            match applied.variation_mapping.get(&(i + 1)) {
                Some(replacement) => {
                    assert_eq!(bar, &format!("\"^VARIED\"{}", replacement));
                    varied_any = true;
                }
                None => assert_eq!(bar, &original[i]),
            }
        }
        // Only the two occurrences (bars 1-2 and 5-6) can change
        for bar in applied.variation_mapping.keys() {
            assert!([1, 2, 5, 6].contains(bar));
        }
    }
    assert!(varied_any);
}

#[test]
fn test_vary_tune_keeps_headers() {
    let applied = vary_tune(JIG, &VariationSettings::default(), &mut rng(11));
    assert!(applied.abc.starts_with("X:1\nT:Test Jig\nM:6/8\nK:D\n|"));
    assert_eq!(body_bars(&applied.abc).len(), 8);
}
