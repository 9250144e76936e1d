//! # Key Signatures
//!
//! Maps key labels as they appear in `K:` headers (`G`, `Dmaj`, `Ador`, `F#min`) to a
//! semitone offset 0-11 above C. The offset is the tonic's pitch class: modal
//! qualifiers (`dor`, `mix`, `min`) only change the text carried in the header, never
//! the transposition arithmetic.
//!
//! Mode names are case-insensitive and only their first three letters count, as in
//! ABC itself: `Bmix`, `BMix` and `B mixolydian` all resolve to B. Only a label whose
//! tonic can't be read falls back to `("C", 0)`.

use crate::note::NoteName;

/// Label → tonic offset. Exact labels are tried first by [`parse_key`].
const KEY_TABLE: &[(&str, i32)] = &[
    // Major, bare and with "maj"
    ("C", 0), ("Cmaj", 0),
    ("G", 7), ("Gmaj", 7),
    ("D", 2), ("Dmaj", 2),
    ("A", 9), ("Amaj", 9),
    ("E", 4), ("Emaj", 4),
    ("B", 11), ("Bmaj", 11),
    ("F#", 6), ("F#maj", 6),
    ("C#", 1), ("C#maj", 1),
    ("F", 5), ("Fmaj", 5),
    ("Bb", 10), ("Bbmaj", 10),
    ("Eb", 3), ("Ebmaj", 3),
    ("Ab", 8), ("Abmaj", 8),
    ("Db", 1), ("Dbmaj", 1),
    ("Gb", 6), ("Gbmaj", 6),
    // Minor
    ("Amin", 9), ("Am", 9),
    ("Emin", 4), ("Em", 4),
    ("Bmin", 11), ("Bm", 11),
    ("F#min", 6), ("F#m", 6),
    ("C#min", 1), ("C#m", 1),
    ("G#min", 8), ("G#m", 8),
    ("D#min", 3), ("D#m", 3),
    ("Dmin", 2), ("Dm", 2),
    ("Gmin", 7), ("Gm", 7),
    ("Cmin", 0), ("Cm", 0),
    ("Fmin", 5), ("Fm", 5),
    ("Bbmin", 10), ("Bbm", 10),
];

/// Mode names and how far each moves the key signature round the circle of fifths
/// from the tonic's major key (dorian on D shares C major's signature: -2).
const MODES: &[(&str, i32)] = &[
    ("major", 0),
    ("ionian", 0),
    ("minor", -3),
    ("aeolian", -3),
    ("dorian", -2),
    ("phrygian", -4),
    ("lydian", 1),
    ("mixolydian", -1),
    ("locrian", -5),
];

/// Suffixes that only restate "major" and can be dropped before a second lookup.
const MAJOR_SUFFIXES: &[&str] = &["major", "maj"];

/// Major keys on the sharp side of the circle of fifths.
const SHARP_SIDE_MAJORS: &[&str] = &[
    "G", "D", "A", "E", "B", "F#", "C#",
    "Gmaj", "Dmaj", "Amaj", "Emaj", "Bmaj", "F#maj", "C#maj",
];

/// A resolved key: the canonical label and its tonic offset above C.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub offset: i32,
}

impl Default for Key {
    fn default() -> Self {
        Self {
            name: "C".to_string(),
            offset: 0,
        }
    }
}

fn mode_fifths(mode: &str) -> Option<i32> {
    match mode {
        "" => Some(0),
        "m" => Some(-3),
        _ => {
            let prefix = mode.get(..3)?;
            MODES
                .iter()
                .find(|(name, _)| name.starts_with(prefix))
                .map(|(_, fifths)| *fifths)
        }
    }
}

// Position of each natural letter's major key on the circle of fifths
fn letter_fifths(name: NoteName) -> i32 {
    match name {
        NoteName::F => -1,
        NoteName::C => 0,
        NoteName::G => 1,
        NoteName::D => 2,
        NoteName::A => 3,
        NoteName::E => 4,
        NoteName::B => 5,
    }
}

/// A label read as tonic letter, optional `#`/`b`, and mode
struct SpelledKey {
    tonic: NoteName,
    alteration: i32,
    mode_fifths: i32,
}

impl SpelledKey {
    fn parse(label: &str) -> Option<Self> {
        let mut chars = label.chars();
        let letter = chars.next().filter(char::is_ascii_uppercase)?;
        let (tonic, _) = NoteName::from_char(letter)?;

        let rest = chars.as_str();
        let (alteration, rest) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };

        // Anything after the mode word (clefs, transpose hints) is ignored
        let mode = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        Some(Self {
            tonic,
            alteration,
            mode_fifths: mode_fifths(&mode)?,
        })
    }

    fn offset(&self) -> i32 {
        (self.tonic.pitch_class() + self.alteration).rem_euclid(12)
    }

    fn sharps(&self) -> i32 {
        letter_fifths(self.tonic) + 7 * self.alteration + self.mode_fifths
    }
}

fn lookup(label: &str) -> Option<i32> {
    KEY_TABLE
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, offset)| *offset)
}

/// Parse a key label into `(canonical_name, offset)`.
///
/// Lookup order:
/// 1. exact label (`Dmaj`, `Ador`, `F#min`)
/// 2. label with a trailing major suffix removed (`Bbmajor` → `Bb`)
/// 3. tonic plus any mode name (`Bmix`, `F#Dor`, `Eb lydian`)
/// 4. fallback to `("C", 0)`
///
/// # Examples
/// ```
/// use ceol::key::parse_key;
///
/// assert_eq!(parse_key("Dmaj").offset, 2);
/// assert_eq!(parse_key(" G ").name, "G");
/// assert_eq!(parse_key("Bmix").offset, 11);
/// assert_eq!(parse_key("Xyz").name, "C");
/// ```
pub fn parse_key(label: &str) -> Key {
    let label = label.trim();

    if let Some(offset) = lookup(label) {
        return Key {
            name: label.to_string(),
            offset,
        };
    }

    for suffix in MAJOR_SUFFIXES {
        if let Some(base) = label.strip_suffix(suffix) {
            if let Some(offset) = lookup(base) {
                return Key {
                    name: base.to_string(),
                    offset,
                };
            }
        }
    }

    if let Some(spelled) = SpelledKey::parse(label) {
        return Key {
            name: label.to_string(),
            offset: spelled.offset(),
        };
    }

    // Unknown labels are treated as C
    log::debug!("unknown key label {:?}, treating as C", label);
    Key::default()
}

/// Semitone interval from one key label to another, taken literally (not folded
/// into ±6), so `C` → `B` is +11 and `B` → `C` is -11.
pub fn interval_between(from: &str, to: &str) -> i32 {
    parse_key(to).offset - parse_key(from).offset
}

/// Whether notes transposed into `destination` should be spelled with sharps.
pub fn prefers_sharps(destination: &str) -> bool {
    destination.contains('#') || SHARP_SIDE_MAJORS.contains(&destination)
}

/// Sharps (positive) or flats (negative) in the key signature of `label`, taking
/// the mode into account: `Dmix` has one sharp, `Gm` two flats. Unreadable labels
/// count as C (none).
pub fn key_signature(label: &str) -> i32 {
    SpelledKey::parse(label.trim()).map_or(0, |spelled| spelled.sharps())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_labels() {
        assert_eq!(parse_key("G"), Key { name: "G".to_string(), offset: 7 });
        assert_eq!(parse_key("Dmaj").offset, 2);
        assert_eq!(parse_key("Bbmin").offset, 10);
        assert_eq!(parse_key("F#min").offset, 6);
    }

    #[test]
    fn test_mode_does_not_change_offset() {
        assert_eq!(parse_key("Ador").offset, parse_key("A").offset);
        assert_eq!(parse_key("Edor").offset, parse_key("Em").offset);
        assert_eq!(parse_key("Dmix").offset, parse_key("Dmaj").offset);
    }

    #[test]
    fn test_every_tonic_with_modes() {
        let tonics = [
            "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#", "Ab", "A",
            "A#", "Bb", "B",
        ];
        for tonic in tonics {
            let expected = SpelledKey::parse(tonic).unwrap().offset();
            for mode in ["mix", "dor", "Mix", "DOR", "mixolydian", "phr", "lyd", "loc", "aeo"] {
                let label = format!("{}{}", tonic, mode);
                assert_eq!(parse_key(&label).offset, expected, "{}", label);
            }
        }
        assert_eq!(parse_key("Bmix").offset, 11);
        assert_eq!(parse_key("Fdor").offset, 5);
        assert_eq!(parse_key("ADor").offset, 9);
        assert_eq!(parse_key("A dorian").offset, 9);
        assert_eq!(parse_key("Fmix"), Key { name: "Fmix".to_string(), offset: 5 });
    }

    #[test]
    fn test_unreadable_mode_falls_back_to_c() {
        assert_eq!(parse_key("Bxy"), Key::default());
        assert_eq!(parse_key("Dmi"), Key::default());
        assert_eq!(parse_key("dor"), Key::default());
    }

    #[test]
    fn test_key_signature_counts_mode() {
        assert_eq!(key_signature("D"), 2);
        assert_eq!(key_signature("Dmix"), 1);
        assert_eq!(key_signature("Ador"), 1);
        assert_eq!(key_signature("Bm"), 2);
        assert_eq!(key_signature("Gm"), -2);
        assert_eq!(key_signature("Fdor"), -3);
        assert_eq!(key_signature("Gb"), -6);
        assert_eq!(key_signature("F#min"), 3);
        assert_eq!(key_signature("Am"), 0);
        assert_eq!(key_signature("Xyz"), 0);
    }

    #[test]
    fn test_major_suffix_stripped() {
        assert_eq!(parse_key("Gbmajor"), Key { name: "Gb".to_string(), offset: 6 });
    }

    #[test]
    fn test_unknown_label_falls_back_to_c() {
        assert_eq!(parse_key("Xyz"), Key { name: "C".to_string(), offset: 0 });
        assert_eq!(parse_key("Hphr"), Key::default());
        assert_eq!(parse_key(""), Key::default());
    }

    #[test]
    fn test_interval_not_folded() {
        assert_eq!(interval_between("G", "D"), -5);
        assert_eq!(interval_between("D", "G"), 5);
        assert_eq!(interval_between("C", "B"), 11);
        assert_eq!(interval_between("Dmaj", "Dmaj"), 0);
    }

    #[test]
    fn test_sharp_preference() {
        assert!(prefers_sharps("D"));
        assert!(prefers_sharps("Emaj"));
        assert!(prefers_sharps("F#min"));
        assert!(!prefers_sharps("F"));
        assert!(!prefers_sharps("Bb"));
        // Minor and modal labels without '#' are not on the sharp list
        assert!(!prefers_sharps("Ador"));
    }
}
