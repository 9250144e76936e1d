pub mod config;
pub mod document;
pub mod error;
pub mod key;
pub mod note;
pub mod octave;
pub mod repetition;
pub mod settings;
pub mod transformer;
pub mod transpose;
pub mod variation;

pub use config::Config;
pub use document::AbcDocument;
pub use error::*;
pub use key::{parse_key, Key};
pub use note::{decode, encode};
pub use octave::{correct_octave_register, OctaveCorrector};
pub use repetition::{detect_repetition, RepetitionReport};
pub use transpose::{average_pitch, shift_octave, transpose, transpose_document};

/// Split a tune into headers and body.
/// Fails when it has no `K:` header; the musical operations never do.
pub fn parse(abc: &str) -> Result<AbcDocument, CeolError> {
    AbcDocument::parse(abc)
}
