//! # Error Types
//!
//! This module defines all error types for the ceol library.
//!
//! Most musical operations in this crate never fail: a tune without a `K:` header,
//! a note-count mismatch or an undecodable token all degrade to "return the input
//! unchanged". The variants below cover the few places where a caller asked for
//! something strict (splitting a document, decoding a single token) or where an
//! outside collaborator is involved.
//!
//! ## Error Types
//! - `MissingKeyHeader` - strict document split on text with no `K:` line
//! - `InvalidNote` - a note letter outside A-G / a-g
//! - `ConfigError` - invalid YAML configuration
//! - `InvalidArgument` - a command-line value out of range
//! - `TransformerUnavailable` / `TransformerError` - the external text transformer
//! - `ArchiveError` - the tune archive collaborator
//! - `Io` - file access from the command line
//! - `Yaml` - writing a report as YAML
//!
//! ## Usage
//! ```rust
//! use ceol::{AbcDocument, CeolError};
//!
//! match AbcDocument::parse("T:Untitled\nABC") {
//!     Ok(doc) => println!("body: {}", doc.body),
//!     Err(CeolError::MissingKeyHeader) => eprintln!("no K: line"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CeolError {
    /// The document has no `K:` line, so headers and body cannot be separated.
    ///
    /// # Example
    /// ```
    /// # use ceol::CeolError;
    /// let err = CeolError::MissingKeyHeader;
    /// assert_eq!(err.to_string(), "Invalid ABC notation: no K: header found");
    /// ```
    #[error("Invalid ABC notation: no K: header found")]
    MissingKeyHeader,

    /// A note token whose letter is not A-G or a-g.
    ///
    /// # Example
    /// ```
    /// # use ceol::CeolError;
    /// let err = CeolError::InvalidNote { token: "^H".to_string() };
    /// assert_eq!(err.to_string(), "Invalid note token '^H'");
    /// ```
    #[error("Invalid note token '{token}'")]
    InvalidNote { token: String },

    /// Invalid configuration file or value.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A value given on the command line that can't be used.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No external text transformer was configured for this process.
    #[error("Text transformer not available")]
    TransformerUnavailable,

    /// The external text transformer failed or returned something unusable.
    #[error("Text transformer failed: {0}")]
    TransformerError(String),

    /// The tune archive could not be read.
    #[error("Tune archive failed: {0}")]
    ArchiveError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_error_is_not_a_config_error() {
        let yaml_err = serde_yaml::from_str::<u32>("[1, 2").unwrap_err();
        let err = CeolError::from(yaml_err);
        assert!(matches!(err, CeolError::Yaml(_)));
        assert!(err.to_string().starts_with("YAML output failed: "));
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = CeolError::InvalidArgument("octaves must be an integer, got 'x'".to_string());
        assert_eq!(err.to_string(), "Invalid argument: octaves must be an integer, got 'x'");
    }
}
