//! Error types for tagprune core operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tagprune core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An image record from the registry is missing a required field.
    #[error("Invalid image record: {reason}")]
    InvalidRecord {
        /// What is wrong with the record.
        reason: String,
    },

    /// A rule pattern is not a valid regular expression.
    #[error("Invalid pattern for rule '{rule}': {source}")]
    InvalidPattern {
        /// Name of the offending rule.
        rule: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A rule definition is malformed.
    #[error("Invalid rule: {reason}")]
    InvalidRule {
        /// Reason the rule is invalid.
        reason: String,
    },

    /// A rule file could not be read.
    #[error("Failed to read rule file {path}: {source}")]
    RuleFile {
        /// Path to the rule file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A rule file could not be decoded.
    #[error("Failed to parse rule file {path}: {reason}")]
    RuleParse {
        /// Path to the rule file.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },
}
