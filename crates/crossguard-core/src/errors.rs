//! Error types for the validation engine
//!
//! Only configuration problems discovered before a run starts are fatal.
//! Everything found during a run (including SQL that cannot be parsed and
//! failures inside a single rule) is reported as a violation instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::validation::RuleId;

/// Fatal problems with the policy or baseline, raised before any event is emitted
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Policy file could not be read
    #[error("Failed to read policy file {path}: {source}")]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Policy file is not valid YAML or does not match the policy schema
    #[error("Failed to parse policy: {0}")]
    PolicyParse(String),

    /// `extends` names a preset that does not exist
    #[error("Unknown policy preset '{0}'")]
    UnknownPreset(String),

    /// A rule parameter holds a pattern that does not compile
    #[error("Rule '{rule}' has an invalid pattern '{pattern}': {message}")]
    InvalidPattern { rule: RuleId, pattern: String, message: String },

    /// A rule parameter is structurally wrong
    #[error("Rule '{rule}' is misconfigured: {message}")]
    InvalidRule { rule: RuleId, message: String },

    /// Events must be batched in groups of at least one violation
    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    /// Baseline file could not be read or written
    #[error("Failed to access baseline file {path}: {source}")]
    BaselineIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Baseline file is not valid JSON or does not match the baseline schema
    #[error("Failed to parse baseline: {0}")]
    BaselineParse(String),

    /// A baseline entry is not a 16 character lowercase hex fingerprint
    #[error("Invalid fingerprint '{0}' in baseline: expected 16 lowercase hex characters")]
    InvalidFingerprint(String),
}

/// A rule that panicked while evaluating
///
/// The engine converts this into one `ERROR` violation scoped to the rule and
/// keeps running the remaining rules.
#[derive(Debug, Error)]
#[error("rule '{rule}' panicked: {message}")]
pub struct RuleFailure {
    pub rule: RuleId,
    pub message: String,
}
