//! Previously acknowledged violations, identified by fingerprint
//!
//! The file is either a bare JSON array of fingerprints or a versioned
//! document whose entries may carry rule, file and symbol for auditing.
//! Only the fingerprint takes part in matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::errors::ConfigurationError;
use crate::fingerprint::is_valid_fingerprint;
use crate::validation::Violation;

pub const BASELINE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl BaselineEntry {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self { fingerprint: fingerprint.into(), rule_id: None, file_path: None, symbol: None }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BaselineFile {
    Bare(Vec<String>),
    Versioned { version: u32, entries: Vec<BaselineEntry> },
}

#[derive(Serialize)]
struct VersionedBaselineRef<'a> {
    version: u32,
    entries: &'a [BaselineEntry],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    fingerprints: BTreeSet<String>,
    entries: Vec<BaselineEntry>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<BaselineEntry>) -> Result<Self, ConfigurationError> {
        let mut baseline = Baseline::new();
        for entry in entries {
            if !is_valid_fingerprint(&entry.fingerprint) {
                return Err(ConfigurationError::InvalidFingerprint(entry.fingerprint));
            }
            if baseline.fingerprints.insert(entry.fingerprint.clone()) {
                baseline.entries.push(entry);
            }
        }
        Ok(baseline)
    }

    pub fn from_fingerprints<I, S>(fingerprints: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_entries(fingerprints.into_iter().map(BaselineEntry::new).collect())
    }

    /// Acknowledge every violation of a run, keeping audit metadata
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut baseline = Baseline::new();
        for violation in violations {
            if baseline.fingerprints.insert(violation.fingerprint.clone()) {
                baseline.entries.push(BaselineEntry {
                    fingerprint: violation.fingerprint.clone(),
                    rule_id: Some(violation.rule_id.to_string()),
                    file_path: Some(violation.file_path.clone()),
                    symbol: Some(violation.symbol.clone()),
                });
            }
        }
        baseline
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let file: BaselineFile = serde_json::from_str(content)
            .map_err(|e| ConfigurationError::BaselineParse(e.to_string()))?;
        match file {
            BaselineFile::Bare(fingerprints) => Self::from_fingerprints(fingerprints),
            BaselineFile::Versioned { version, entries } => {
                if version != BASELINE_VERSION {
                    return Err(ConfigurationError::BaselineParse(format!(
                        "unsupported baseline version {} (expected {})",
                        version, BASELINE_VERSION
                    )));
                }
                Self::from_entries(entries)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::BaselineIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Versioned JSON with entries sorted by fingerprint
    pub fn to_json_string(&self) -> Result<String, ConfigurationError> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        serde_json::to_string_pretty(&VersionedBaselineRef { version: BASELINE_VERSION, entries: &entries })
            .map_err(|e| ConfigurationError::BaselineParse(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        let content = self.to_json_string()?;
        fs::write(path, content).map_err(|source| ConfigurationError::BaselineIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    /// Split a run's violations into `(new, persistent)`, preserving order
    pub fn partition(&self, violations: &[Violation]) -> (Vec<Violation>, Vec<Violation>) {
        let (persistent, new) =
            violations.iter().cloned().partition(|violation| self.contains(&violation.fingerprint));
        (new, persistent)
    }

    /// Fingerprints in the baseline that no violation of this run carries
    pub fn fixed(&self, violations: &[Violation]) -> Vec<String> {
        let seen: BTreeSet<&str> = violations.iter().map(|v| v.fingerprint.as_str()).collect();
        self.fingerprints.iter().filter(|fp| !seen.contains(fp.as_str())).cloned().collect()
    }
}
