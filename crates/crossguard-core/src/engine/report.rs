use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::errors::ConfigurationError;
use crate::validation::Violation;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

/// Aggregate counts carried by the report and `RunCompleted`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub new: usize,
    pub new_errors: usize,
    pub persistent: usize,
    pub fixed: usize,
}

impl RunCounts {
    pub fn from_partition(all: &[Violation], new: &[Violation], fixed: usize) -> Self {
        let errors = all.iter().filter(|v| v.is_error()).count();
        Self {
            total: all.len(),
            errors,
            warnings: all.len() - errors,
            new: new.len(),
            new_errors: new.iter().filter(|v| v.is_error()).count(),
            persistent: all.len() - new.len(),
            fixed,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub policy_name: String,
    pub repo_id: String,
    pub status: RunStatus,
    /// Every violation, in report order
    pub violations: Vec<Violation>,
    pub new: Vec<Violation>,
    pub persistent: Vec<Violation>,
    /// Baseline fingerprints no longer produced
    pub fixed: Vec<String>,
    pub counts: RunCounts,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    pub fn exit_status(&self) -> ExitStatus {
        match self.status {
            RunStatus::Passed => ExitStatus::Passed,
            RunStatus::Failed => ExitStatus::Failed,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Process exit codes for the command-line collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ExitStatus {
    Passed = 0,
    Failed = 1,
    InternalError = 2,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_outcome(outcome: &Result<Report, ConfigurationError>) -> Self {
        match outcome {
            Ok(report) => report.exit_status(),
            Err(_) => ExitStatus::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{RuleId, Severity};

    #[test]
    fn test_counts() {
        let error = Violation::new(RuleId::TopicNaming, "a", "x", Severity::Error, "e");
        let warning = Violation::new(RuleId::TopicNaming, "a", "y", Severity::Warning, "w");
        let counts = RunCounts::from_partition(&[error.clone(), warning.clone()], &[warning], 3);
        assert_eq!(counts.total, 2);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.warnings, 1);
        assert_eq!(counts.new, 1);
        assert_eq!(counts.new_errors, 0);
        assert_eq!(counts.persistent, 1);
        assert_eq!(counts.fixed, 3);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Passed.code(), 0);
        assert_eq!(ExitStatus::Failed.code(), 1);
        assert_eq!(ExitStatus::InternalError.code(), 2);

        let outcome: Result<Report, ConfigurationError> = Err(ConfigurationError::InvalidBatchSize(0));
        assert_eq!(ExitStatus::from_outcome(&outcome), ExitStatus::InternalError);
    }
}
