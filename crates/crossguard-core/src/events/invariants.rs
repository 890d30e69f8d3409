//! Validation/merge lifecycle state machine
//!
//! `STARTED -> {PASSED | FAILED} -> MERGE_STARTED -> MERGE_COMPLETED`, tracked
//! per run id. Checks are pure: histories are only read.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

use super::lifecycle::LifecycleEvent;
use crate::engine::RunStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractEventKind {
    Started,
    Passed,
    Failed,
    MergeStarted,
    MergeCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub run_id: String,
    pub kind: ContractEventKind,
}

impl ContractEvent {
    pub fn new(run_id: impl Into<String>, kind: ContractEventKind) -> Self {
        Self { run_id: run_id.into(), kind }
    }

    /// Project an emitted lifecycle event onto the state machine
    ///
    /// Batches carry no state transition and map to `None`.
    pub fn from_lifecycle(event: &LifecycleEvent) -> Option<Self> {
        let kind = match event {
            LifecycleEvent::RunStarted(_) => ContractEventKind::Started,
            LifecycleEvent::ViolationsBatch(_) => return None,
            LifecycleEvent::RunCompleted(done) => match done.status {
                RunStatus::Passed => ContractEventKind::Passed,
                RunStatus::Failed => ContractEventKind::Failed,
            },
        };
        Some(Self::new(event.run_id().to_string(), kind))
    }
}

/// An event that breaks the lifecycle rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub run_id: String,
    pub event: ContractEventKind,
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    pub is_valid: bool,
    pub violations: Vec<String>,
}

impl SequenceReport {
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self { is_valid: violations.is_empty(), violations }
    }
}

/// Check one incoming event against everything observed before it
pub fn check_invariant(
    event: &ContractEvent,
    history: &[ContractEvent],
) -> Result<(), InvariantViolation> {
    let seen = |kind: ContractEventKind| {
        history.iter().any(|prior| prior.run_id == event.run_id && prior.kind == kind)
    };
    let violation = |message: String| InvariantViolation {
        run_id: event.run_id.clone(),
        event: event.kind,
        message,
    };

    match event.kind {
        ContractEventKind::Started => Ok(()),
        ContractEventKind::Passed | ContractEventKind::Failed => {
            if !seen(ContractEventKind::Started) {
                return Err(violation(format!(
                    "run {}: {} observed before STARTED",
                    event.run_id, event.kind
                )));
            }
            let other = if event.kind == ContractEventKind::Passed {
                ContractEventKind::Failed
            } else {
                ContractEventKind::Passed
            };
            if seen(other) {
                return Err(violation(format!(
                    "run {}: PASSED and FAILED are mutually exclusive ({} observed after {})",
                    event.run_id, event.kind, other
                )));
            }
            Ok(())
        }
        ContractEventKind::MergeStarted => Ok(()),
        ContractEventKind::MergeCompleted => {
            if seen(ContractEventKind::Failed) {
                return Err(violation(format!(
                    "run {}: MERGE_COMPLETED observed after FAILED",
                    event.run_id
                )));
            }
            if !seen(ContractEventKind::MergeStarted) {
                return Err(violation(format!(
                    "run {}: MERGE_COMPLETED observed before MERGE_STARTED",
                    event.run_id
                )));
            }
            Ok(())
        }
    }
}

/// Check a whole ordered history, reporting every offending event
pub fn validate_sequence(events: &[ContractEvent]) -> SequenceReport {
    let violations = events
        .iter()
        .enumerate()
        .filter_map(|(i, event)| check_invariant(event, &events[..i]).err())
        .map(|violation| violation.message)
        .collect();
    SequenceReport::from_violations(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ContractEventKind::*;

    fn events(run_id: &str, kinds: &[ContractEventKind]) -> Vec<ContractEvent> {
        kinds.iter().map(|kind| ContractEvent::new(run_id, *kind)).collect()
    }

    #[test]
    fn test_happy_path() {
        let report = validate_sequence(&events("R", &[Started, Passed, MergeStarted, MergeCompleted]));
        assert!(report.is_valid, "{:?}", report.violations);
    }

    #[test]
    fn test_passed_then_failed_is_rejected() {
        let report = validate_sequence(&events("R", &[Started, Passed, Failed]));
        assert!(!report.is_valid);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("mutually exclusive"));
        assert!(report.violations[0].contains("run R"));
    }

    #[test]
    fn test_outcome_before_started_is_rejected() {
        let err = check_invariant(&ContractEvent::new("R", Failed), &[]).unwrap_err();
        assert_eq!(err.event, Failed);
        assert!(err.message.contains("before STARTED"));
    }

    #[test]
    fn test_merge_rules() {
        let report = validate_sequence(&events("R", &[Started, Passed, MergeCompleted]));
        assert!(report.violations[0].contains("before MERGE_STARTED"));

        let report = validate_sequence(&events("R", &[Started, Failed, MergeStarted, MergeCompleted]));
        assert!(report.violations[0].contains("after FAILED"));
    }

    #[test]
    fn test_runs_are_tracked_independently() {
        let mut history = events("A", &[Started, Passed]);
        history.extend(events("B", &[Started, Failed]));
        assert!(validate_sequence(&history).is_valid);

        assert!(check_invariant(&ContractEvent::new("C", Passed), &history).is_err());
    }

    #[test]
    fn test_history_is_not_mutated() {
        let history = events("R", &[Started]);
        let before = history.clone();
        let _ = check_invariant(&ContractEvent::new("R", Passed), &history);
        assert_eq!(history, before);
    }
}
