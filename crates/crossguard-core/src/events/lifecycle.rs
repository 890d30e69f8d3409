use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;
use uuid::Uuid;

use super::invariants::SequenceReport;
use crate::context::Context;
use crate::engine::{RunCounts, RunStatus};
use crate::validation::{RuleId, Severity, Violation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStarted {
    pub run_id: Uuid,
    pub repo_id: String,
    pub root_path: String,
    pub policy_name: String,
    pub rules_enabled: Vec<RuleId>,
    pub baseline_applied: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationPayload {
    pub severity: Severity,
    pub message: String,
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl From<&Violation> for ViolationPayload {
    fn from(violation: &Violation) -> Self {
        Self {
            severity: violation.severity,
            message: violation.message.clone(),
            rule_name: violation.rule_id.to_string(),
            fingerprint: Some(violation.fingerprint.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationsBatch {
    pub run_id: Uuid,
    pub repo_id: String,
    pub batch_index: usize,
    pub batch_size: usize,
    pub total_batches: usize,
    pub violations: Vec<ViolationPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCompleted {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub counts: RunCounts,
}

/// Everything a run publishes, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    RunStarted(RunStarted),
    ViolationsBatch(ViolationsBatch),
    RunCompleted(RunCompleted),
}

impl LifecycleEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            LifecycleEvent::RunStarted(event) => event.run_id,
            LifecycleEvent::ViolationsBatch(event) => event.run_id,
            LifecycleEvent::RunCompleted(event) => event.run_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::RunStarted(_) => "run_started",
            LifecycleEvent::ViolationsBatch(_) => "violations_batch",
            LifecycleEvent::RunCompleted(_) => "run_completed",
        }
    }
}

/// Split violations into consecutive batches of at most `batch_size`
///
/// No violations means no batches.
pub fn build_batches(
    run_id: Uuid,
    repo_id: &str,
    violations: &[Violation],
    batch_size: usize,
) -> Vec<ViolationsBatch> {
    let batch_size = batch_size.max(1);
    let total_batches = violations.len().div_ceil(batch_size);
    violations
        .chunks(batch_size)
        .enumerate()
        .map(|(batch_index, chunk)| ViolationsBatch {
            run_id,
            repo_id: repo_id.to_string(),
            batch_index,
            batch_size: chunk.len(),
            total_batches,
            violations: chunk.iter().map(ViolationPayload::from).collect(),
        })
        .collect()
}

/// Destination for lifecycle events, owned by the host
pub trait EventSink {
    fn emit(&self, event: &LifecycleEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &LifecycleEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &LifecycleEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// Writes one log line per event
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    ctx: Context,
}

impl LogSink {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl EventSink for LogSink {
    fn emit(&self, event: &LifecycleEvent) {
        self.ctx.try_log(|logger| match event {
            LifecycleEvent::RunStarted(e) => {
                info!(logger, "run {} started for policy '{}'", e.run_id, e.policy_name)
            }
            LifecycleEvent::ViolationsBatch(e) => debug!(
                logger,
                "run {} batch {}/{} ({} violations)",
                e.run_id,
                e.batch_index.saturating_add(1),
                e.total_batches,
                e.batch_size
            ),
            LifecycleEvent::RunCompleted(e) => {
                info!(logger, "run {} completed: {}", e.run_id, e.status)
            }
        });
    }
}

/// Check the emission order of one run's events
///
/// `RunStarted` comes first, batch indexes are gap-free from 0 and agree on
/// `total_batches`, batch sizes add up to the completed total, and exactly
/// one `RunCompleted` closes the stream.
pub fn validate_lifecycle_stream(events: &[LifecycleEvent]) -> SequenceReport {
    let mut violations = Vec::new();

    let Some(first) = events.first() else {
        return SequenceReport::from_violations(vec!["event stream is empty".to_string()]);
    };
    let run_id = first.run_id();
    if !matches!(first, LifecycleEvent::RunStarted(_)) {
        violations.push(format!("run {}: first event is {}, expected run_started", run_id, first.name()));
    }

    let mut expected_index = 0usize;
    let mut total_batches: Option<usize> = None;
    let mut batched = 0usize;
    let mut seen_indexes = BTreeSet::new();
    let mut completed: Vec<(usize, &RunCompleted)> = Vec::new();

    for (position, event) in events.iter().enumerate() {
        if event.run_id() != run_id {
            violations.push(format!(
                "event {} ({}) belongs to run {}, expected {}",
                position,
                event.name(),
                event.run_id(),
                run_id
            ));
            continue;
        }
        match event {
            LifecycleEvent::RunStarted(_) if position > 0 => {
                violations.push(format!("run {}: duplicate run_started at position {}", run_id, position));
            }
            LifecycleEvent::RunStarted(_) => {}
            LifecycleEvent::ViolationsBatch(batch) => {
                if !completed.is_empty() {
                    violations.push(format!(
                        "run {}: batch {} emitted after run_completed",
                        run_id, batch.batch_index
                    ));
                }
                if !seen_indexes.insert(batch.batch_index) {
                    violations.push(format!("run {}: duplicate batch_index {}", run_id, batch.batch_index));
                } else if batch.batch_index != expected_index {
                    violations.push(format!(
                        "run {}: batch_index {} out of order, expected {}",
                        run_id, batch.batch_index, expected_index
                    ));
                }
                if batch.batch_index >= batch.total_batches {
                    violations.push(format!(
                        "run {}: batch_index {} out of range for total_batches {}",
                        run_id, batch.batch_index, batch.total_batches
                    ));
                }
                expected_index = batch.batch_index.saturating_add(1);
                match total_batches {
                    None => total_batches = Some(batch.total_batches),
                    Some(total) if total != batch.total_batches => violations.push(format!(
                        "run {}: batch {} declares total_batches {}, earlier batches declared {}",
                        run_id, batch.batch_index, batch.total_batches, total
                    )),
                    Some(_) => {}
                }
                if batch.batch_size != batch.violations.len() {
                    violations.push(format!(
                        "run {}: batch {} declares batch_size {} but carries {} violations",
                        run_id,
                        batch.batch_index,
                        batch.batch_size,
                        batch.violations.len()
                    ));
                }
                batched = batched.saturating_add(batch.batch_size);
            }
            LifecycleEvent::RunCompleted(done) => completed.push((position, done)),
        }
    }

    let total_batches = total_batches.unwrap_or(0);
    if seen_indexes.len() != total_batches || seen_indexes.iter().any(|index| *index >= total_batches) {
        violations.push(format!(
            "run {}: batch indexes {:?} do not cover 0..{}",
            run_id, seen_indexes, total_batches
        ));
    }

    match completed.as_slice() {
        [] => violations.push(format!("run {}: missing run_completed", run_id)),
        [(position, done)] => {
            if *position != events.len() - 1 {
                violations.push(format!("run {}: run_completed is not the last event", run_id));
            }
            if done.counts.total != batched {
                violations.push(format!(
                    "run {}: batches carry {} violations but run_completed reports {}",
                    run_id, batched, done.counts.total
                ));
            }
        }
        _ => violations.push(format!(
            "run {}: run_completed emitted {} times",
            run_id,
            completed.len()
        )),
    }

    SequenceReport::from_violations(violations)
}
