//! Run orchestration
//!
//! A run compiles the policy's enabled rules, evaluates them in declared
//! order with per-rule failure isolation, sorts and fingerprints the findings,
//! partitions them against the baseline and emits the lifecycle events.

mod report;

use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

pub use report::{ExitStatus, Report, RunCounts, RunStatus};

use crate::baseline::Baseline;
use crate::context::Context;
use crate::errors::{ConfigurationError, RuleFailure};
use crate::events::{build_batches, EventSink, LifecycleEvent, LogSink, RunCompleted, RunStarted};
use crate::inputs::ValidationInputs;
use crate::sql::SqlCapability;
use crate::validation::{CompiledRule, LocatedResult, PolicyConfig, Rule, RuleId, Severity, Violation};

/// Symbol given to the single finding that replaces a failed rule's output
pub const INTERNAL_FAILURE_SYMBOL: &str = "internal_failure";

pub struct Engine {
    policy: PolicyConfig,
    rules: Vec<CompiledRule>,
    ctx: Context,
    event_log: LogSink,
}

impl Engine {
    /// Compile the policy; any configuration problem is returned before a run can start
    pub fn new(
        policy: PolicyConfig,
        ctx: Context,
        capability: Arc<SqlCapability>,
    ) -> Result<Self, ConfigurationError> {
        let policy = policy.resolve()?;
        let rules = CompiledRule::compile_all(&policy.rules, &capability)?;
        for rule in &rules {
            let id = rule.id();
            ctx.try_log(|logger| {
                debug!(logger, "compiled rule {} ({}): {}", id, id.category(), id.description())
            });
        }
        let event_log = LogSink::new(ctx.clone());
        Ok(Self { policy, rules, ctx, event_log })
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Evaluate every rule and return the sorted findings
    pub fn evaluate(&self, inputs: &ValidationInputs) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            let found = self.evaluate_rule(rule, inputs);
            self.ctx.try_log(|logger| {
                debug!(
                    logger,
                    "rule {} [{}] produced {} finding(s)",
                    rule.id(),
                    rule.id().category(),
                    found.len()
                )
            });
            violations.extend(found);
        }
        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        violations
    }

    fn evaluate_rule(&self, rule: &dyn Rule, inputs: &ValidationInputs) -> Vec<Violation> {
        match panic::catch_unwind(AssertUnwindSafe(|| rule.validate(inputs))) {
            Ok(results) => to_violations(rule.id(), rule.severity(), results),
            Err(payload) => {
                let failure = RuleFailure { rule: rule.id(), message: panic_message(payload.as_ref()) };
                self.ctx.try_log(|logger| warn!(logger, "{}", failure));
                vec![Violation::new(
                    failure.rule,
                    failure.rule.as_ref(),
                    INTERNAL_FAILURE_SYMBOL,
                    Severity::Error,
                    failure.to_string(),
                )]
            }
        }
    }

    /// Run the policy over `inputs`, publishing lifecycle events to `sink`
    pub fn run(
        &self,
        inputs: &ValidationInputs,
        baseline: Option<&Baseline>,
        sink: &dyn EventSink,
    ) -> Report {
        let run_id = Uuid::new_v4();
        self.publish(
            sink,
            LifecycleEvent::RunStarted(RunStarted {
                run_id,
                repo_id: self.policy.repo_id.clone(),
                root_path: self.policy.root_path.clone(),
                policy_name: self.policy.name.clone(),
                rules_enabled: self.rule_ids(),
                baseline_applied: baseline.is_some(),
                started_at: Utc::now(),
            }),
        );

        let violations = self.evaluate(inputs);
        let empty = Baseline::new();
        let baseline = baseline.unwrap_or(&empty);
        let (new, persistent) = baseline.partition(&violations);
        let fixed = baseline.fixed(&violations);
        let counts = RunCounts::from_partition(&violations, &new, fixed.len());
        let status = if counts.new_errors > 0 { RunStatus::Failed } else { RunStatus::Passed };

        for batch in build_batches(run_id, &self.policy.repo_id, &violations, self.policy.batch_size) {
            self.publish(sink, LifecycleEvent::ViolationsBatch(batch));
        }
        self.publish(sink, LifecycleEvent::RunCompleted(RunCompleted { run_id, status, counts }));

        self.ctx.try_log(|logger| {
            info!(
                logger,
                "run {} {}: {} violation(s), {} new error(s), {} baselined, {} fixed",
                run_id,
                status,
                counts.total,
                counts.new_errors,
                counts.persistent,
                counts.fixed
            )
        });

        Report {
            run_id,
            policy_name: self.policy.name.clone(),
            repo_id: self.policy.repo_id.clone(),
            status,
            violations,
            new,
            persistent,
            fixed,
            counts,
        }
    }
}

impl Engine {
    fn publish(&self, sink: &dyn EventSink, event: LifecycleEvent) {
        self.event_log.emit(&event);
        sink.emit(&event);
    }
}

/// Errors take the rule's configured severity; warnings stay warnings
fn to_violations(rule: RuleId, severity: Severity, results: Vec<LocatedResult>) -> Vec<Violation> {
    let mut violations = Vec::new();
    for located in results {
        for message in located.result.errors {
            violations.push(Violation::new(rule, &located.file_path, &located.symbol, severity, message));
        }
        for message in located.result.warnings {
            violations.push(Violation::new(
                rule,
                &located.file_path,
                &located.symbol,
                Severity::Warning,
                message,
            ));
        }
    }
    violations
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
