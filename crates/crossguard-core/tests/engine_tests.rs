use crossguard_core::engine::{ExitStatus, RunStatus};
use crossguard_core::events::NoopSink;
use crossguard_core::{Baseline, RuleId, Severity};
use crossguard_test_utils::{
    assert_clean, assert_violation, assert_violation_message, DbContractBuilder, InputsBuilder,
    PolicyBuilder,
};

fn users_contract() -> crossguard_core::inputs::DbRepositoryContract {
    DbContractBuilder::new(&["users"])
        .read_op("get_user", "SELECT id, name FROM users WHERE id = $1", &["id", "name"])
        .build()
}

#[test]
fn clean_db_contract_passes() {
    let engine = PolicyBuilder::new("db").db_rules().engine();
    let inputs = InputsBuilder::new().db_contract("db/users.yml", users_contract()).build();

    let report = engine.run(&inputs, None, &NoopSink);
    assert_clean!(report);
    assert_eq!(report.status, RunStatus::Passed);
    assert_eq!(report.exit_status(), ExitStatus::Passed);
}

#[test]
fn cte_is_never_silently_accepted() {
    let contract = DbContractBuilder::new(&["t", "users"])
        .read_op("recent", "WITH t AS (SELECT 1) SELECT * FROM t", &["id"])
        .build();
    let engine = PolicyBuilder::new("db").db_rules().engine();
    let report = engine.run(&InputsBuilder::new().db_contract("db/t.yml", contract).build(), None, &NoopSink);

    assert_violation!(report, RuleId::DbTableAccess, "recent");
    assert_violation_message!(report, "CTE");
    assert_eq!(report.status, RunStatus::Failed);
}

#[test]
fn select_star_fails_in_default_strict_mode() {
    let contract = DbContractBuilder::new(&["users"])
        .read_op("list_users", "SELECT * FROM users", &["id", "name"])
        .build();
    let engine = PolicyBuilder::new("db").db_rules().engine();
    let report = engine.run(&InputsBuilder::new().db_contract("db/u.yml", contract).build(), None, &NoopSink);

    let projection: Vec<_> =
        report.violations.iter().filter(|v| v.rule_id == RuleId::DbProjection).collect();
    assert_eq!(projection.len(), 1);
    assert_eq!(projection[0].severity, Severity::Error);
    assert!(projection[0].message.contains("SELECT * is not allowed in strict mode"));
}

#[test]
fn regex_only_capability_applies_the_same_policy() {
    let contract = DbContractBuilder::new(&["users"])
        .read_op("joined", "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id", &["id"])
        .build();
    let engine = PolicyBuilder::new("db").db_rules().regex_only().engine();
    let report = engine.run(&InputsBuilder::new().db_contract("db/u.yml", contract).build(), None, &NoopSink);

    assert_violation!(report, RuleId::DbTableAccess, "joined");
    assert_violation_message!(report, "'orders'");
}

#[test]
fn warnings_and_baselined_errors_do_not_fail_the_run() {
    let engine = PolicyBuilder::new("mixed").forbid_imports(&["^subprocess$"]).topic_naming().engine();
    let inputs = InputsBuilder::new()
        .import("app", "src/run.py", "subprocess")
        .topic("topics.yml", "payments.invoice_created.v1")
        .build();

    let first = engine.run(&inputs, None, &NoopSink);
    assert_eq!(first.status, RunStatus::Failed);
    assert_eq!(first.counts.new_errors, 1);

    let baseline = Baseline::from_violations(&first.violations);
    let second = engine.run(&inputs, Some(&baseline), &NoopSink);
    assert_eq!(second.status, RunStatus::Passed);
    assert_eq!(second.persistent.len(), 1);
    assert!(second.new.is_empty());
    assert!(second.fixed.is_empty());

    let fixed_inputs = InputsBuilder::new().topic("topics.yml", "payments.invoice_created.v1").build();
    let third = engine.run(&fixed_inputs, Some(&baseline), &NoopSink);
    assert_eq!(third.fixed, vec![first.violations[0].fingerprint.clone()]);
}

#[test]
fn warning_severity_rule_never_fails_the_run() {
    let mut policy = PolicyBuilder::new("soft").forbid_imports(&["^pickle$"]).build();
    if let Some(config) = policy.rules.forbidden_imports.as_mut() {
        config.common.severity = Severity::Warning;
    }
    let engine = crossguard_core::Engine::new(
        policy,
        crossguard_core::Context::empty(),
        std::sync::Arc::new(crossguard_core::sql::SqlCapability::detect()),
    )
    .unwrap();
    let report = engine.run(&InputsBuilder::new().import("app", "a.py", "pickle").build(), None, &NoopSink);
    assert_eq!(report.counts.warnings, 1);
    assert_eq!(report.status, RunStatus::Passed);
}

#[test]
fn reports_are_deterministic_across_runs() {
    let engine = PolicyBuilder::new("all")
        .forbid_imports(&["^subprocess$", "^os\\.system$"])
        .topic_naming()
        .forbid_raises(&["Exception"])
        .require_fields(&["name", "version"])
        .db_rules()
        .engine();
    let inputs = InputsBuilder::new()
        .import("app", "src/b.py", "os.system")
        .import("app", "src/a.py", "subprocess")
        .topic("topics.yml", "BadTopic")
        .raise("src/a.py", "Exception")
        .contract("contracts/c.yml", "c", serde_json::json!({"name": "c"}))
        .db_contract("db/users.yml", users_contract())
        .build();

    let first = engine.run(&inputs, None, &NoopSink);
    let second = engine.run(&inputs, None, &NoopSink);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.violations, second.violations);

    let order: Vec<RuleId> = first.violations.iter().map(|v| v.rule_id).collect();
    let mut sorted = order.clone();
    sorted.sort_by_key(|id| id.declared_index());
    assert_eq!(order, sorted);
    assert_eq!(first.violations[0].file_path, "src/a.py");
}

#[test]
fn report_serializes_to_json() {
    let engine = PolicyBuilder::new("json").topic_naming().engine();
    let report = engine.run(&InputsBuilder::new().topic("t.yml", "Nope").build(), None, &NoopSink);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["violations"][0]["rule_id"], "topic_naming");
    assert_eq!(json["violations"][0]["fingerprint"].as_str().unwrap().len(), 16);
    assert_eq!(json["counts"]["total"], 1);
}

#[test]
fn recommended_preset_runs_end_to_end() {
    let engine = PolicyBuilder::new("preset").extends_recommended().engine();
    assert_eq!(engine.rule_ids().len(), 7);

    let inputs = InputsBuilder::new()
        .raise("src/a.py", "RuntimeError")
        .contract("contracts/c.yml", "c", serde_json::json!({"name": "c", "version": 2}))
        .build();
    let report = engine.run(&inputs, None, &NoopSink);
    assert_eq!(report.violations.len(), 1);
    assert_violation!(report, RuleId::ErrorTaxonomy, "RuntimeError");
}
