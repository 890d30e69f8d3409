use std::collections::BTreeSet;

use crossguard_core::events::{
    validate_lifecycle_stream, validate_sequence, ContractEvent, ContractEventKind, LifecycleEvent,
    RecordingSink,
};
use crossguard_test_utils::{InputsBuilder, PolicyBuilder};
use test_case::test_case;

fn inputs_with_bad_topics(n: usize) -> crossguard_core::ValidationInputs {
    (0..n).fold(InputsBuilder::new(), |builder, i| builder.topic("topics.yml", &format!("Bad{}", i))).build()
}

#[test_case(0, 10 ; "no violations")]
#[test_case(1, 10 ; "single partial batch")]
#[test_case(10, 5 ; "exact multiple")]
#[test_case(11, 5 ; "remainder batch")]
#[test_case(7, 1 ; "one per batch")]
fn batches_cover_every_violation(violations: usize, batch_size: usize) {
    let engine = PolicyBuilder::new("topics").topic_naming().batch_size(batch_size).engine();
    let sink = RecordingSink::new();
    let report = engine.run(&inputs_with_bad_topics(violations), None, &sink);
    let events = sink.events();

    assert!(matches!(events.first(), Some(LifecycleEvent::RunStarted(_))));
    assert!(matches!(events.last(), Some(LifecycleEvent::RunCompleted(_))));
    assert!(events.iter().all(|event| event.run_id() == report.run_id));

    let batches: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            LifecycleEvent::ViolationsBatch(batch) => Some(batch),
            _ => None,
        })
        .collect();
    let total_batches = batches.first().map(|b| b.total_batches).unwrap_or(0);
    assert_eq!(batches.len(), total_batches);
    assert_eq!(batches.iter().map(|b| b.batch_size).sum::<usize>(), report.counts.total);
    assert_eq!(report.counts.total, violations);

    let indexes: BTreeSet<usize> = batches.iter().map(|b| b.batch_index).collect();
    assert_eq!(indexes, (0..total_batches).collect());
    assert!(batches.iter().all(|b| b.batch_size <= batch_size));

    let check = validate_lifecycle_stream(&events);
    assert!(check.is_valid, "{:?}", check.violations);
}

#[test]
fn emitted_run_satisfies_contract_invariants() {
    let engine = PolicyBuilder::new("topics").topic_naming().engine();
    let sink = RecordingSink::new();
    let first = engine.run(&inputs_with_bad_topics(2), None, &sink);
    let second = engine.run(&inputs_with_bad_topics(0), None, &sink);

    let contract_events: Vec<ContractEvent> =
        sink.events().iter().filter_map(ContractEvent::from_lifecycle).collect();
    assert_eq!(contract_events.len(), 4);
    assert_eq!(
        contract_events[1],
        ContractEvent::new(first.run_id.to_string(), ContractEventKind::Failed)
    );
    assert_eq!(
        contract_events[3],
        ContractEvent::new(second.run_id.to_string(), ContractEventKind::Passed)
    );
    assert!(validate_sequence(&contract_events).is_valid);
}

#[test]
fn passed_then_failed_is_rejected() {
    let events = vec![
        ContractEvent::new("R", ContractEventKind::Started),
        ContractEvent::new("R", ContractEventKind::Passed),
        ContractEvent::new("R", ContractEventKind::Failed),
    ];
    let report = validate_sequence(&events);
    assert!(!report.is_valid);
    assert!(report.violations.iter().any(|v| v.contains("mutually exclusive") && v.contains("R")));
}

#[test]
fn interleaved_runs_are_rejected_by_stream_check() {
    let engine = PolicyBuilder::new("topics").topic_naming().engine();
    let first = RecordingSink::new();
    let second = RecordingSink::new();
    engine.run(&inputs_with_bad_topics(1), None, &first);
    engine.run(&inputs_with_bad_topics(1), None, &second);

    let mut events = first.events();
    events.insert(1, second.events()[1].clone());
    let check = validate_lifecycle_stream(&events);
    assert!(!check.is_valid);
    assert!(check.violations.iter().any(|v| v.contains("belongs to run")));
}
