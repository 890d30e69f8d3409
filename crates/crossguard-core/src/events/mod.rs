//! Run lifecycle events and the checks downstream consumers run on them

pub mod invariants;
pub mod lifecycle;

pub use invariants::{
    check_invariant, validate_sequence, ContractEvent, ContractEventKind, InvariantViolation,
    SequenceReport,
};
pub use lifecycle::{
    build_batches, validate_lifecycle_stream, EventSink, LifecycleEvent, LogSink, NoopSink,
    RecordingSink, RunCompleted, RunStarted, ViolationPayload, ViolationsBatch,
};
