//! Cross-repository static validation engine
//!
//! Scans pre-loaded import graphs and declarative contracts, enforcing
//! architectural rules and SQL-level access control, and emits an ordered
//! run lifecycle for downstream consumers.

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate hiro_system_kit;

pub mod baseline;
pub mod context;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fingerprint;
pub mod inputs;
pub mod sql;
pub mod validation;

pub use baseline::Baseline;
pub use context::Context;
pub use engine::{Engine, ExitStatus, Report, RunStatus};
pub use errors::{ConfigurationError, RuleFailure};
pub use fingerprint::generate_fingerprint;
pub use inputs::ValidationInputs;
pub use validation::{PolicyConfig, RuleId, Severity, ValidationResult, Violation};
