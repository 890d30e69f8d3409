//! Rule identification, policy configuration and the built-in rules

pub mod config;
pub mod rule_id;
pub mod rules;
pub mod types;

pub use config::{PolicyConfig, RuleCommon, RuleConfigSet, RECOMMENDED_PRESET};
pub use rule_id::{RuleCategory, RuleId};
pub use rules::{CompiledRule, Rule};
pub use types::{LocatedResult, Severity, ValidationResult, Violation};
