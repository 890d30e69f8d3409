use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use super::rule_id::RuleId;
use crate::fingerprint::generate_fingerprint;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    AsRefStr,      // Provides as_ref() -> &str
    Display,       // Provides to_string()
    EnumString,    // Provides from_str()
    IntoStaticStr, // Provides into() -> &'static str
    EnumIter,      // Provides iter() over all variants
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    #[serde(alias = "warn")]
    #[strum(to_string = "warning", serialize = "warn")] // to_string for Display, serialize for parsing
    Warning,
}

/// Accumulator for one rule invocation over one contract or file
///
/// Mutable while the rule runs; call [`ValidationResult::finish`] to freeze
/// `is_valid` and `summary` before handing it back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub summary: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { is_valid: true, ..Default::default() }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Append another result's findings, keeping their order
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.errors.is_empty() {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn finish(mut self, subject: &str) -> Self {
        self.is_valid = self.errors.is_empty();
        self.summary = match (self.errors.len(), self.warnings.len()) {
            (0, 0) => format!("{}: no issues", subject),
            (0, w) => format!("{}: {} warning(s)", subject, w),
            (e, 0) => format!("{}: {} error(s)", subject, e),
            (e, w) => format!("{}: {} error(s), {} warning(s)", subject, e, w),
        };
        self
    }
}

/// A rule's result for one `(file, symbol)` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedResult {
    pub file_path: String,
    pub symbol: String,
    pub result: ValidationResult,
}

impl LocatedResult {
    pub fn new(
        file_path: impl Into<String>,
        symbol: impl Into<String>,
        result: ValidationResult,
    ) -> Self {
        Self { file_path: file_path.into(), symbol: symbol.into(), result }
    }

    /// Single-error shorthand used by the pattern-matching rules
    pub fn error(
        file_path: impl Into<String>,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut result = ValidationResult::new();
        result.error(message);
        Self::new(file_path, symbol, result)
    }

    pub fn warning(
        file_path: impl Into<String>,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut result = ValidationResult::new();
        result.warning(message);
        Self::new(file_path, symbol, result)
    }
}

/// One finding of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: RuleId,
    pub file_path: String,
    pub symbol: String,
    pub severity: Severity,
    pub message: String,
    pub fingerprint: String,
}

impl Violation {
    pub fn new(
        rule_id: RuleId,
        file_path: impl Into<String>,
        symbol: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let symbol = symbol.into();
        let fingerprint = generate_fingerprint(rule_id.as_ref(), &file_path, &symbol);
        Self { rule_id, file_path, symbol, severity, message: message.into(), fingerprint }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Ordering key used to make reports independent of evaluation order
    pub(crate) fn sort_key(&self) -> (usize, &str, &str, Severity, &str) {
        (
            self.rule_id.declared_index(),
            self.file_path.as_str(),
            self.symbol.as_str(),
            self.severity,
            self.message.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_severity_parses_aliases() {
        assert_eq!(Severity::from_str("error").unwrap(), Severity::Error);
        assert_eq!(Severity::from_str("warning").unwrap(), Severity::Warning);
        assert_eq!(Severity::from_str("warn").unwrap(), Severity::Warning);
        assert_eq!(Severity::Warning.to_string(), "warning");

        let parsed: Severity = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn test_validation_result_finish_freezes_state() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid);
        result.warning("soft");
        let result = result.finish("op");
        assert!(result.is_valid);
        assert_eq!(result.summary, "op: 1 warning(s)");

        let mut result = ValidationResult::new();
        result.error("hard");
        result.warning("soft");
        let result = result.finish("op");
        assert!(!result.is_valid);
        assert_eq!(result.summary, "op: 1 error(s), 1 warning(s)");
    }

    #[test]
    fn test_merge_keeps_order_and_validity() {
        let mut first = ValidationResult::new();
        first.warning("w1");
        let mut second = ValidationResult::new();
        second.error("e1");
        second.warning("w2");
        first.merge(second);
        assert!(!first.is_valid);
        assert_eq!(first.errors, vec!["e1"]);
        assert_eq!(first.warnings, vec!["w1", "w2"]);
    }

    #[test]
    fn test_violation_carries_fingerprint_of_its_triple() {
        let violation = Violation::new(
            RuleId::ForbiddenImports,
            "src/app.py",
            "os.system",
            Severity::Error,
            "forbidden",
        );
        assert_eq!(
            violation.fingerprint,
            generate_fingerprint("forbidden_imports", "src/app.py", "os.system")
        );
        assert!(violation.is_error());
    }
}
