use super::Rule;
use crate::inputs::{ErrorUsage, ErrorUsageKind, ValidationInputs};
use crate::validation::config::ErrorTaxonomyConfig;
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity};

#[derive(Debug)]
pub struct ErrorTaxonomyRule {
    severity: Severity,
    allowed_bases: Vec<String>,
    forbidden_raises: Vec<String>,
}

impl ErrorTaxonomyRule {
    pub fn new(config: &ErrorTaxonomyConfig) -> Self {
        Self {
            severity: config.common.severity,
            allowed_bases: config.allowed_bases.clone(),
            forbidden_raises: config.forbidden_raises.clone(),
        }
    }

    fn check(&self, usage: &ErrorUsage) -> Option<String> {
        match usage.kind {
            ErrorUsageKind::Raise => {
                let name = unqualified(&usage.error_type);
                self.forbidden_raises.iter().any(|forbidden| forbidden == name).then(|| {
                    format!(
                        "raises generic error '{}'; raise a type from the error taxonomy instead",
                        usage.error_type
                    )
                })
            }
            ErrorUsageKind::Define => {
                if self.allowed_bases.is_empty() {
                    return None;
                }
                let in_taxonomy = usage.base.as_deref().map(unqualified).is_some_and(|base| {
                    self.allowed_bases.iter().any(|allowed| allowed == base)
                });
                (!in_taxonomy).then(|| {
                    format!(
                        "error type '{}' derives from '{}', which is outside the taxonomy ({})",
                        usage.error_type,
                        usage.base.as_deref().unwrap_or("<none>"),
                        self.allowed_bases.join(", ")
                    )
                })
            }
        }
    }
}

/// `errors.PaymentDeclined` and `PaymentDeclined` name the same type
fn unqualified(name: &str) -> &str {
    name.rsplit(['.', ':']).next().unwrap_or(name)
}

impl Rule for ErrorTaxonomyRule {
    fn id(&self) -> RuleId {
        RuleId::ErrorTaxonomy
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        inputs
            .errors
            .iter()
            .filter_map(|usage| {
                self.check(usage)
                    .map(|message| LocatedResult::error(&usage.file_path, &usage.error_type, message))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(error_type: &str, base: Option<&str>, kind: ErrorUsageKind) -> ErrorUsage {
        ErrorUsage {
            file_path: "src/payments/errors.py".to_string(),
            error_type: error_type.to_string(),
            base: base.map(str::to_string),
            kind,
        }
    }

    fn rule() -> ErrorTaxonomyRule {
        ErrorTaxonomyRule::new(&ErrorTaxonomyConfig {
            allowed_bases: vec!["DomainError".to_string(), "InfraError".to_string()],
            forbidden_raises: vec!["Exception".to_string(), "RuntimeError".to_string()],
            ..Default::default()
        })
    }

    #[test]
    fn test_generic_raise_is_reported() {
        let inputs = ValidationInputs {
            errors: vec![
                usage("builtins.Exception", None, ErrorUsageKind::Raise),
                usage("PaymentDeclined", None, ErrorUsageKind::Raise),
            ],
            ..Default::default()
        };
        let found = rule().validate(&inputs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "builtins.Exception");
    }

    #[test]
    fn test_definition_outside_taxonomy_is_reported() {
        let inputs = ValidationInputs {
            errors: vec![
                usage("PaymentDeclined", Some("errors.DomainError"), ErrorUsageKind::Define),
                usage("Oops", Some("ValueError"), ErrorUsageKind::Define),
                usage("Orphan", None, ErrorUsageKind::Define),
            ],
            ..Default::default()
        };
        let found = rule().validate(&inputs);
        let symbols: Vec<&str> = found.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["Oops", "Orphan"]);
        assert!(found[1].result.errors[0].contains("<none>"));
    }

    #[test]
    fn test_empty_taxonomy_skips_definitions() {
        let rule = ErrorTaxonomyRule::new(&ErrorTaxonomyConfig::default());
        let inputs = ValidationInputs {
            errors: vec![usage("Oops", Some("ValueError"), ErrorUsageKind::Define)],
            ..Default::default()
        };
        assert!(rule.validate(&inputs).is_empty());
    }
}
