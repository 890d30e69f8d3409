use regex::Regex;

use super::{compile_pattern, Rule};
use crate::errors::ConfigurationError;
use crate::inputs::ValidationInputs;
use crate::validation::config::TopicNamingConfig;
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity, ValidationResult};

#[derive(Debug)]
pub struct TopicNamingRule {
    severity: Severity,
    pattern: Regex,
    allowed_prefixes: Vec<String>,
}

impl TopicNamingRule {
    pub fn compile(config: &TopicNamingConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            severity: config.common.severity,
            pattern: compile_pattern(RuleId::TopicNaming, &config.pattern)?,
            allowed_prefixes: config.allowed_prefixes.clone(),
        })
    }

    pub fn check_name(&self, name: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if !self.pattern.is_match(name) {
            result.error(format!(
                "topic '{}' does not match naming pattern '{}'",
                name,
                self.pattern.as_str()
            ));
        }
        if !self.allowed_prefixes.is_empty()
            && !self.allowed_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
        {
            result.error(format!(
                "topic '{}' does not start with an allowed prefix ({})",
                name,
                self.allowed_prefixes.join(", ")
            ));
        }
        result.finish(name)
    }
}

impl Rule for TopicNamingRule {
    fn id(&self) -> RuleId {
        RuleId::TopicNaming
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        inputs
            .topics
            .iter()
            .map(|topic| LocatedResult::new(&topic.file_path, &topic.name, self.check_name(&topic.name)))
            .filter(|located| !located.result.is_clean())
            .collect()
    }
}
