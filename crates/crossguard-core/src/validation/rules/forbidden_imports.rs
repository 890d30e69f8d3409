use regex::Regex;

use super::{compile_patterns, Rule};
use crate::errors::ConfigurationError;
use crate::inputs::ValidationInputs;
use crate::validation::config::ForbiddenImportsConfig;
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity};

#[derive(Debug)]
pub struct ForbiddenImportsRule {
    severity: Severity,
    deny: Vec<Regex>,
    allow: Vec<Regex>,
    exempt_paths: Vec<String>,
}

impl ForbiddenImportsRule {
    pub fn compile(config: &ForbiddenImportsConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            severity: config.common.severity,
            deny: compile_patterns(RuleId::ForbiddenImports, &config.deny)?,
            allow: compile_patterns(RuleId::ForbiddenImports, &config.allow)?,
            exempt_paths: config.exempt_paths.clone(),
        })
    }

    fn is_exempt(&self, file_path: &str) -> bool {
        let path = file_path.trim_start_matches("./");
        self.exempt_paths.iter().any(|prefix| path.starts_with(prefix.trim_start_matches("./")))
    }

    /// The deny pattern `module` matches, unless an allow pattern rescues it
    fn denied_by(&self, module: &str) -> Option<&Regex> {
        let denied = self.deny.iter().find(|pattern| pattern.is_match(module))?;
        if self.allow.iter().any(|pattern| pattern.is_match(module)) {
            return None;
        }
        Some(denied)
    }
}

impl Rule for ForbiddenImportsRule {
    fn id(&self) -> RuleId {
        RuleId::ForbiddenImports
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        let mut found = Vec::new();
        for edge in &inputs.imports.edges {
            if self.is_exempt(&edge.file_path) {
                continue;
            }
            if let Some(pattern) = self.denied_by(&edge.module) {
                let location = match edge.line {
                    Some(line) => format!("{}:{}", edge.file_path, line),
                    None => edge.file_path.clone(),
                };
                found.push(LocatedResult::error(
                    &edge.file_path,
                    &edge.module,
                    format!(
                        "forbidden import '{}' at {} (matches deny pattern '{}')",
                        edge.module,
                        location,
                        pattern.as_str()
                    ),
                ));
            }
        }
        found
    }
}
