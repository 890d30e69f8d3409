use super::Rule;
use crate::inputs::{ContractDocument, ValidationInputs};
use crate::validation::config::ContractSchemaConfig;
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity};

#[derive(Debug)]
pub struct ContractSchemaRule {
    severity: Severity,
    required_fields: Vec<String>,
    deprecated_fields: Vec<String>,
    kinds: Vec<String>,
}

impl ContractSchemaRule {
    pub fn new(config: &ContractSchemaConfig) -> Self {
        Self {
            severity: config.common.severity,
            required_fields: config.required_fields.clone(),
            deprecated_fields: config.deprecated_fields.clone(),
            kinds: config.kinds.clone(),
        }
    }

    fn applies_to(&self, contract: &ContractDocument) -> bool {
        self.kinds.is_empty()
            || contract.kind.as_ref().is_some_and(|kind| self.kinds.contains(kind))
    }

    fn check(&self, contract: &ContractDocument) -> Vec<LocatedResult> {
        let missing = self
            .required_fields
            .iter()
            .filter(|field| !has_value(contract, field))
            .map(|field| {
                LocatedResult::error(
                    &contract.file_path,
                    field,
                    format!("contract '{}' is missing required field '{}'", contract.name, field),
                )
            });
        let deprecated = self
            .deprecated_fields
            .iter()
            .filter(|field| contract.fields.contains_key(field.as_str()))
            .map(|field| {
                LocatedResult::warning(
                    &contract.file_path,
                    field,
                    format!("contract '{}' uses deprecated field '{}'", contract.name, field),
                )
            });
        missing.chain(deprecated).collect()
    }
}

/// Present and not null
fn has_value(contract: &ContractDocument, field: &str) -> bool {
    contract.fields.get(field).is_some_and(|value| !value.is_null())
}

impl Rule for ContractSchemaRule {
    fn id(&self) -> RuleId {
        RuleId::ContractSchemaValid
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        inputs
            .contracts
            .iter()
            .filter(|contract| self.applies_to(contract))
            .flat_map(|contract| self.check(contract))
            .collect()
    }
}
