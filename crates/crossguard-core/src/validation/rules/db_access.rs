use std::sync::Arc;

use super::Rule;
use crate::errors::ConfigurationError;
use crate::inputs::ValidationInputs;
use crate::sql::{ProjectionValidator, SqlCapability, SqlParserAdapter, TableAccessValidator};
use crate::validation::config::{DbProjectionConfig, DbTableAccessConfig};
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity};

/// Per-operation table allow-list enforcement
#[derive(Debug)]
pub struct DbTableAccessRule {
    severity: Severity,
    validator: TableAccessValidator,
}

impl DbTableAccessRule {
    pub fn compile(
        config: &DbTableAccessConfig,
        capability: Arc<SqlCapability>,
    ) -> Result<Self, ConfigurationError> {
        if config.max_depth == 0 {
            return Err(ConfigurationError::InvalidRule {
                rule: RuleId::DbTableAccess,
                message: "max_depth must be at least 1".to_string(),
            });
        }
        let adapter = SqlParserAdapter::new(capability).with_max_depth(config.max_depth);
        Ok(Self { severity: config.common.severity, validator: TableAccessValidator::new(adapter) })
    }
}

impl Rule for DbTableAccessRule {
    fn id(&self) -> RuleId {
        RuleId::DbTableAccess
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        let mut found = Vec::new();
        for file in &inputs.db_contracts {
            for (op_name, op) in &file.contract.ops {
                let result = self.validator.validate_operation(op_name, op, &file.contract.tables);
                if !result.is_clean() {
                    found.push(LocatedResult::new(&file.file_path, op_name, result));
                }
            }
        }
        found
    }
}

/// Per-operation projection enforcement
#[derive(Debug)]
pub struct DbProjectionRule {
    severity: Severity,
    validator: ProjectionValidator,
}

impl DbProjectionRule {
    pub fn new(config: &DbProjectionConfig) -> Self {
        Self { severity: config.common.severity, validator: ProjectionValidator::new() }
    }
}

impl Rule for DbProjectionRule {
    fn id(&self) -> RuleId {
        RuleId::DbProjection
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        let mut found = Vec::new();
        for file in &inputs.db_contracts {
            for (op_name, op) in &file.contract.ops {
                let result = self.validator.validate_operation(op_name, op);
                if !result.is_clean() {
                    found.push(LocatedResult::new(&file.file_path, op_name, result));
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{DbContractFile, DbRepositoryContract};

    fn inputs() -> ValidationInputs {
        let contract: DbRepositoryContract = serde_json::from_value(serde_json::json!({
            "tables": ["users"],
            "ops": {
                "get_user": {
                    "sql": "SELECT id, name FROM users WHERE id = $1",
                    "returns": {"fields": ["id", "name"]}
                },
                "list_all": {
                    "sql": "SELECT * FROM users",
                    "returns": {"fields": ["id", "name"]}
                },
                "audit": {"sql": "INSERT INTO audit_log (id) VALUES ($1)", "mode": "write"}
            }
        }))
        .unwrap();
        ValidationInputs {
            db_contracts: vec![DbContractFile { file_path: "db/users.yml".to_string(), contract }],
            ..Default::default()
        }
    }

    #[test]
    fn test_table_access_findings_are_scoped_to_operations() {
        let rule =
            DbTableAccessRule::compile(&DbTableAccessConfig::default(), Arc::new(SqlCapability::detect()))
                .unwrap();
        let found = rule.validate(&inputs());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_path, "db/users.yml");
        assert_eq!(found[0].symbol, "audit");
    }

    #[test]
    fn test_projection_findings_are_scoped_to_operations() {
        let found = DbProjectionRule::new(&DbProjectionConfig::default()).validate(&inputs());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "list_all");
        assert!(found[0].result.errors[0].contains("SELECT * is not allowed in strict mode"));
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let config = DbTableAccessConfig { max_depth: 0, ..Default::default() };
        assert!(DbTableAccessRule::compile(&config, Arc::new(SqlCapability::detect())).is_err());
    }
}
