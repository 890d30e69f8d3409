//! Check that every table an operation's SQL touches is declared by its contract

use std::collections::BTreeSet;

use super::adapter::SqlParserAdapter;
use super::normalize::{detect_unsupported_constructs, normalize_sql, unterminated_quote};
use crate::inputs::{DbRepositoryContract, OpSpec};
use crate::validation::ValidationResult;

/// Checks that every table a contract's SQL touches is in its declared allow-list
#[derive(Debug, Clone, Default)]
pub struct TableAccessValidator {
    adapter: SqlParserAdapter,
}

impl TableAccessValidator {
    pub fn new(adapter: SqlParserAdapter) -> Self {
        Self { adapter }
    }

    pub fn validate(&self, contract: &DbRepositoryContract) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (name, op) in &contract.ops {
            result.merge(self.validate_operation(name, op, &contract.tables));
        }
        result.finish("table access")
    }

    pub fn validate_operation(
        &self,
        op_name: &str,
        op: &OpSpec,
        declared_tables: &[String],
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        let normalized = normalize_sql(&op.sql);
        if normalized.is_empty() {
            result.error(format!("operation '{}' has no SQL to validate", op_name));
            return result.finish(op_name);
        }

        if let Some(open) = unterminated_quote(&op.sql) {
            result.error(format!("operation '{}' could not be parsed: unterminated {}", op_name, open));
            return result.finish(op_name);
        }

        let unsupported = detect_unsupported_constructs(&normalized);
        if !unsupported.is_empty() {
            let labels: Vec<&str> = unsupported.iter().map(|c| c.label()).collect();
            result.error(format!(
                "operation '{}' uses {}, which cannot be reliably validated; table access is not certified",
                op_name,
                labels.join(" and ")
            ));
            return result.finish(op_name);
        }

        let parsed = self.adapter.extract_tables_or_fallback(&op.sql);
        if !parsed.success {
            result.error(format!(
                "operation '{}' could not be parsed: {}",
                op_name,
                parsed.error.as_deref().unwrap_or("unknown reason")
            ));
            return result.finish(op_name);
        }

        let allowed: BTreeSet<String> =
            declared_tables.iter().map(|table| canonical_table(table)).collect();
        let allowed_list = allowed.iter().cloned().collect::<Vec<_>>().join(", ");

        let referenced: BTreeSet<String> =
            parsed.real_tables().iter().map(|table| canonical_table(table)).collect();
        for table in referenced.difference(&allowed) {
            result.error(format!(
                "operation '{}' references undeclared table '{}' (allowed: [{}])",
                op_name, table, allowed_list
            ));
        }

        result.finish(op_name)
    }
}

/// Drop schema qualifier and surrounding quotes, then case-fold
pub fn canonical_table(name: &str) -> String {
    let unqualified = name.rsplit('.').next().unwrap_or(name);
    unqualified.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']').to_lowercase()
}
