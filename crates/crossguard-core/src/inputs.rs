//! In-memory inputs consumed by the rules
//!
//! Scanning source trees and loading contract files is done by the host; the
//! engine only ever sees these pre-built structures, so no rule performs I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One import statement found by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Repository the importing file belongs to
    pub repo: String,
    pub file_path: String,
    /// Dotted module path being imported
    pub module: String,
    /// Dotted module path of the importing file, when the scanner resolved it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ImportEdge {
    pub fn new(repo: impl Into<String>, file_path: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            file_path: file_path.into(),
            module: module.into(),
            source_module: None,
            line: None,
        }
    }

    /// The importer's module path, derived from its file path when not given
    ///
    /// `src/billing/api/handler.py` becomes `src.billing.api.handler`.
    pub fn importer_module(&self) -> String {
        if let Some(module) = &self.source_module {
            return module.clone();
        }
        let path = self.file_path.trim_start_matches("./");
        let stem = match path.rfind('.') {
            Some(dot) if dot > path.rfind('/').map(|slash| slash + 1).unwrap_or(0) => &path[..dot],
            _ => path,
        };
        stem.replace(['/', '\\'], ".")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportGraph {
    #[serde(default)]
    pub edges: Vec<ImportEdge>,
}

impl ImportGraph {
    pub fn new(edges: Vec<ImportEdge>) -> Self {
        Self { edges }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicRole {
    Produce,
    Consume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDeclaration {
    pub file_path: String,
    pub name: String,
    pub role: TopicRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorUsageKind {
    /// The error type is raised at this location
    Raise,
    /// The error type is defined at this location
    Define,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorUsage {
    pub file_path: String,
    pub error_type: String,
    /// Direct base type for definitions
    #[serde(default)]
    pub base: Option<String>,
    pub kind: ErrorUsageKind,
}

/// A declarative contract as loaded by the host, fields kept as raw JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub file_path: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpMode {
    #[default]
    Read,
    Write,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnsSpec {
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub allow_select_star: bool,
}

impl ReturnsSpec {
    pub fn declared_fields(&self) -> &[String] {
        self.fields.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSpec {
    pub sql: String,
    #[serde(default)]
    pub mode: OpMode,
    #[serde(default)]
    pub returns: ReturnsSpec,
}

/// Database repository contract: declared table allow-list and SQL operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbRepositoryContract {
    #[serde(default)]
    pub tables: Vec<String>,
    /// Keyed by operation name; ordered so results are reproducible
    #[serde(default)]
    pub ops: BTreeMap<String, OpSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbContractFile {
    pub file_path: String,
    pub contract: DbRepositoryContract,
}

/// Everything a run evaluates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationInputs {
    #[serde(default)]
    pub imports: ImportGraph,
    #[serde(default)]
    pub topics: Vec<TopicDeclaration>,
    #[serde(default)]
    pub errors: Vec<ErrorUsage>,
    #[serde(default)]
    pub contracts: Vec<ContractDocument>,
    #[serde(default)]
    pub db_contracts: Vec<DbContractFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_contract_deserializes_with_defaults() {
        let contract: DbRepositoryContract = serde_json::from_str(
            r#"{
                "tables": ["users"],
                "ops": {
                    "get_user": {
                        "sql": "SELECT id, name FROM users WHERE id = $1",
                        "returns": {"fields": ["id", "name"]}
                    },
                    "touch": {"sql": "UPDATE users SET seen = now()", "mode": "write"}
                }
            }"#,
        )
        .unwrap();

        let get_user = &contract.ops["get_user"];
        assert_eq!(get_user.mode, OpMode::Read);
        assert_eq!(get_user.returns.strict, None);
        assert!(!get_user.returns.allow_select_star);
        assert_eq!(get_user.returns.declared_fields(), ["id", "name"]);

        let touch = &contract.ops["touch"];
        assert_eq!(touch.mode, OpMode::Write);
        assert!(touch.returns.declared_fields().is_empty());
    }

    #[test]
    fn test_importer_module_derivation() {
        let edge = ImportEdge::new("billing", "./src/billing/api/handler.py", "shared");
        assert_eq!(edge.importer_module(), "src.billing.api.handler");

        let edge = ImportEdge::new("billing", "scripts.d/run", "shared");
        assert_eq!(edge.importer_module(), "scripts.d.run");

        let mut edge = ImportEdge::new("billing", "x.py", "shared");
        edge.source_module = Some("billing.domain".to_string());
        assert_eq!(edge.importer_module(), "billing.domain");
    }
}
