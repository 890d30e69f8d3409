use crossguard_core::inputs::{
    ContractDocument, DbContractFile, DbRepositoryContract, ErrorUsage, ErrorUsageKind,
    ImportEdge, TopicDeclaration, TopicRole,
};
use crossguard_core::ValidationInputs;

/// Builder for in-memory validation inputs
#[derive(Default)]
pub struct InputsBuilder {
    inputs: ValidationInputs,
}

impl InputsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import(mut self, repo: &str, file_path: &str, module: &str) -> Self {
        self.inputs.imports.edges.push(ImportEdge::new(repo, file_path, module));
        self
    }

    pub fn topic(mut self, file_path: &str, name: &str) -> Self {
        self.inputs.topics.push(TopicDeclaration {
            file_path: file_path.to_string(),
            name: name.to_string(),
            role: TopicRole::Produce,
        });
        self
    }

    pub fn raise(mut self, file_path: &str, error_type: &str) -> Self {
        self.inputs.errors.push(ErrorUsage {
            file_path: file_path.to_string(),
            error_type: error_type.to_string(),
            base: None,
            kind: ErrorUsageKind::Raise,
        });
        self
    }

    pub fn contract(mut self, file_path: &str, name: &str, fields: serde_json::Value) -> Self {
        self.inputs.contracts.push(ContractDocument {
            file_path: file_path.to_string(),
            name: name.to_string(),
            kind: None,
            fields: fields.as_object().cloned().unwrap_or_default(),
        });
        self
    }

    pub fn db_contract(mut self, file_path: &str, contract: DbRepositoryContract) -> Self {
        self.inputs.db_contracts.push(DbContractFile { file_path: file_path.to_string(), contract });
        self
    }

    pub fn build(self) -> ValidationInputs {
        self.inputs
    }
}
