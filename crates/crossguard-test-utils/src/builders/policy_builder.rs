use std::sync::Arc;

use crossguard_core::sql::SqlCapability;
use crossguard_core::validation::config::{
    ContractSchemaConfig, DbProjectionConfig, DbTableAccessConfig, ErrorTaxonomyConfig,
    ForbiddenImportsConfig, RuleConfigSet, TopicNamingConfig,
};
use crossguard_core::{Context, Engine, PolicyConfig};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builder for test policies
pub struct PolicyBuilder {
    policy: PolicyConfig,
    capability: Arc<SqlCapability>,
}

impl PolicyBuilder {
    pub fn new(name: &str) -> Self {
        let mut policy = PolicyConfig::new(name, RuleConfigSet::default());
        policy.repo_id = "test-repo".to_string();
        Self { policy, capability: Arc::new(SqlCapability::detect()) }
    }

    pub fn repo_id(mut self, repo_id: &str) -> Self {
        self.policy.repo_id = repo_id.to_string();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.policy.batch_size = batch_size;
        self
    }

    pub fn extends_recommended(mut self) -> Self {
        self.policy.extends = Some(crossguard_core::validation::RECOMMENDED_PRESET.to_string());
        self
    }

    /// Use the regex extractor even when the AST parser is compiled in
    pub fn regex_only(mut self) -> Self {
        self.capability = Arc::new(SqlCapability::regex_only());
        self
    }

    pub fn forbid_imports(mut self, deny: &[&str]) -> Self {
        self.policy.rules.forbidden_imports =
            Some(ForbiddenImportsConfig { deny: strings(deny), ..Default::default() });
        self
    }

    pub fn topic_naming(mut self) -> Self {
        self.policy.rules.topic_naming = Some(TopicNamingConfig::default());
        self
    }

    pub fn forbid_raises(mut self, forbidden: &[&str]) -> Self {
        self.policy.rules.error_taxonomy =
            Some(ErrorTaxonomyConfig { forbidden_raises: strings(forbidden), ..Default::default() });
        self
    }

    pub fn require_fields(mut self, required: &[&str]) -> Self {
        self.policy.rules.contract_schema_valid =
            Some(ContractSchemaConfig { required_fields: strings(required), ..Default::default() });
        self
    }

    /// Enable both table-access and projection checks
    pub fn db_rules(mut self) -> Self {
        self.policy.rules.db_table_access = Some(DbTableAccessConfig::default());
        self.policy.rules.db_projection = Some(DbProjectionConfig::default());
        self
    }

    pub fn rules(mut self, rules: RuleConfigSet) -> Self {
        self.policy.rules = rules;
        self
    }

    pub fn build(self) -> PolicyConfig {
        self.policy
    }

    pub fn engine(self) -> Engine {
        Engine::new(self.policy, Context::empty(), self.capability)
            .unwrap_or_else(|e| panic!("test policy failed to compile: {e}"))
    }
}
