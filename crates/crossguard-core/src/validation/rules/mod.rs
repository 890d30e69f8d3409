//! Built-in rules
//!
//! Each rule is compiled once from its config (patterns are validated here,
//! so a bad regex is a configuration error rather than a run-time finding)
//! and then evaluated against the pre-loaded inputs.

mod contract_schema;
mod db_access;
mod error_taxonomy;
mod forbidden_imports;
mod repo_boundaries;
mod topic_naming;

use regex::Regex;
use std::sync::Arc;

pub use contract_schema::ContractSchemaRule;
pub use db_access::{DbProjectionRule, DbTableAccessRule};
pub use error_taxonomy::ErrorTaxonomyRule;
pub use forbidden_imports::ForbiddenImportsRule;
pub use repo_boundaries::RepoBoundariesRule;
pub use topic_naming::TopicNamingRule;

use super::config::RuleConfigSet;
use super::rule_id::RuleId;
use super::types::{LocatedResult, Severity};
use crate::errors::ConfigurationError;
use crate::inputs::ValidationInputs;
use crate::sql::SqlCapability;

pub trait Rule {
    fn id(&self) -> RuleId;

    /// Severity applied to this rule's error findings
    fn severity(&self) -> Severity;

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult>;
}

/// A rule ready to run, one variant per rule id
#[derive(Debug)]
pub enum CompiledRule {
    RepoBoundaries(RepoBoundariesRule),
    ForbiddenImports(ForbiddenImportsRule),
    TopicNaming(TopicNamingRule),
    ErrorTaxonomy(ErrorTaxonomyRule),
    ContractSchemaValid(ContractSchemaRule),
    DbTableAccess(DbTableAccessRule),
    DbProjection(DbProjectionRule),
}

impl CompiledRule {
    /// Compile every enabled rule of `rules`, in declared order
    pub fn compile_all(
        rules: &RuleConfigSet,
        capability: &Arc<SqlCapability>,
    ) -> Result<Vec<CompiledRule>, ConfigurationError> {
        rules
            .enabled_rules()
            .into_iter()
            .filter_map(|id| Self::compile(id, rules, capability).transpose())
            .collect()
    }

    /// `None` when the rule is absent or disabled
    pub fn compile(
        id: RuleId,
        rules: &RuleConfigSet,
        capability: &Arc<SqlCapability>,
    ) -> Result<Option<CompiledRule>, ConfigurationError> {
        if !rules.is_enabled(id) {
            return Ok(None);
        }
        let compiled = match id {
            RuleId::RepoBoundaries => rules
                .repo_boundaries
                .as_ref()
                .map(RepoBoundariesRule::compile)
                .transpose()?
                .map(CompiledRule::RepoBoundaries),
            RuleId::ForbiddenImports => rules
                .forbidden_imports
                .as_ref()
                .map(ForbiddenImportsRule::compile)
                .transpose()?
                .map(CompiledRule::ForbiddenImports),
            RuleId::TopicNaming => rules
                .topic_naming
                .as_ref()
                .map(TopicNamingRule::compile)
                .transpose()?
                .map(CompiledRule::TopicNaming),
            RuleId::ErrorTaxonomy => rules
                .error_taxonomy
                .as_ref()
                .map(ErrorTaxonomyRule::new)
                .map(CompiledRule::ErrorTaxonomy),
            RuleId::ContractSchemaValid => rules
                .contract_schema_valid
                .as_ref()
                .map(ContractSchemaRule::new)
                .map(CompiledRule::ContractSchemaValid),
            RuleId::DbTableAccess => rules
                .db_table_access
                .as_ref()
                .map(|config| DbTableAccessRule::compile(config, Arc::clone(capability)))
                .transpose()?
                .map(CompiledRule::DbTableAccess),
            RuleId::DbProjection => rules
                .db_projection
                .as_ref()
                .map(DbProjectionRule::new)
                .map(CompiledRule::DbProjection),
        };
        Ok(compiled)
    }

    fn inner(&self) -> &dyn Rule {
        match self {
            CompiledRule::RepoBoundaries(rule) => rule,
            CompiledRule::ForbiddenImports(rule) => rule,
            CompiledRule::TopicNaming(rule) => rule,
            CompiledRule::ErrorTaxonomy(rule) => rule,
            CompiledRule::ContractSchemaValid(rule) => rule,
            CompiledRule::DbTableAccess(rule) => rule,
            CompiledRule::DbProjection(rule) => rule,
        }
    }
}

impl Rule for CompiledRule {
    fn id(&self) -> RuleId {
        self.inner().id()
    }

    fn severity(&self) -> Severity {
        self.inner().severity()
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        self.inner().validate(inputs)
    }
}

/// Compile a list of user patterns, naming the rule and pattern on failure
pub(crate) fn compile_patterns(
    rule: RuleId,
    patterns: &[String],
) -> Result<Vec<Regex>, ConfigurationError> {
    patterns.iter().map(|pattern| compile_pattern(rule, pattern)).collect()
}

pub(crate) fn compile_pattern(rule: RuleId, pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
        rule,
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// `module` is `prefix` itself or lives below it
pub(crate) fn module_has_prefix(module: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('.');
    module == prefix
        || (module.starts_with(prefix) && module[prefix.len()..].starts_with('.'))
}
