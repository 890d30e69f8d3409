//! Policy configuration
//!
//! A policy names the repository under validation and carries one optional,
//! typed config per rule. Policies are loaded from YAML once per run and are
//! never mutated while the run is in progress.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strum::IntoEnumIterator;

use super::rule_id::RuleId;
use super::types::Severity;
use crate::errors::ConfigurationError;
use crate::sql::DEFAULT_MAX_DEPTH;

/// Preset name accepted by `extends`
pub const RECOMMENDED_PRESET: &str = "crossguard:recommended";

pub const DEFAULT_BATCH_SIZE: usize = 100;

pub const DEFAULT_TOPIC_PATTERN: &str = r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_-]*)+\.v[0-9]+$";

fn default_enabled() -> bool {
    true
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_root_path() -> String {
    ".".to_string()
}

fn default_topic_pattern() -> String {
    DEFAULT_TOPIC_PATTERN.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Fields every rule config carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCommon {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub severity: Severity,
}

impl Default for RuleCommon {
    fn default() -> Self {
        Self { enabled: true, severity: Severity::Error }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoOwnership {
    /// Module prefixes owned by the repository
    #[serde(default)]
    pub owns: Vec<String>,
    /// Other repositories this one may import from
    #[serde(default)]
    pub may_import: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoBoundariesConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    #[serde(default)]
    pub repos: BTreeMap<String, RepoOwnership>,
    /// Lowest layer first
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenImportsConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub exempt_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNamingConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    #[serde(default = "default_topic_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
}

impl Default for TopicNamingConfig {
    fn default() -> Self {
        Self {
            common: RuleCommon::default(),
            pattern: default_topic_pattern(),
            allowed_prefixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTaxonomyConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    /// Bases a newly defined error may derive from; empty disables the check
    #[serde(default)]
    pub allowed_bases: Vec<String>,
    #[serde(default)]
    pub forbidden_raises: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSchemaConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub deprecated_fields: Vec<String>,
    /// Contract kinds this rule applies to; empty means all
    #[serde(default)]
    pub kinds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTableAccessConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for DbTableAccessConfig {
    fn default() -> Self {
        Self { common: RuleCommon::default(), max_depth: DEFAULT_MAX_DEPTH }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbProjectionConfig {
    #[serde(flatten)]
    pub common: RuleCommon,
}

/// One optional config per rule; an absent entry means the rule does not run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfigSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_boundaries: Option<RepoBoundariesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_imports: Option<ForbiddenImportsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_naming: Option<TopicNamingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_taxonomy: Option<ErrorTaxonomyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_schema_valid: Option<ContractSchemaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_table_access: Option<DbTableAccessConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_projection: Option<DbProjectionConfig>,
}

impl RuleConfigSet {
    /// The rule set behind `extends: crossguard:recommended`
    pub fn recommended() -> Self {
        Self {
            repo_boundaries: Some(RepoBoundariesConfig::default()),
            forbidden_imports: Some(ForbiddenImportsConfig::default()),
            topic_naming: Some(TopicNamingConfig::default()),
            error_taxonomy: Some(ErrorTaxonomyConfig {
                forbidden_raises: vec![
                    "Exception".to_string(),
                    "BaseException".to_string(),
                    "RuntimeError".to_string(),
                ],
                ..Default::default()
            }),
            contract_schema_valid: Some(ContractSchemaConfig {
                required_fields: vec!["name".to_string(), "version".to_string()],
                ..Default::default()
            }),
            db_table_access: Some(DbTableAccessConfig::default()),
            db_projection: Some(DbProjectionConfig::default()),
        }
    }

    /// Entries of `self` win; missing ones are taken from `base`
    pub fn merged_over(self, base: RuleConfigSet) -> RuleConfigSet {
        RuleConfigSet {
            repo_boundaries: self.repo_boundaries.or(base.repo_boundaries),
            forbidden_imports: self.forbidden_imports.or(base.forbidden_imports),
            topic_naming: self.topic_naming.or(base.topic_naming),
            error_taxonomy: self.error_taxonomy.or(base.error_taxonomy),
            contract_schema_valid: self.contract_schema_valid.or(base.contract_schema_valid),
            db_table_access: self.db_table_access.or(base.db_table_access),
            db_projection: self.db_projection.or(base.db_projection),
        }
    }

    pub fn common(&self, rule: RuleId) -> Option<&RuleCommon> {
        match rule {
            RuleId::RepoBoundaries => self.repo_boundaries.as_ref().map(|c| &c.common),
            RuleId::ForbiddenImports => self.forbidden_imports.as_ref().map(|c| &c.common),
            RuleId::TopicNaming => self.topic_naming.as_ref().map(|c| &c.common),
            RuleId::ErrorTaxonomy => self.error_taxonomy.as_ref().map(|c| &c.common),
            RuleId::ContractSchemaValid => self.contract_schema_valid.as_ref().map(|c| &c.common),
            RuleId::DbTableAccess => self.db_table_access.as_ref().map(|c| &c.common),
            RuleId::DbProjection => self.db_projection.as_ref().map(|c| &c.common),
        }
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.common(rule).map(|c| c.enabled).unwrap_or(false)
    }

    /// Enabled rules in declared order
    pub fn enabled_rules(&self) -> Vec<RuleId> {
        RuleId::iter().filter(|rule| self.is_enabled(*rule)).collect()
    }
}

/// A validation policy for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub name: String,
    #[serde(default)]
    pub repo_id: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub rules: RuleConfigSet,
}

impl PolicyConfig {
    pub fn new(name: impl Into<String>, rules: RuleConfigSet) -> Self {
        Self {
            name: name.into(),
            repo_id: String::new(),
            root_path: default_root_path(),
            batch_size: DEFAULT_BATCH_SIZE,
            extends: None,
            rules,
        }
    }

    /// Load a policy file, resolve its preset and check it
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| {
            ConfigurationError::PolicyRead { path: path.to_path_buf(), source }
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let policy: PolicyConfig = serde_yml::from_str(content)
            .map_err(|e| ConfigurationError::PolicyParse(e.to_string()))?;
        policy.resolve()
    }

    /// Apply `extends` and check policy-level fields
    pub fn resolve(mut self) -> Result<Self, ConfigurationError> {
        if let Some(preset) = &self.extends {
            let base = match preset.as_str() {
                RECOMMENDED_PRESET => RuleConfigSet::recommended(),
                other => return Err(ConfigurationError::UnknownPreset(other.to_string())),
            };
            self.rules = self.rules.merged_over(base);
        }
        if self.batch_size == 0 {
            return Err(ConfigurationError::InvalidBatchSize(self.batch_size));
        }
        Ok(self)
    }

    pub fn enabled_rules(&self) -> Vec<RuleId> {
        self.rules.enabled_rules()
    }
}
