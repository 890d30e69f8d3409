use std::collections::BTreeMap;

use super::{module_has_prefix, Rule};
use crate::errors::ConfigurationError;
use crate::inputs::{ImportEdge, ValidationInputs};
use crate::validation::config::{LayerConfig, RepoBoundariesConfig, RepoOwnership};
use crate::validation::rule_id::RuleId;
use crate::validation::types::{LocatedResult, Severity, ValidationResult};

/// Cross-repository ownership and intra-repository layering
#[derive(Debug)]
pub struct RepoBoundariesRule {
    severity: Severity,
    repos: BTreeMap<String, RepoOwnership>,
    layers: Vec<LayerConfig>,
}

impl RepoBoundariesRule {
    pub fn compile(config: &RepoBoundariesConfig) -> Result<Self, ConfigurationError> {
        for (repo, ownership) in &config.repos {
            if let Some(unknown) =
                ownership.may_import.iter().find(|dep| !config.repos.contains_key(dep.as_str()))
            {
                return Err(ConfigurationError::InvalidRule {
                    rule: RuleId::RepoBoundaries,
                    message: format!("repo '{}' may_import unknown repo '{}'", repo, unknown),
                });
            }
        }
        Ok(Self {
            severity: config.common.severity,
            repos: config.repos.clone(),
            layers: config.layers.clone(),
        })
    }

    /// Repository owning `module`, by longest matching prefix
    fn owner_of(&self, module: &str) -> Option<&str> {
        self.repos
            .iter()
            .flat_map(|(repo, ownership)| {
                ownership.owns.iter().map(move |prefix| (repo.as_str(), prefix.as_str()))
            })
            .filter(|(_, prefix)| module_has_prefix(module, prefix))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(repo, _)| repo)
    }

    /// Index of the layer containing `module`, lowest layer is 0
    fn layer_of(&self, module: &str) -> Option<usize> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(index, layer)| layer.prefixes.iter().map(move |prefix| (index, prefix)))
            .filter(|(_, prefix)| module_has_prefix(module, prefix))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(index, _)| index)
    }

    fn check_edge(&self, edge: &ImportEdge) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let (Some(importer), Some(owner)) = (self.repos.get(&edge.repo), self.owner_of(&edge.module)) {
            if owner != edge.repo && !importer.may_import.iter().any(|dep| dep == owner) {
                result.error(format!(
                    "repo '{}' imports '{}' owned by repo '{}', which is not in its may_import list",
                    edge.repo, edge.module, owner
                ));
            }
        }

        let importer_module = edge.importer_module();
        if let (Some(from), Some(to)) = (self.layer_of(&importer_module), self.layer_of(&edge.module)) {
            if from < to {
                result.error(format!(
                    "layer '{}' must not import '{}' from higher layer '{}'",
                    self.layers[from].name, edge.module, self.layers[to].name
                ));
            }
        }

        result.finish(&edge.module)
    }
}

impl Rule for RepoBoundariesRule {
    fn id(&self) -> RuleId {
        RuleId::RepoBoundaries
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn validate(&self, inputs: &ValidationInputs) -> Vec<LocatedResult> {
        inputs
            .imports
            .edges
            .iter()
            .map(|edge| LocatedResult::new(&edge.file_path, &edge.module, self.check_edge(edge)))
            .filter(|located| !located.result.is_clean())
            .collect()
    }
}
