//! Type-safe rule identification
//!
//! The variant order is the declared evaluation order of a run. Reports,
//! batches and fingerprints all rely on it being stable.

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr, IntoEnumIterator};

/// Rules built into the engine
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    AsRefStr,      // Provides as_ref() -> &str
    Display,       // Provides to_string()
    EnumString,    // Provides from_str()
    IntoStaticStr, // Provides into() -> &'static str
    EnumIter,      // Provides iter() over all variants
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    // Architecture rules
    RepoBoundaries,
    ForbiddenImports,

    // Contract rules
    TopicNaming,
    ErrorTaxonomy,
    ContractSchemaValid,

    // Database access rules
    DbTableAccess,
    DbProjection,
}

/// Broad grouping used for documentation and selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RuleCategory {
    Architecture,
    Contracts,
    DatabaseAccess,
}

impl RuleId {
    /// Get a human-readable description of what the rule validates
    pub const fn description(&self) -> &'static str {
        use RuleId::*;
        match self {
            RepoBoundaries => "Keeps imports inside declared repository and layer boundaries",
            ForbiddenImports => "Rejects imports matching a deny-list pattern",
            TopicNaming => "Checks event topic names against the naming convention",
            ErrorTaxonomy => "Ensures raised and defined errors belong to the error taxonomy",
            ContractSchemaValid => "Checks contracts for required and deprecated fields",
            DbTableAccess => "Confirms repository SQL only touches declared tables",
            DbProjection => "Confirms SELECT projections match declared output fields",
        }
    }

    pub const fn category(&self) -> RuleCategory {
        use RuleId::*;
        match self {
            RepoBoundaries | ForbiddenImports => RuleCategory::Architecture,
            TopicNaming | ErrorTaxonomy | ContractSchemaValid => RuleCategory::Contracts,
            DbTableAccess | DbProjection => RuleCategory::DatabaseAccess,
        }
    }

    /// Position of this rule in the declared evaluation order
    pub fn declared_index(&self) -> usize {
        RuleId::iter().position(|id| id == *self).unwrap_or(usize::MAX)
    }
}
