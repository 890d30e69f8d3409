pub mod assertions;
pub mod builders;

pub use builders::{DbContractBuilder, InputsBuilder, PolicyBuilder};
pub use crossguard_core::{Engine, Report, Severity, ValidationInputs, Violation};
