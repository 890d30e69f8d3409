//! Fluent builders for policies, inputs and database contracts

mod contract_builder;
mod inputs_builder;
mod policy_builder;

pub use contract_builder::DbContractBuilder;
pub use inputs_builder::InputsBuilder;
pub use policy_builder::PolicyBuilder;
