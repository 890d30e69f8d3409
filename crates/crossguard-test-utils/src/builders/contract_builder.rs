use crossguard_core::inputs::{DbRepositoryContract, OpMode, OpSpec, ReturnsSpec};

/// Builder for database-repository contracts
pub struct DbContractBuilder {
    contract: DbRepositoryContract,
}

impl DbContractBuilder {
    pub fn new(tables: &[&str]) -> Self {
        Self {
            contract: DbRepositoryContract {
                tables: tables.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    /// A read operation whose declared fields default strict mode on
    pub fn read_op(self, name: &str, sql: &str, fields: &[&str]) -> Self {
        let returns = ReturnsSpec {
            fields: Some(fields.iter().map(|f| f.to_string()).collect()),
            ..Default::default()
        };
        self.op(name, OpSpec { sql: sql.to_string(), mode: OpMode::Read, returns })
    }

    pub fn write_op(self, name: &str, sql: &str) -> Self {
        self.op(name, OpSpec { sql: sql.to_string(), mode: OpMode::Write, ..Default::default() })
    }

    pub fn op(mut self, name: &str, op: OpSpec) -> Self {
        self.contract.ops.insert(name.to_string(), op);
        self
    }

    pub fn build(self) -> DbRepositoryContract {
        self.contract
    }
}
