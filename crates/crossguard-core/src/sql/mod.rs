//! SQL static analysis for database-repository contracts

mod adapter;
#[cfg(feature = "sql-ast")]
mod ast;
mod normalize;
mod projection;
mod regex_extractor;
mod table_access;

pub use adapter::{
    ParserResult, SqlCapability, SqlParserAdapter, TableExtractor, DEFAULT_MAX_DEPTH,
};
#[cfg(feature = "sql-ast")]
pub use ast::AstExtractor;
pub use normalize::{
    cte_names, detect_unsupported_constructs, normalize_sql, UnsupportedConstruct,
};
pub use projection::{extract_projection, ProjectedItem, ProjectionValidator};
pub use regex_extractor::RegexExtractor;
pub use table_access::{canonical_table, TableAccessValidator};
