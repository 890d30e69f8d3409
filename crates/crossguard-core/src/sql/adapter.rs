//! SQL table extraction behind a single capability-probed adapter
//!
//! Two extractors implement [`TableExtractor`]: an AST walker (when the
//! `sql-ast` feature is compiled in and the host allows it) and a regex
//! fallback over normalized text. Callers never pick one directly; they ask
//! the [`SqlParserAdapter`], which owns the fail-closed policy.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use super::regex_extractor::RegexExtractor;

/// Default nesting limit for AST traversal and parenthesis depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Structural facts extracted from one SQL statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserResult {
    /// Referenced relations as written (schema qualifiers kept, quotes removed)
    pub tables: BTreeSet<String>,
    /// CTE aliases, lowercased
    pub cte_names: BTreeSet<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl ParserResult {
    pub fn ok(tables: BTreeSet<String>, cte_names: BTreeSet<String>) -> Self {
        Self { tables, cte_names, success: true, error: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { success: false, error: Some(reason.into()), ..Default::default() }
    }

    /// Referenced tables that are not CTE aliases
    pub fn real_tables(&self) -> BTreeSet<String> {
        self.tables
            .iter()
            .filter(|table| !self.cte_names.contains(&table.to_lowercase()))
            .cloned()
            .collect()
    }
}

/// One way of pulling table references out of SQL
pub trait TableExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never panics; failures are reported through `ParserResult::success`
    fn extract(&self, sql: &str, max_depth: usize) -> ParserResult;
}

/// Whether an AST parser can be used in this process
///
/// Constructed by the host and shared with validators. The probe runs at most
/// once, even when several threads ask concurrently.
#[derive(Debug)]
pub struct SqlCapability {
    ast_allowed: bool,
    probe: OnceLock<bool>,
}

impl SqlCapability {
    /// Use the AST parser whenever it was compiled in
    pub fn detect() -> Self {
        Self { ast_allowed: true, probe: OnceLock::new() }
    }

    /// Never use the AST parser, even when compiled in
    pub fn regex_only() -> Self {
        Self { ast_allowed: false, probe: OnceLock::new() }
    }

    pub fn has_parser(&self) -> bool {
        *self.probe.get_or_init(|| self.ast_allowed && ast_extractor().is_some())
    }

    pub fn is_probed(&self) -> bool {
        self.probe.get().is_some()
    }
}

impl Default for SqlCapability {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(feature = "sql-ast")]
static AST_EXTRACTOR: super::ast::AstExtractor = super::ast::AstExtractor;

fn ast_extractor() -> Option<&'static dyn TableExtractor> {
    #[cfg(feature = "sql-ast")]
    {
        Some(&AST_EXTRACTOR)
    }
    #[cfg(not(feature = "sql-ast"))]
    {
        None
    }
}

static REGEX_EXTRACTOR: RegexExtractor = RegexExtractor;

#[derive(Debug, Clone)]
pub struct SqlParserAdapter {
    capability: Arc<SqlCapability>,
    max_depth: usize,
}

impl SqlParserAdapter {
    pub fn new(capability: Arc<SqlCapability>) -> Self {
        Self { capability, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn has_parser(&self) -> bool {
        self.capability.has_parser()
    }

    /// AST extraction only; `None` when no AST parser is available at all
    pub fn extract_tables(&self, sql: &str, max_depth: usize) -> Option<ParserResult> {
        if !self.has_parser() {
            return None;
        }
        ast_extractor().map(|extractor| extractor.extract(sql, max_depth))
    }

    /// The extractor this adapter will use
    pub fn extractor(&self) -> &'static dyn TableExtractor {
        match ast_extractor() {
            Some(extractor) if self.has_parser() => extractor,
            _ => &REGEX_EXTRACTOR,
        }
    }

    /// AST extraction when available, regex fallback otherwise
    ///
    /// A failed AST parse is returned as-is; it is never retried with the
    /// fallback, since that would turn "cannot certify" into a guess.
    pub fn extract_tables_or_fallback(&self, sql: &str) -> ParserResult {
        self.extractor().extract(sql, self.max_depth)
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new(Arc::new(SqlCapability::detect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_regex_only_capability_reports_no_parser() {
        let adapter = SqlParserAdapter::new(Arc::new(SqlCapability::regex_only()));
        assert!(!adapter.has_parser());
        assert!(adapter.extract_tables("SELECT id FROM users", DEFAULT_MAX_DEPTH).is_none());
        assert_eq!(adapter.extractor().name(), "regex");

        let result = adapter.extract_tables_or_fallback("SELECT id FROM users");
        assert!(result.success);
        assert!(result.tables.contains("users"));
    }

    #[cfg(feature = "sql-ast")]
    #[test]
    fn test_detected_capability_uses_ast() {
        let adapter = SqlParserAdapter::default();
        assert!(adapter.has_parser());
        assert_eq!(adapter.extractor().name(), "ast");
        let result = adapter.extract_tables("SELECT id FROM users", DEFAULT_MAX_DEPTH).unwrap();
        assert!(result.success);
        assert!(result.tables.contains("users"));
    }

    #[test]
    fn test_capability_probe_runs_once_under_concurrency() {
        let capability = Arc::new(SqlCapability::detect());
        assert!(!capability.is_probed());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let capability = Arc::clone(&capability);
                thread::spawn(move || capability.has_parser())
            })
            .collect();
        let answers: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(capability.is_probed());
        assert!(answers.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(answers[0], cfg!(feature = "sql-ast"));
    }

    #[test]
    fn test_real_tables_excludes_cte_aliases() {
        let result = ParserResult::ok(
            ["users".to_string(), "Recent".to_string()].into_iter().collect(),
            ["recent".to_string()].into_iter().collect(),
        );
        assert_eq!(result.real_tables(), ["users".to_string()].into_iter().collect());
    }
}
