//! AST-based table extraction using `sqlparser`

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, ObjectName, Query, TableFactor, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::adapter::{ParserResult, TableExtractor};

pub struct AstExtractor;

impl TableExtractor for AstExtractor {
    fn name(&self) -> &'static str {
        "ast"
    }

    fn extract(&self, sql: &str, max_depth: usize) -> ParserResult {
        let statements = match Parser::parse_sql(&GenericDialect {}, sql) {
            Ok(statements) => statements,
            Err(e) => return ParserResult::failed(format!("parse error: {}", e)),
        };
        if statements.is_empty() {
            return ParserResult::failed("SQL statement is empty");
        }

        let mut collector = RelationCollector::new(max_depth);
        for statement in &statements {
            if let ControlFlow::Break(reason) = statement.visit(&mut collector) {
                return ParserResult::failed(reason);
            }
        }

        ParserResult::ok(collector.tables, collector.cte_names)
    }
}

struct RelationCollector {
    tables: BTreeSet<String>,
    cte_names: BTreeSet<String>,
    depth: usize,
    max_depth: usize,
    /// Set when the next relation name belongs to a table-valued function call
    function_call: bool,
}

impl RelationCollector {
    fn new(max_depth: usize) -> Self {
        Self {
            tables: BTreeSet::new(),
            cte_names: BTreeSet::new(),
            depth: 0,
            max_depth,
            function_call: false,
        }
    }

    fn descend(&mut self) -> ControlFlow<String> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return ControlFlow::Break(format!(
                "AST nesting depth exceeds limit {}",
                self.max_depth
            ));
        }
        ControlFlow::Continue(())
    }

    fn ascend(&mut self) -> ControlFlow<String> {
        self.depth = self.depth.saturating_sub(1);
        ControlFlow::Continue(())
    }
}

impl Visitor for RelationCollector {
    type Break = String;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.insert(cte.alias.name.value.to_lowercase());
            }
        }
        self.descend()
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.ascend()
    }

    fn pre_visit_expr(&mut self, _expr: &Expr) -> ControlFlow<Self::Break> {
        self.descend()
    }

    fn post_visit_expr(&mut self, _expr: &Expr) -> ControlFlow<Self::Break> {
        self.ascend()
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        self.function_call = matches!(table_factor, TableFactor::Table { args: Some(_), .. });
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if std::mem::take(&mut self.function_call) {
            return ControlFlow::Continue(());
        }
        let name = relation.0.iter().map(|ident| ident.value.as_str()).collect::<Vec<_>>().join(".");
        self.tables.insert(name);
        ControlFlow::Continue(())
    }
}
