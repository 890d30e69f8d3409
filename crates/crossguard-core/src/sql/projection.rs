//! Compare a SELECT's projected columns with an operation's declared fields

use regex::Regex;
use std::collections::BTreeSet;

use super::normalize::{normalize_sql, paren_depths, unterminated_quote};
use crate::inputs::{DbRepositoryContract, OpMode, OpSpec};
use crate::validation::ValidationResult;

lazy_static! {
    static ref SELECT_KEYWORD: Regex = Regex::new(r"(?i)\bSELECT\b").unwrap();
    static ref FROM_KEYWORD: Regex = Regex::new(r"(?i)\bFROM\b").unwrap();
    static ref SELECT_MODIFIER: Regex =
        Regex::new(r"(?i)^(?:ALL\s+|DISTINCT\s+ON\s*\([^)]*\)\s*|DISTINCT\s+)").unwrap();
    static ref AS_KEYWORD: Regex = Regex::new(r"(?i)\s+AS\s+").unwrap();
    static ref COLUMN_REF: Regex = Regex::new(
        r#"^(?:(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)\.)*("[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)$"#
    )
    .unwrap();
    static ref WILDCARD: Regex =
        Regex::new(r#"^(?:(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)\.)*\*$"#).unwrap();
    static ref TRAILING_IDENT: Regex =
        Regex::new(r#"\s("[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)$"#).unwrap();
    static ref OPERATOR_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:NOT|AND|OR|BETWEEN|IS|IN|LIKE|ILIKE|SIMILAR|CASE|WHEN|THEN|ELSE|END|EXISTS|ANY|ALL|SOME|COLLATE|OVERLAPS)\b"
    )
    .unwrap();
}

/// Trailing words that end an expression rather than alias it
const EXPRESSION_TAIL_WORDS: &[&str] =
    &["end", "null", "true", "false", "asc", "desc", "and", "or", "not", "is", "else", "then"];

/// One item of a SELECT list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedItem {
    /// `*` or `table.*`
    Wildcard,
    /// A column reference or an aliased expression, lowercased and unquoted
    Column(String),
    /// An expression that cannot be reduced to a column name
    Complex(String),
}

/// Projected items of the outermost SELECT, or `None` when there is no SELECT list
pub fn extract_projection(sql: &str) -> Option<Vec<ProjectedItem>> {
    let normalized = normalize_sql(sql);
    let depths = paren_depths(&normalized);

    let select = SELECT_KEYWORD.find_iter(&normalized).find(|m| depths[m.start()] == 0)?;
    let list_end = FROM_KEYWORD
        .find_iter(&normalized)
        .find(|m| m.start() > select.end() && depths[m.start()] == 0)
        .map(|m| m.start())
        .unwrap_or(normalized.len());

    let list = normalized[select.end()..list_end].trim();
    let list = SELECT_MODIFIER.replace(list, "");
    if list.trim().is_empty() {
        return None;
    }

    Some(split_top_level(&list).into_iter().map(classify_item).collect())
}

fn split_top_level(list: &str) -> Vec<&str> {
    let depths = paren_depths(list);
    let mut items = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, b) in list.bytes().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b',' if !quoted && depths[i] == 0 => {
                items.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(list[start..].trim());
    items
}

fn classify_item(item: &str) -> ProjectedItem {
    if WILDCARD.is_match(item) {
        return ProjectedItem::Wildcard;
    }
    if let Some(caps) = COLUMN_REF.captures(item) {
        return ProjectedItem::Column(column_name(&caps[1]));
    }

    // explicit alias: the last top-level `AS`
    let depths = paren_depths(item);
    if let Some(alias_kw) = AS_KEYWORD.find_iter(item).filter(|m| depths[m.start()] == 0).last() {
        let alias = item[alias_kw.end()..].trim();
        if COLUMN_REF.is_match(alias) && !alias.contains('.') {
            return ProjectedItem::Column(column_name(alias));
        }
    }

    // implicit alias: `expr alias`
    if let Some(caps) = TRAILING_IDENT.captures(item) {
        let alias = &caps[1];
        let expression = item[..caps.get(0).map(|m| m.start()).unwrap_or(0)].trim_end();
        let closes_expression = expression
            .chars()
            .last()
            .map(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ')' | '"' | '\''))
            .unwrap_or(false);
        if closes_expression
            && !EXPRESSION_TAIL_WORDS.contains(&alias.to_lowercase().as_str())
            && !has_top_level_operator(expression)
        {
            return ProjectedItem::Column(column_name(alias));
        }
    }

    ProjectedItem::Complex(item.to_string())
}

/// `NOT a`, `a AND b`, `x BETWEEN 1 AND b`: the last word is an operand, not an alias
fn has_top_level_operator(expression: &str) -> bool {
    let depths = paren_depths(expression);
    OPERATOR_KEYWORD.find_iter(expression).any(|m| depths[m.start()] == 0)
}

fn column_name(raw: &str) -> String {
    raw.trim_matches('"').to_lowercase()
}

/// Checks SELECT projections against declared `returns.fields`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionValidator;

impl ProjectionValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, contract: &DbRepositoryContract) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (name, op) in &contract.ops {
            result.merge(self.validate_operation(name, op));
        }
        result.finish("projection")
    }

    pub fn validate_operation(&self, op_name: &str, op: &OpSpec) -> ValidationResult {
        let mut result = ValidationResult::new();
        if op.mode == OpMode::Write {
            return result.finish(op_name);
        }

        let returns = &op.returns;
        let declared = returns.declared_fields();
        let strict = returns.strict.unwrap_or(!declared.is_empty());

        if declared.is_empty() {
            if returns.strict == Some(true) {
                result.warning(format!(
                    "operation '{}' enables strict mode but declares no return fields",
                    op_name
                ));
            }
            return result.finish(op_name);
        }

        if let Some(open) = unterminated_quote(&op.sql) {
            result.error(format!(
                "operation '{}' could not be parsed: unterminated {}; projection is not certified",
                op_name, open
            ));
            return result.finish(op_name);
        }

        let Some(items) = extract_projection(&op.sql) else {
            report(
                &mut result,
                strict,
                format!("operation '{}' has no SELECT list to compare with declared fields", op_name),
            );
            return result.finish(op_name);
        };

        if items.contains(&ProjectedItem::Wildcard) {
            match (returns.allow_select_star, strict) {
                (true, false) => {}
                (true, true) => result.warning(format!(
                    "operation '{}' uses SELECT *; permitted by allow_select_star, but strict mode cannot verify projected fields",
                    op_name
                )),
                (false, true) => result.error(format!(
                    "operation '{}': SELECT * is not allowed in strict mode; list the declared fields explicitly",
                    op_name
                )),
                (false, false) => result.warning(format!(
                    "operation '{}' uses SELECT *; list columns explicitly so the projection can be checked",
                    op_name
                )),
            }
            return result.finish(op_name);
        }

        let complex: Vec<&str> = items
            .iter()
            .filter_map(|item| match item {
                ProjectedItem::Complex(expr) => Some(expr.as_str()),
                _ => None,
            })
            .collect();
        if !complex.is_empty() {
            report(
                &mut result,
                strict,
                format!(
                    "operation '{}' projects expressions that cannot be mapped to column names (add an alias): {}",
                    op_name,
                    complex.join(", ")
                ),
            );
            return result.finish(op_name);
        }

        let declared: BTreeSet<String> = declared.iter().map(|f| column_name(f.trim())).collect();
        let projected: BTreeSet<String> = items
            .into_iter()
            .filter_map(|item| match item {
                ProjectedItem::Column(name) => Some(name),
                _ => None,
            })
            .collect();

        let missing: Vec<&str> = declared.difference(&projected).map(String::as_str).collect();
        let undeclared: Vec<&str> = projected.difference(&declared).map(String::as_str).collect();
        if !missing.is_empty() || !undeclared.is_empty() {
            report(
                &mut result,
                strict,
                format!(
                    "operation '{}' projection does not match declared fields; declared but missing from SQL: [{}]; present in SQL but undeclared: [{}]",
                    op_name,
                    missing.join(", "),
                    undeclared.join(", ")
                ),
            );
        }

        result.finish(op_name)
    }
}

fn report(result: &mut ValidationResult, strict: bool, message: String) {
    if strict {
        result.error(message);
    } else {
        result.warning(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ReturnsSpec;
    use test_case::test_case;

    fn op(sql: &str, fields: &[&str], strict: Option<bool>, allow_select_star: bool) -> OpSpec {
        OpSpec {
            sql: sql.to_string(),
            mode: OpMode::Read,
            returns: ReturnsSpec {
                fields: if fields.is_empty() {
                    None
                } else {
                    Some(fields.iter().map(|f| f.to_string()).collect())
                },
                strict,
                allow_select_star,
            },
        }
    }

    fn column(name: &str) -> ProjectedItem {
        ProjectedItem::Column(name.to_string())
    }

    #[test]
    fn test_extracts_simple_columns() {
        assert_eq!(
            extract_projection("SELECT u.id, \"Name\" FROM users u").unwrap(),
            vec![column("id"), column("name")]
        );
    }

    #[test_case("SELECT count(*) AS total FROM t", "total" ; "explicit alias")]
    #[test_case("SELECT count(*) total FROM t", "total" ; "implicit alias")]
    #[test_case("SELECT CASE WHEN a THEN 1 ELSE 0 END AS flag FROM t", "flag" ; "case alias")]
    #[test_case("SELECT u.name username FROM users u", "username" ; "column with implicit alias")]
    #[test_case("SELECT coalesce(a AND b, false) flag FROM t", "flag" ; "operator inside call")]
    #[test_case("SELECT DISTINCT id FROM t", "id" ; "distinct")]
    #[test_case("SELECT DISTINCT ON (id) id FROM t", "id" ; "distinct on")]
    fn test_aliased_expressions_are_columns(sql: &str, expected: &str) {
        assert_eq!(extract_projection(sql).unwrap(), vec![column(expected)]);
    }

    #[test_case("SELECT count(*) FROM t" ; "function call")]
    #[test_case("SELECT CASE WHEN a THEN 1 ELSE 0 END FROM t" ; "case")]
    #[test_case("SELECT a + b FROM t" ; "arithmetic")]
    #[test_case("SELECT NOT deleted FROM t" ; "negation")]
    #[test_case("SELECT active AND deleted FROM t" ; "conjunction")]
    #[test_case("SELECT active OR deleted FROM t" ; "disjunction")]
    #[test_case("SELECT x BETWEEN 1 AND deleted FROM t" ; "between")]
    #[test_case("SELECT name NOT LIKE pattern FROM t" ; "not like")]
    #[test_case("SELECT x IS NOT deleted FROM t" ; "is not")]
    fn test_unaliased_expressions_are_complex(sql: &str) {
        let items = extract_projection(sql).unwrap();
        assert!(matches!(items[0], ProjectedItem::Complex(_)), "{:?}", items);
    }

    #[test]
    fn test_from_inside_function_does_not_end_list() {
        assert_eq!(
            extract_projection("SELECT EXTRACT(YEAR FROM created_at) AS year, id FROM events").unwrap(),
            vec![column("year"), column("id")]
        );
    }

    #[test]
    fn test_select_star_rejected_in_default_strict_mode() {
        let result = ProjectionValidator.validate_operation(
            "list_users",
            &op("SELECT * FROM users", &["id", "name"], None, false),
        );
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 0);
        assert!(result.errors[0].contains("SELECT * is not allowed in strict mode"));
    }

    #[test_case(true, Some(false), 0, 0 ; "allowed and lenient is silent")]
    #[test_case(true, Some(true), 0, 1 ; "allowed and strict warns")]
    #[test_case(false, Some(false), 0, 1 ; "lenient without allow warns")]
    #[test_case(false, Some(true), 1, 0 ; "strict without allow errors")]
    fn test_wildcard_matrix(allow: bool, strict: Option<bool>, errors: usize, warnings: usize) {
        let result = ProjectionValidator
            .validate_operation("op", &op("SELECT u.* FROM users u", &["id"], strict, allow));
        assert_eq!(result.error_count(), errors);
        assert_eq!(result.warning_count(), warnings);
    }

    #[test]
    fn test_matching_columns_are_clean() {
        let result = ProjectionValidator
            .validate_operation("get_user", &op("SELECT id, name FROM users", &["ID", "name"], None, false));
        assert!(result.is_clean(), "{:?}", result);
    }

    #[test]
    fn test_mismatch_lists_both_sides() {
        let result = ProjectionValidator.validate_operation(
            "get_user",
            &op("SELECT id, email FROM users", &["id", "name"], None, false),
        );
        assert_eq!(result.error_count(), 1);
        let message = &result.errors[0];
        assert!(message.contains("declared but missing from SQL: [name]"));
        assert!(message.contains("present in SQL but undeclared: [email]"));
    }

    #[test]
    fn test_mismatch_is_a_warning_when_lenient() {
        let result = ProjectionValidator.validate_operation(
            "get_user",
            &op("SELECT id FROM users", &["id", "name"], Some(false), false),
        );
        assert_eq!(result.error_count(), 0);
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_complex_expression_stops_validation() {
        let result = ProjectionValidator
            .validate_operation("count", &op("SELECT count(*), id FROM users", &["total"], None, false));
        assert_eq!(result.error_count(), 1);
        assert!(result.errors[0].contains("count(*)"));
    }

    #[test_case("SELECT id, NOT deleted FROM users" ; "negation")]
    #[test_case("SELECT id, active AND deleted FROM users" ; "conjunction")]
    #[test_case("SELECT id, x BETWEEN 1 AND deleted FROM users" ; "between")]
    fn test_boolean_expression_does_not_match_declared_field(sql: &str) {
        let result = ProjectionValidator.validate_operation("flags", &op(sql, &["id", "deleted"], None, false));
        assert_eq!(result.error_count(), 1, "{:?}", result);
        assert!(result.errors[0].contains("cannot be mapped to column names"));
    }

    #[test]
    fn test_no_fields_skips_unless_strict_forced() {
        let skipped = ProjectionValidator.validate_operation("op", &op("SELECT * FROM t", &[], None, false));
        assert!(skipped.is_clean());

        let forced = ProjectionValidator.validate_operation("op", &op("SELECT * FROM t", &[], Some(true), false));
        assert_eq!(forced.error_count(), 0);
        assert_eq!(forced.warning_count(), 1);
    }

    #[test]
    fn test_write_operations_are_skipped() {
        let mut spec = op("UPDATE users SET name = $1", &["id"], Some(true), false);
        spec.mode = OpMode::Write;
        assert!(ProjectionValidator.validate_operation("rename", &spec).is_clean());
    }

    #[test]
    fn test_unterminated_literal_is_an_error_even_when_lenient() {
        let result = ProjectionValidator
            .validate_operation("op", &op("SELECT id FROM users WHERE note = 'open", &["id"], Some(false), false));
        assert_eq!(result.error_count(), 1);
        assert!(result.errors[0].contains("unterminated string literal"));
    }
}
