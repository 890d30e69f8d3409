//! Keyword-anchored table extraction over normalized SQL
//!
//! Matches `FROM`, `JOIN`, `INTO`, `UPDATE` and `DELETE FROM`. A keyword that
//! sits inside a function call's parentheses (`EXTRACT(YEAR FROM ts)`) is not
//! a table reference and is skipped; one inside a parenthesized `SELECT` is.

use regex::Regex;
use std::collections::BTreeSet;

use super::adapter::{ParserResult, TableExtractor};
use super::normalize::{cte_names, normalize_sql, paren_depths, unterminated_quote};

lazy_static! {
    static ref FROM_KEYWORD: Regex = Regex::new(r"(?i)\bFROM\s+").unwrap();
    static ref SINGLE_TABLE_KEYWORD: Regex =
        Regex::new(r"(?i)\b(?:JOIN(?:\s+LATERAL)?|INTO|UPDATE)\s+").unwrap();
}

/// Words that can follow a table keyword but never name a table
const NON_TABLE_WORDS: &[&str] = &[
    "select", "set", "values", "lateral", "only", "where", "on", "using", "default",
];

/// Words that end a table reference and therefore cannot be an alias
const CLAUSE_WORDS: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "cross", "natural", "outer", "on",
    "using", "group", "order", "limit", "offset", "having", "union", "except", "intersect",
    "returning", "for", "window", "set", "fetch", "values", "select", "into", "as",
];

pub struct RegexExtractor;

impl TableExtractor for RegexExtractor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, sql: &str, max_depth: usize) -> ParserResult {
        let normalized = normalize_sql(sql);
        if normalized.is_empty() {
            return ParserResult::failed("SQL statement is empty");
        }
        if let Some(open) = unterminated_quote(sql) {
            return ParserResult::failed(format!("unterminated {}", open));
        }

        let deepest = paren_depths(&normalized).into_iter().max().unwrap_or(0);
        if deepest > max_depth {
            return ParserResult::failed(format!(
                "parenthesis nesting depth {} exceeds limit {}",
                deepest, max_depth
            ));
        }

        let mut tables = BTreeSet::new();

        for keyword in FROM_KEYWORD.find_iter(&normalized) {
            if !is_table_position(&normalized, keyword.start()) {
                continue;
            }
            read_table_list(&normalized, keyword.end(), &mut tables);
        }

        for keyword in SINGLE_TABLE_KEYWORD.find_iter(&normalized) {
            if !is_table_position(&normalized, keyword.start()) {
                continue;
            }
            let pos = skip_word(&normalized, keyword.end(), "only");
            if let Some((name, _)) = read_qualified_ident(&normalized, pos) {
                if !NON_TABLE_WORDS.contains(&name.to_lowercase().as_str()) {
                    tables.insert(name);
                }
            }
        }

        ParserResult::ok(tables, cte_names(&normalized).into_iter().collect())
    }
}

/// A keyword at top level, or directly inside a parenthesized SELECT
fn is_table_position(sql: &str, pos: usize) -> bool {
    match enclosing_open_paren(sql, pos) {
        None => true,
        Some(open) => sql[open + 1..].trim_start().to_lowercase().starts_with("select"),
    }
}

fn enclosing_open_paren(sql: &str, pos: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    for i in (0..pos).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth == 0 => return Some(i),
            b'(' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Read `FROM a [AS] x, b y, ...` starting after the FROM keyword
fn read_table_list(sql: &str, mut pos: usize, tables: &mut BTreeSet<String>) {
    loop {
        pos = skip_word(sql, pos, "only");
        let Some((name, end)) = read_qualified_ident(sql, pos) else {
            return;
        };
        pos = skip_spaces(sql, end);

        // table-valued function call, not a relation
        if sql[pos..].starts_with('(') {
            match matching_close_paren(sql, pos) {
                Some(close) => pos = skip_spaces(sql, close + 1),
                None => return,
            }
        } else if !NON_TABLE_WORDS.contains(&name.to_lowercase().as_str()) {
            tables.insert(name);
        }

        pos = skip_alias(sql, pos);
        if sql[pos..].starts_with(',') {
            pos = skip_spaces(sql, pos + 1);
        } else {
            return;
        }
    }
}

fn skip_alias(sql: &str, pos: usize) -> usize {
    let Some((word, end)) = read_plain_word(sql, pos) else {
        return pos;
    };
    let lowered = word.to_lowercase();
    if lowered == "as" {
        let after_as = skip_spaces(sql, end);
        return match read_qualified_ident(sql, after_as) {
            Some((_, alias_end)) => skip_spaces(sql, alias_end),
            None => after_as,
        };
    }
    if CLAUSE_WORDS.contains(&lowered.as_str()) {
        return pos;
    }
    skip_spaces(sql, end)
}

fn skip_word(sql: &str, pos: usize, word: &str) -> usize {
    match read_plain_word(sql, pos) {
        Some((found, end)) if found.eq_ignore_ascii_case(word) => skip_spaces(sql, end),
        _ => pos,
    }
}

fn skip_spaces(sql: &str, pos: usize) -> usize {
    pos + sql[pos..].len() - sql[pos..].trim_start().len()
}

fn read_plain_word(sql: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = &sql[pos..];
    let len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let first = rest.chars().next()?;
    if len == 0 || !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    Some((&rest[..len], pos + len))
}

/// Read `part(.part)*`, where a part is a plain, "double", `back` or [bracket] quoted identifier
fn read_qualified_ident(sql: &str, pos: usize) -> Option<(String, usize)> {
    let mut parts = Vec::new();
    let mut cursor = pos;
    loop {
        let (part, end) = read_ident_part(sql, cursor)?;
        parts.push(part);
        cursor = end;
        if sql[cursor..].starts_with('.') {
            cursor += 1;
        } else {
            break;
        }
    }
    Some((parts.join("."), cursor))
}

fn read_ident_part(sql: &str, pos: usize) -> Option<(String, usize)> {
    let rest = &sql[pos..];
    let close = match rest.chars().next()? {
        '"' => '"',
        '`' => '`',
        '[' => ']',
        _ => return read_plain_word(sql, pos).map(|(word, end)| (word.to_string(), end)),
    };
    let inner = &rest[1..];
    let end = inner.find(close)?;
    Some((inner[..end].to_string(), pos + 1 + end + 1))
}

fn matching_close_paren(sql: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in sql.as_bytes().iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
