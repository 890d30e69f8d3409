//! Text-level SQL preparation shared by the table and projection validators
//!
//! Normalization removes everything that could make keyword patterns match
//! outside real SQL structure: comments are dropped, string literal contents
//! are emptied, and whitespace is collapsed to single spaces.

use regex::Regex;
use std::fmt;

lazy_static! {
    static ref CTE_PATTERN: Regex = Regex::new(
        r#"(?i)\bWITH\s+(?:RECURSIVE\s+)?(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\)\s*)?AS\s*(?:NOT\s+MATERIALIZED\s*|MATERIALIZED\s*)?\("#
    )
    .unwrap();
    static ref CTE_NAME_PATTERN: Regex = Regex::new(
        r#"(?i)(?:\bWITH\s+(?:RECURSIVE\s+)?|,\s*)("[^"]+"|[A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\)\s*)?AS\s*(?:NOT\s+MATERIALIZED\s*|MATERIALIZED\s*)?\("#
    )
    .unwrap();
    static ref SUBQUERY_PATTERN: Regex = Regex::new(r"(?i)\(\s*SELECT\b").unwrap();
}

/// SQL shapes the text-level validators refuse to certify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnsupportedConstruct {
    /// `WITH name AS (...)`
    CommonTableExpression,
    /// `(SELECT ...)`
    Subquery,
}

impl UnsupportedConstruct {
    pub fn label(&self) -> &'static str {
        match self {
            UnsupportedConstruct::CommonTableExpression => "CTE (WITH ... AS)",
            UnsupportedConstruct::Subquery => "subquery ((SELECT ...))",
        }
    }
}

impl fmt::Display for UnsupportedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    Literal,
    QuotedIdent,
}

/// Strip comments, empty string literals, and collapse whitespace
pub fn normalize_sql(sql: &str) -> String {
    scan(sql).text
}

/// The kind of quote or comment left open at the end of `sql`, if any
///
/// Normalized text after an unclosed quote is meaningless, so callers must
/// treat such SQL as unparseable.
pub fn unterminated_quote(sql: &str) -> Option<&'static str> {
    scan(sql).unterminated
}

struct Scanned {
    text: String,
    unterminated: Option<&'static str>,
}

fn scan(sql: &str) -> Scanned {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut state = ScanState::Code;
    let mut backslash_escapes = false;
    let mut open_dollar_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            ScanState::Code => match c {
                '-' if next == Some('-') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    state = ScanState::BlockComment;
                    i += 1;
                }
                '\'' => {
                    out.push('\'');
                    backslash_escapes = has_escape_prefix(&chars, i);
                    state = ScanState::Literal;
                }
                '"' => {
                    out.push('"');
                    state = ScanState::QuotedIdent;
                }
                '$' => match dollar_quote_tag(&chars, i) {
                    Some(tag) => {
                        // $tag$ ... $tag$ is a literal; keep an empty one in its place
                        out.push_str("''");
                        match skip_dollar_quoted(&chars, i + tag.len(), &tag) {
                            Some(end) => i = end,
                            None => {
                                open_dollar_quote = true;
                                i = chars.len();
                            }
                        }
                        continue;
                    }
                    None => out.push(c),
                },
                c if c.is_whitespace() => push_space(&mut out),
                c => out.push(c),
            },
            ScanState::LineComment => {
                if c == '\n' {
                    push_space(&mut out);
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && next == Some('/') {
                    push_space(&mut out);
                    state = ScanState::Code;
                    i += 1;
                }
            }
            ScanState::Literal => {
                if backslash_escapes && c == '\\' {
                    i += 1;
                } else if c == '\'' {
                    if next == Some('\'') {
                        i += 1;
                    } else {
                        out.push('\'');
                        state = ScanState::Code;
                    }
                }
            }
            ScanState::QuotedIdent => {
                out.push(c);
                if c == '"' {
                    state = ScanState::Code;
                }
            }
        }
        i += 1;
    }

    let unterminated = match state {
        _ if open_dollar_quote => Some("dollar-quoted string"),
        ScanState::Literal => Some("string literal"),
        ScanState::QuotedIdent => Some("quoted identifier"),
        ScanState::BlockComment => Some("block comment"),
        ScanState::Code | ScanState::LineComment => None,
    };
    Scanned { text: out.trim().to_string(), unterminated }
}

/// `E'...'` opens a literal where backslash escapes the next character
fn has_escape_prefix(chars: &[char], quote: usize) -> bool {
    let Some(prefix) = quote.checked_sub(1).map(|p| chars[p]) else {
        return false;
    };
    let standalone = quote
        .checked_sub(2)
        .map(|p| !(chars[p].is_alphanumeric() || chars[p] == '_' || chars[p] == '$'))
        .unwrap_or(true);
    matches!(prefix, 'E' | 'e') && standalone
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Returns `$tag$` (including both dollars) when a dollar quote opens at `start`
fn dollar_quote_tag(chars: &[char], start: usize) -> Option<String> {
    let mut tag = String::from("$");
    let mut j = start + 1;
    while let Some(&c) = chars.get(j) {
        if c == '$' {
            tag.push('$');
            return Some(tag);
        }
        let valid = if tag.len() == 1 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
        tag.push(c);
        j += 1;
    }
    None
}

/// Index just past the closing tag, or `None` when the quote never closes
fn skip_dollar_quoted(chars: &[char], body_start: usize, tag: &str) -> Option<usize> {
    let tag: Vec<char> = tag.chars().collect();
    let mut j = body_start;
    while j + tag.len() <= chars.len() {
        if chars[j..j + tag.len()] == tag[..] {
            return Some(j + tag.len());
        }
        j += 1;
    }
    None
}

/// Detect constructs in normalized SQL that cannot be validated reliably
pub fn detect_unsupported_constructs(normalized: &str) -> Vec<UnsupportedConstruct> {
    let mut found = Vec::new();
    if CTE_PATTERN.is_match(normalized) {
        found.push(UnsupportedConstruct::CommonTableExpression);
    }
    if SUBQUERY_PATTERN.is_match(normalized) {
        found.push(UnsupportedConstruct::Subquery);
    }
    found
}

/// Names bound by `WITH name AS (` clauses, lowercased
pub fn cte_names(normalized: &str) -> Vec<String> {
    if !CTE_PATTERN.is_match(normalized) {
        return Vec::new();
    }
    CTE_NAME_PATTERN
        .captures_iter(normalized)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('"').to_lowercase())
        .collect()
}

/// Parenthesis depth at every byte offset of `sql`, ignoring quoted text
///
/// Normalized SQL has emptied literals, so counting raw parentheses outside
/// double quotes is exact.
pub fn paren_depths(sql: &str) -> Vec<usize> {
    let mut depths = Vec::with_capacity(sql.len());
    let mut depth = 0usize;
    let mut quoted = false;
    for c in sql.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            _ => {}
        }
        // parentheses themselves count as the outer level
        let recorded = if c == '(' && !quoted { depth - 1 } else { depth };
        for _ in 0..c.len_utf8() {
            depths.push(recorded);
        }
    }
    depths
}
