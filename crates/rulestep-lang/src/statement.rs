//! Statement parser for rule-language source.
//!
//! Each source line becomes exactly one [`Statement`]. Classification is a
//! fixed precedence over the trimmed text:
//! - comment (`//` or `#` prefix) and empty lines are kept for line continuity
//! - `Condition` when the line starts with `if ` or contains ` if `
//! - `Assignment` when the line holds a bare `=` (not `==`, `!=`, `<=`, `>=`)
//! - `Expression` otherwise
//!
//! Parsing never fails and never evaluates anything.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Identifier-like tokens
    static ref IDENTIFIER: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();

    /// Assignment target: identifier with optional dotted path
    static ref ASSIGNMENT_TARGET: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)((?:\.[A-Za-z_][A-Za-z0-9_]*)*)$").unwrap();
}

/// Words never reported as referenced variables
pub const KEYWORD_STOPLIST: &[&str] = &["if", "and", "or", "true", "false", "null"];

/// Statement taxonomy shared by every parser in the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Assignment,
    Condition,
    Loop,
    FunctionCall,
    Comment,
    Empty,
    Expression,
}

impl StatementKind {
    /// Comments and empty lines are never executed
    pub fn is_executable(&self) -> bool {
        !matches!(self, StatementKind::Comment | StatementKind::Empty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Assignment => "assignment",
            StatementKind::Condition => "condition",
            StatementKind::Loop => "loop",
            StatementKind::FunctionCall => "function_call",
            StatementKind::Comment => "comment",
            StatementKind::Empty => "empty",
            StatementKind::Expression => "expression",
        }
    }
}

/// A variable defined by a statement. Values are resolved at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    /// Base name (`order` for `order.total = 5`)
    pub name: String,
    /// Full dotted path as written
    pub path: String,
}

/// One classified, line-addressed unit of rule source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    /// 1-based line number
    pub line: u32,
    /// Trimmed line text
    pub text: String,
    pub defined: Vec<VariableRef>,
    pub referenced: Vec<String>,
}

impl Statement {
    pub fn is_executable(&self) -> bool {
        self.kind.is_executable()
    }
}

/// Parse rule-language source into one statement per line
pub fn parse_statements(source: &str) -> Vec<Statement> {
    source
        .lines()
        .enumerate()
        .map(|(index, raw)| parse_line(raw, index as u32 + 1))
        .collect()
}

/// Parse a single line of rule source
pub fn parse_line(raw: &str, line: u32) -> Statement {
    let text = raw.trim().to_string();
    let kind = classify(&text);

    let (defined, referenced) = if kind.is_executable() {
        extract_variables(&text, kind)
    } else {
        (Vec::new(), Vec::new())
    };

    Statement {
        kind,
        line,
        text,
        defined,
        referenced,
    }
}

/// Classify trimmed rule text
pub fn classify(trimmed: &str) -> StatementKind {
    if trimmed.is_empty() {
        StatementKind::Empty
    } else if is_comment(trimmed) {
        StatementKind::Comment
    } else if trimmed.starts_with("if ") || trimmed.contains(" if ") {
        StatementKind::Condition
    } else if find_assignment_operator(trimmed).is_some() {
        StatementKind::Assignment
    } else {
        StatementKind::Expression
    }
}

pub fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

fn extract_variables(text: &str, kind: StatementKind) -> (Vec<VariableRef>, Vec<String>) {
    if kind == StatementKind::Assignment {
        if let Some(op) = find_assignment_operator(text) {
            let defined = assignment_target(&text[..op]).into_iter().collect();
            let referenced = extract_identifiers(&text[op + 1..]);
            return (defined, referenced);
        }
    }
    (Vec::new(), extract_identifiers(text))
}

/// Resolve an assignment left-hand side to its base name and dotted path
pub fn assignment_target(lhs: &str) -> Option<VariableRef> {
    let lhs = lhs.trim();
    let caps = ASSIGNMENT_TARGET.captures(lhs)?;
    Some(VariableRef {
        name: caps[1].to_string(),
        path: lhs.to_string(),
    })
}

/// Byte offset of the first bare `=` outside string literals.
///
/// `==`, `!=`, `<=` and `>=` are comparison operators and never match.
pub fn find_assignment_operator(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'=' => {
                let prev = if i > 0 { bytes[i - 1] } else { b' ' };
                let next = bytes.get(i + 1).copied().unwrap_or(b' ');
                if !matches!(prev, b'=' | b'!' | b'<' | b'>') && next != b'=' {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace the contents of quoted strings with spaces, keeping byte offsets
pub fn blank_string_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        match quote {
            Some(q) => {
                if !escaped && c == q {
                    quote = None;
                    out.push(c);
                    continue;
                }
                escaped = !escaped && c == '\\';
                // same byte width so offsets line up with the source
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Identifier-like tokens outside string literals, deduplicated in order.
///
/// Tokens directly after a `.` are property or method names and are skipped,
/// as is the keyword stoplist.
pub fn extract_identifiers(text: &str) -> Vec<String> {
    let blanked = blank_string_literals(text);
    let bytes = blanked.as_bytes();
    let mut names: Vec<String> = Vec::new();

    for m in IDENTIFIER.find_iter(&blanked) {
        let start = m.start();
        if start > 0 {
            let prev = bytes[start - 1];
            if prev == b'.' || prev.is_ascii_digit() {
                continue;
            }
        }
        let token = m.as_str();
        if KEYWORD_STOPLIST.contains(&token) {
            continue;
        }
        if !names.iter().any(|n| n == token) {
            names.push(token.to_string());
        }
    }
    names
}
