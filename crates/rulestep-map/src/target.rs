//! Target-code parser.
//!
//! Classifies each line of generated code with the shared statement
//! taxonomy and decides whether it is instrumentable: a realistic place for
//! a breakpoint or a step in the generated-code frame.
//!
//! Not instrumentable:
//! - class and function definitions, decorators
//! - imports
//! - bare control keywords (`else:`, `try:`, `pass`, `break`, ...)
//! - compiler scaffolding (`__STEP_CONTROL__(...)` and other dunder helpers)
//! - trivial expressions (a lone name, literal or docstring)

use lazy_static::lazy_static;
use regex::Regex;
use rulestep_lang::{assignment_target, extract_identifiers, find_assignment_operator, StatementKind};
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SCAFFOLDING: Regex = Regex::new(r"^__[A-Za-z0-9_]+__\s*\(").unwrap();

    static ref IMPORT: Regex = Regex::new(r"^(import\s|from\s+\S+\s+import\s)").unwrap();

    static ref DEFINITION: Regex =
        Regex::new(r"^(class\s|def\s|async\s+def\s|function\s|@[A-Za-z_])").unwrap();

    static ref BARE_CONTROL: Regex = Regex::new(
        r"^(else\s*:|try\s*:|finally\s*:|except\b.*:|pass|break|continue|return|[{}\[\]()]+;?)$"
    ).unwrap();

    static ref CONDITION: Regex = Regex::new(r"^(if|elif|else\s+if)\b").unwrap();

    static ref LOOP: Regex = Regex::new(r"^(for|while|async\s+for)\b").unwrap();

    static ref CALL: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\s*\(.*\)\s*;?$").unwrap();

    static ref TRIVIAL: Regex = Regex::new(
        r#"^([A-Za-z_][A-Za-z0-9_]*|-?\d+(\.\d+)?|"[^"]*"|'[^']*'|""".*|'''.*|\.\.\.)$"#
    ).unwrap();
}

/// Generated-code words that are never variables
const TARGET_KEYWORDS: &[&str] = &[
    "self", "None", "True", "False", "not", "in", "is", "elif", "else", "for", "while",
    "return", "def", "class", "lambda", "import", "from", "as", "try", "except", "finally",
    "pass", "break", "continue", "with", "yield", "await", "async", "global", "nonlocal",
];

const AUGMENTED_OPERATORS: &str = "+-*/%&|^@<>";

/// One line of generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStatement {
    /// 1-based line number
    pub line: u32,
    pub text: String,
    /// Leading whitespace width
    pub indent: usize,
    pub kind: StatementKind,
    pub defined: Vec<String>,
    pub referenced: Vec<String>,
    pub is_instrumentable: bool,
}

impl TargetStatement {
    /// Defined and referenced names, deduplicated
    pub fn variables(&self) -> impl Iterator<Item = &String> {
        self.defined
            .iter()
            .chain(self.referenced.iter().filter(|r| !self.defined.contains(r)))
    }
}

/// Parse generated code into one statement per line
pub fn parse_target_code(code: &str) -> Vec<TargetStatement> {
    code.lines()
        .enumerate()
        .map(|(index, raw)| parse_target_line(raw, index as u32 + 1))
        .collect()
}

pub fn parse_target_line(raw: &str, line: u32) -> TargetStatement {
    let text = raw.trim();
    let indent = raw.len() - raw.trim_start().len();
    let (kind, is_instrumentable) = classify_target(text);

    let (defined, referenced) = match kind {
        StatementKind::Comment | StatementKind::Empty => (Vec::new(), Vec::new()),
        _ if !is_instrumentable => (Vec::new(), Vec::new()),
        StatementKind::Assignment => split_assignment(text),
        _ => (Vec::new(), filter_keywords(extract_identifiers(text))),
    };

    TargetStatement {
        line,
        text: text.to_string(),
        indent,
        kind,
        defined,
        referenced,
        is_instrumentable,
    }
}

/// Kind and instrumentability of trimmed generated code
pub fn classify_target(text: &str) -> (StatementKind, bool) {
    if text.is_empty() {
        return (StatementKind::Empty, false);
    }
    if text.starts_with('#') || text.starts_with("//") {
        return (StatementKind::Comment, false);
    }
    if SCAFFOLDING.is_match(text) {
        return (StatementKind::FunctionCall, false);
    }
    if IMPORT.is_match(text) || DEFINITION.is_match(text) || BARE_CONTROL.is_match(text) {
        return (StatementKind::Expression, false);
    }
    if CONDITION.is_match(text) {
        return (StatementKind::Condition, true);
    }
    if LOOP.is_match(text) {
        return (StatementKind::Loop, true);
    }
    if find_assignment_operator(text).is_some() && !CALL.is_match(text) {
        return (StatementKind::Assignment, true);
    }
    if CALL.is_match(text) {
        return (StatementKind::FunctionCall, true);
    }
    (StatementKind::Expression, !TRIVIAL.is_match(text))
}

/// Targets on the left (`a, b = ...`, `x: int = ...`, `total += ...`) and
/// names read on the right
fn split_assignment(text: &str) -> (Vec<String>, Vec<String>) {
    let Some(op) = find_assignment_operator(text) else {
        return (Vec::new(), filter_keywords(extract_identifiers(text)));
    };
    let raw_lhs = text[..op].trim_end();
    let is_augmented = raw_lhs.ends_with(|c: char| AUGMENTED_OPERATORS.contains(c));
    let lhs = raw_lhs.trim_end_matches(|c: char| AUGMENTED_OPERATORS.contains(c));
    let lhs = lhs.split(':').next().unwrap_or(lhs);

    let mut defined = Vec::new();
    for target in lhs.split(',') {
        let target = target.trim().trim_start_matches("self.");
        if let Some(var) = assignment_target(target) {
            if !defined.contains(&var.name) && !TARGET_KEYWORDS.contains(&var.name.as_str()) {
                defined.push(var.name);
            }
        }
    }

    let mut referenced = filter_keywords(extract_identifiers(&text[op + 1..]));
    // augmented assignment reads its target too
    if is_augmented {
        for name in &defined {
            if !referenced.contains(name) {
                referenced.push(name.clone());
            }
        }
    }
    (defined, referenced)
}

fn filter_keywords(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|n| !TARGET_KEYWORDS.contains(&n.as_str()))
        .collect()
}
