//! Rule-block parser.
//!
//! A coarser pass over rule source than the statement parser: comments and
//! blank lines are dropped, and a logical statement that continues over
//! several lines (open brackets, trailing `\`, `,` or a boolean operator)
//! becomes a single block anchored at its first line.

use lazy_static::lazy_static;
use regex::Regex;
use rulestep_lang::{parse_line, statement::is_comment, StatementKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

lazy_static! {
    static ref CONDITION_START: Regex =
        Regex::new(r"^(if|elif|else\s+if|when|unless)\b").unwrap();

    static ref LOOP_START: Regex =
        Regex::new(r"^(for|while|foreach|each|repeat)\b").unwrap();

    static ref CALL: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\s*\(.*\)\s*;?$").unwrap();
}

/// A coarse unit of rule source used for alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBlock {
    /// First line of the block, 1-based
    pub line: u32,
    /// Last line of the block
    pub end_line: u32,
    /// Block text with continuation lines joined by a space
    pub text: String,
    pub kind: StatementKind,
    /// Defined and referenced names
    pub variables: BTreeSet<String>,
}

/// Split rule source into blocks
pub fn parse_rule_blocks(source: &str) -> Vec<RuleBlock> {
    let mut blocks = Vec::new();
    let mut pending: Option<PendingBlock> = None;

    for (index, raw) in source.lines().enumerate() {
        let line = index as u32 + 1;
        let text = raw.trim();
        let skipped = text.is_empty() || is_comment(text);

        match pending.as_mut() {
            Some(block) => {
                if !skipped {
                    block.append(text);
                }
                block.end = line;
            }
            None if skipped => continue,
            None => pending = Some(PendingBlock::new(line, text)),
        }

        if !pending.as_ref().is_some_and(PendingBlock::continues) {
            if let Some(block) = pending.take() {
                blocks.push(block.finish());
            }
        }
    }

    // unterminated block at end of input
    if let Some(block) = pending.take() {
        blocks.push(block.finish());
    }
    blocks
}

/// A block still being joined. Bracket depth is kept as lines arrive so
/// each line is scanned once.
struct PendingBlock {
    start: u32,
    end: u32,
    text: String,
    depth: i32,
    open_tail: bool,
}

impl PendingBlock {
    fn new(line: u32, text: &str) -> Self {
        let mut block = Self {
            start: line,
            end: line,
            text: String::new(),
            depth: 0,
            open_tail: false,
        };
        block.append(text);
        block
    }

    fn append(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);

        let blanked = rulestep_lang::statement::blank_string_literals(text);
        self.depth += bracket_delta(&blanked);
        self.open_tail = ends_with_continuation(&blanked);
    }

    /// Whether the logical statement carries on past the last line
    fn continues(&self) -> bool {
        self.depth > 0 || self.open_tail
    }

    fn finish(self) -> RuleBlock {
        build_block(self.start, self.end, self.text)
    }
}

fn build_block(line: u32, end_line: u32, text: String) -> RuleBlock {
    let statement = parse_line(&text, line);
    let variables = statement
        .defined
        .iter()
        .map(|v| v.name.clone())
        .chain(statement.referenced.iter().cloned())
        .collect();

    RuleBlock {
        line,
        end_line,
        kind: classify_block(&text, statement.kind),
        text,
        variables,
    }
}

/// Refine the statement-level kind with loop and call detection
fn classify_block(text: &str, statement_kind: StatementKind) -> StatementKind {
    if CONDITION_START.is_match(text) {
        StatementKind::Condition
    } else if LOOP_START.is_match(text) {
        StatementKind::Loop
    } else if statement_kind == StatementKind::Expression && CALL.is_match(text) {
        StatementKind::FunctionCall
    } else {
        statement_kind
    }
}

fn bracket_delta(blanked: &str) -> i32 {
    blanked
        .bytes()
        .map(|b| match b {
            b'(' | b'[' | b'{' => 1,
            b')' | b']' | b'}' => -1,
            _ => 0,
        })
        .sum()
}

fn ends_with_continuation(blanked: &str) -> bool {
    let tail = blanked.trim_end();
    tail.ends_with('\\')
        || tail.ends_with(',')
        || tail.ends_with(" and")
        || tail.ends_with(" or")
        || tail.ends_with("&&")
        || tail.ends_with("||")
}
