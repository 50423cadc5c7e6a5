//! Statement matching between generated code and rule blocks.
//!
//! Every instrumentable generated statement is scored against every rule
//! block with four bounded, additive components:
//!
//! | component | max |
//! |-----------|-----|
//! | kind compatibility | 0.4 |
//! | variable overlap | 0.4 |
//! | content similarity | 0.3 |
//! | line proximity | 0.1 |
//!
//! The sum is clamped to 1.0. The best block at or above the confidence
//! floor wins, the first one seen on a tie. Below the floor the line is left
//! unmapped.

use crate::blocks::RuleBlock;
use crate::generator::MapOptions;
use crate::target::TargetStatement;
use lazy_static::lazy_static;
use regex::Regex;
use rulestep_lang::StatementKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

pub const TYPE_WEIGHT: f32 = 0.4;
pub const VARIABLE_WEIGHT: f32 = 0.4;
pub const CONTENT_WEIGHT: f32 = 0.3;
pub const POSITION_WEIGHT: f32 = 0.1;

/// Shared names that earn the full variable score
const FULL_OVERLAP_COUNT: usize = 2;

/// Kind pairs treated as compatible, in either order
const COMPATIBLE_KINDS: &[(StatementKind, StatementKind)] = &[
    (StatementKind::Assignment, StatementKind::Expression),
    (StatementKind::Assignment, StatementKind::FunctionCall),
    (StatementKind::FunctionCall, StatementKind::Expression),
    (StatementKind::Condition, StatementKind::Loop),
];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z0-9_]+").unwrap();

    static ref STOPWORDS: HashSet<&'static str> = [
        "if", "elif", "else", "then", "and", "or", "not", "in", "is", "the", "a", "an", "of",
        "to", "for", "while", "do", "end", "return", "def", "self", "none", "null", "true",
        "false", "let", "var", "const",
    ]
    .into_iter()
    .collect();
}

/// The four sub-scores behind a confidence value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub kind: f32,
    pub variables: f32,
    pub content: f32,
    pub position: f32,
}

impl ScoreBreakdown {
    /// Sum of the components, clamped to [0, 1]
    pub fn total(&self) -> f32 {
        (self.kind + self.variables + self.content + self.position).clamp(0.0, 1.0)
    }
}

/// A generated statement's winning block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatch<'a> {
    pub block: &'a RuleBlock,
    pub score: ScoreBreakdown,
    /// Names shared by the statement and the block
    pub shared_variables: BTreeSet<String>,
}

impl BlockMatch<'_> {
    pub fn confidence(&self) -> f32 {
        self.score.total()
    }
}

pub fn kinds_compatible(a: StatementKind, b: StatementKind) -> bool {
    a == b
        || COMPATIBLE_KINDS
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

pub fn type_score(generated: StatementKind, origin: StatementKind) -> f32 {
    if kinds_compatible(generated, origin) {
        TYPE_WEIGHT
    } else {
        0.0
    }
}

pub fn variable_score(shared: usize) -> f32 {
    VARIABLE_WEIGHT * shared.min(FULL_OVERLAP_COUNT) as f32 / FULL_OVERLAP_COUNT as f32
}

/// Lowercased words minus stopwords
pub fn content_words(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Shared words over the larger word set, scaled to the content weight
pub fn content_score(generated: &str, origin: &str) -> f32 {
    let a = content_words(generated);
    let b = content_words(origin);
    let largest = a.len().max(b.len());
    if largest == 0 {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    CONTENT_WEIGHT * shared as f32 / largest as f32
}

/// Linear decay to zero at `window` lines apart
pub fn position_score(generated_line: u32, origin_line: u32, window: u32) -> f32 {
    if window == 0 {
        return if generated_line == origin_line { POSITION_WEIGHT } else { 0.0 };
    }
    let distance = generated_line.abs_diff(origin_line) as f32;
    POSITION_WEIGHT * (1.0 - distance / window as f32).max(0.0)
}

/// Score one generated statement against one block
pub fn score(statement: &TargetStatement, block: &RuleBlock, options: &MapOptions) -> (ScoreBreakdown, BTreeSet<String>) {
    let shared: BTreeSet<String> = statement
        .variables()
        .filter(|name| block.variables.contains(*name))
        .cloned()
        .collect();

    let breakdown = ScoreBreakdown {
        kind: type_score(statement.kind, block.kind),
        variables: variable_score(shared.len()),
        content: content_score(&statement.text, &block.text),
        position: position_score(statement.line, block.line, options.position_window),
    };
    (breakdown, shared)
}

/// Best block for a statement, if any reaches the confidence floor
pub fn best_match<'a>(
    statement: &TargetStatement,
    blocks: &'a [RuleBlock],
    options: &MapOptions,
) -> Option<BlockMatch<'a>> {
    let mut best: Option<BlockMatch<'a>> = None;

    for block in blocks {
        let (breakdown, shared) = score(statement, block, options);
        let confidence = breakdown.total();
        if confidence < options.min_confidence {
            continue;
        }
        // strictly greater: the first block seen wins a tie
        if best.as_ref().map_or(true, |b| confidence > b.confidence()) {
            best = Some(BlockMatch {
                block,
                score: breakdown,
                shared_variables: shared,
            });
        }
    }
    best
}
