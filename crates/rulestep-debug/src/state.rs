//! Debug State snapshots
//!
//! A [`DebugState`] is never edited after it is built. The session swaps in
//! a new `Arc<DebugState>` on every transition, so a holder of an older
//! snapshot keeps a consistent view.

use crate::terminal::TerminalMessage;
use chrono::{DateTime, Utc};
use rulestep_lang::StatementKind;
use serde::{Deserialize, Serialize};

/// One executed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: u64,
    pub line: u32,
    pub kind: StatementKind,
    pub text: String,
    pub changed: Vec<String>,
    pub condition: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrigin {
    /// Line in the rule source
    Rule,
    /// Line in the attached generated code
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub line: u32,
    pub origin: FrameOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugState {
    pub is_active: bool,
    /// 0 when idle
    pub current_line: u32,
    pub breakpoints: Vec<u32>,
    pub can_step: bool,
    pub can_continue: bool,
    pub can_pause: bool,
    pub execution_trace: Vec<TraceEntry>,
    pub terminal_messages: Vec<TerminalMessage>,
    /// Innermost frame last
    pub call_stack: Vec<Frame>,
}

impl DebugState {
    pub fn last_trace(&self) -> Option<&TraceEntry> {
        self.execution_trace.last()
    }

    pub fn top_frame(&self) -> Option<&Frame> {
        self.call_stack.last()
    }
}
