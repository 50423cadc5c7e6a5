//! Variables owned by the execution environment

use chrono::{DateTime, Utc};
use rulestep_lang::{DynamicValue, TypeTag};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum entries kept in a variable's value history
pub const MAX_VALUE_HISTORY: usize = 10;

/// Where a variable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    /// Written by an executed statement
    Local,
    /// Injected by the session (mock record, builtin data)
    Injected,
}

/// One recorded write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: DynamicValue,
    /// Line whose execution produced the value (0 for injected values)
    pub line: u32,
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// A live variable in the execution environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: DynamicValue,
    pub type_tag: TypeTag,
    pub scope: VariableScope,
    /// Whether the last write changed the value
    pub changed: bool,
    /// Value before the last write, `None` on first assignment
    pub previous_value: Option<DynamicValue>,
    /// Most recent writes, oldest first, at most [`MAX_VALUE_HISTORY`]
    pub value_history: VecDeque<HistoryEntry>,
}

/// Parameters of a single write through the environment
#[derive(Debug, Clone)]
pub struct Write {
    pub value: DynamicValue,
    pub type_tag: TypeTag,
    pub scope: VariableScope,
    pub line: u32,
    pub step: u64,
}

impl Variable {
    /// Create a variable from its first write
    pub fn first_write(name: impl Into<String>, write: Write) -> Self {
        let mut variable = Self {
            name: name.into(),
            value: write.value.clone(),
            type_tag: write.type_tag,
            scope: write.scope,
            changed: true,
            previous_value: None,
            value_history: VecDeque::with_capacity(MAX_VALUE_HISTORY),
        };
        variable.push_history(write.value, write.line, write.step);
        variable
    }

    /// Apply a subsequent write, diffing against the current value
    pub fn apply(&mut self, write: Write) {
        let previous = std::mem::replace(&mut self.value, write.value.clone());
        self.changed = previous != write.value;
        self.previous_value = Some(previous);
        self.type_tag = write.type_tag;
        self.scope = write.scope;
        self.push_history(write.value, write.line, write.step);
    }

    fn push_history(&mut self, value: DynamicValue, line: u32, step: u64) {
        if self.value_history.len() == MAX_VALUE_HISTORY {
            self.value_history.pop_front();
        }
        self.value_history.push_back(HistoryEntry {
            value,
            line,
            step,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(value: f64, step: u64) -> Write {
        Write {
            value: DynamicValue::Number(value),
            type_tag: TypeTag::Number,
            scope: VariableScope::Local,
            line: 1,
            step,
        }
    }

    #[test]
    fn test_first_write_is_a_change() {
        let var = Variable::first_write("x", write(5.0, 1));
        assert!(var.changed);
        assert_eq!(var.previous_value, None);
        assert_eq!(var.value_history.len(), 1);
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let mut var = Variable::first_write("x", write(5.0, 1));
        var.apply(write(5.0, 2));
        assert!(!var.changed);
        assert_eq!(var.previous_value, Some(DynamicValue::Number(5.0)));

        var.apply(write(6.0, 3));
        assert!(var.changed);
        assert_eq!(var.previous_value, Some(DynamicValue::Number(5.0)));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut var = Variable::first_write("x", write(0.0, 0));
        for step in 1..25 {
            var.apply(write(step as f64, step));
            assert!(var.value_history.len() <= MAX_VALUE_HISTORY);
        }
        assert_eq!(var.value_history.len(), MAX_VALUE_HISTORY);
        assert_eq!(var.value_history.front().unwrap().step, 15);
        assert_eq!(var.value_history.back().unwrap().step, 24);
    }
}
