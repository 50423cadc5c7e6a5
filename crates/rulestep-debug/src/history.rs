//! Variable change history across engine snapshots
use chrono::{DateTime, Utc};
use rulestep_engine::Variable;
use rulestep_lang::DynamicValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// One observed change between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableChange {
    pub name: String,
    /// `None` when the variable first appeared
    pub previous: Option<DynamicValue>,
    pub value: DynamicValue,
    pub line: u32,
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// Diffs each snapshot against the one before it
#[derive(Debug, Clone)]
pub struct VariableHistory {
    last_snapshot: HashMap<String, DynamicValue>,
    changes: VecDeque<VariableChange>,
    limit: usize,
}

impl VariableHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            last_snapshot: HashMap::new(),
            changes: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Record the differences from the previous snapshot and remember this one
    pub fn record(&mut self, snapshot: &[Variable], line: u32, step: u64) -> Vec<VariableChange> {
        let now = Utc::now();
        let mut recorded = Vec::new();

        for variable in snapshot {
            let previous = self.last_snapshot.get(&variable.name);
            if previous == Some(&variable.value) {
                continue;
            }
            recorded.push(VariableChange {
                name: variable.name.clone(),
                previous: previous.cloned(),
                value: variable.value.clone(),
                line,
                step,
                timestamp: now,
            });
        }

        self.last_snapshot = snapshot
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect();

        for change in &recorded {
            self.changes.push_back(change.clone());
        }
        while self.changes.len() > self.limit {
            self.changes.pop_front();
        }
        recorded
    }

    /// Forget the baseline, so the next snapshot is diffed against nothing
    pub fn rebase(&mut self, snapshot: &[Variable]) {
        self.last_snapshot = snapshot
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect();
    }

    pub fn changes(&self) -> impl Iterator<Item = &VariableChange> {
        self.changes.iter()
    }

    pub fn changes_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VariableChange> {
        self.changes.iter().filter(move |c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_snapshot.clear();
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulestep_engine::VariableScope;
    use rulestep_lang::TypeTag;

    fn var(name: &str, n: f64) -> Variable {
        Variable {
            name: name.to_string(),
            value: DynamicValue::Number(n),
            type_tag: TypeTag::Number,
            scope: VariableScope::Local,
            changed: true,
            previous_value: None,
            value_history: Default::default(),
        }
    }

    #[test]
    fn test_records_only_differences() {
        let mut history = VariableHistory::new(10);
        let first = history.record(&[var("x", 1.0)], 1, 1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].previous, None);

        let unchanged = history.record(&[var("x", 1.0)], 2, 2);
        assert!(unchanged.is_empty());

        let second = history.record(&[var("x", 2.0), var("y", 0.0)], 3, 3);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].previous, Some(DynamicValue::Number(1.0)));
        assert_eq!(history.changes_for("x").count(), 2);
    }

    #[test]
    fn test_limit_and_rebase() {
        let mut history = VariableHistory::new(2);
        for step in 0..5 {
            history.record(&[var("x", step as f64)], 1, step);
        }
        assert_eq!(history.len(), 2);

        history.rebase(&[var("x", 9.0)]);
        assert!(history.record(&[var("x", 9.0)], 1, 6).is_empty());
    }
}
