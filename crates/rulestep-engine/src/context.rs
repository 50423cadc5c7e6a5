//! Execution Context: the live state of one debug session's interpreter
use crate::variable::{Variable, VariableScope, Write};
use rulestep_lang::{DynamicValue, Environment, TypeTag};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Name under which the injected builtin record is exposed
pub const BUILTIN_VARIABLE_NAME: &str = "record";

/// Flavour of rule being debugged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Plain rule, no injected data
    #[default]
    Standard,
    /// Rule evaluated against a data record, injected as `record`
    Record,
}

impl RuleKind {
    pub fn injects_builtin(&self) -> bool {
        matches!(self, RuleKind::Record)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub variables: HashMap<String, Variable>,
    /// 1-based line of the statement about to run, 0 when idle
    pub current_line: u32,
    pub is_running: bool,
    pub is_paused: bool,
    /// Survives `reset`
    pub breakpoints: BTreeSet<u32>,
    pub injected_builtin: Option<DynamicValue>,
    pub rule_kind: RuleKind,
}

impl ExecutionContext {
    pub fn new(rule_kind: RuleKind, injected_builtin: Option<DynamicValue>) -> Self {
        Self {
            rule_kind,
            injected_builtin,
            ..Self::default()
        }
    }

    /// The single write path: creates or updates a variable and its history.
    /// Returns whether the value changed.
    pub fn write_variable(&mut self, name: &str, write: Write) -> bool {
        match self.variables.get_mut(name) {
            Some(existing) => {
                existing.apply(write);
                existing.changed
            }
            None => {
                self.variables
                    .insert(name.to_string(), Variable::first_write(name, write));
                true
            }
        }
    }

    /// Drop variables and execution position, keep breakpoints, re-inject
    /// the builtin record for rule kinds that use one
    pub fn reset(&mut self) {
        self.variables.clear();
        self.current_line = 0;
        self.is_running = false;
        self.is_paused = false;

        if self.rule_kind.injects_builtin() {
            if let Some(record) = self.injected_builtin.clone() {
                let type_tag = TypeTag::of(&record);
                self.write_variable(
                    BUILTIN_VARIABLE_NAME,
                    Write {
                        value: record,
                        type_tag,
                        scope: VariableScope::Injected,
                        line: 0,
                        step: 0,
                    },
                );
            }
        }
    }

    /// Variables sorted by name
    pub fn sorted_variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = self.variables.values().cloned().collect();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        vars
    }
}

impl Environment for ExecutionContext {
    fn lookup(&self, name: &str) -> Option<&DynamicValue> {
        self.variables.get(name).map(|v| &v.value)
    }
}
