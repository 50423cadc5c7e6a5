//! Editor surface the session drives. The core never renders anything.
use rulestep_engine::Variable;
use std::collections::BTreeSet;

pub trait EditorSurface {
    /// Toggle a gutter breakpoint; returns whether it is now set
    fn toggle_breakpoint(&mut self, line: u32) -> bool;
    fn get_breakpoints(&self) -> Vec<u32>;
    fn clear_all_breakpoints(&mut self);
    fn set_execution_pointer(&mut self, line: u32);
    fn clear_execution_pointer(&mut self);
    fn show_variable_values(&mut self, variables: &[Variable]);
}

/// In-memory editor for the console and tests
#[derive(Debug, Clone, Default)]
pub struct HeadlessEditor {
    pub breakpoints: BTreeSet<u32>,
    pub execution_pointer: Option<u32>,
    pub shown_variables: Vec<Variable>,
    /// Every pointer position set, in order
    pub pointer_trail: Vec<u32>,
}

impl HeadlessEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breakpoints(lines: impl IntoIterator<Item = u32>) -> Self {
        Self {
            breakpoints: lines.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl EditorSurface for HeadlessEditor {
    fn toggle_breakpoint(&mut self, line: u32) -> bool {
        if self.breakpoints.remove(&line) {
            false
        } else {
            self.breakpoints.insert(line);
            true
        }
    }

    fn get_breakpoints(&self) -> Vec<u32> {
        self.breakpoints.iter().copied().collect()
    }

    fn clear_all_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    fn set_execution_pointer(&mut self, line: u32) {
        self.execution_pointer = Some(line);
        self.pointer_trail.push(line);
    }

    fn clear_execution_pointer(&mut self) {
        self.execution_pointer = None;
    }

    fn show_variable_values(&mut self, variables: &[Variable]) {
        self.shown_variables = variables.to_vec();
    }
}
