//! Execution engine for rule-language sources.
//!
//! # State machine
//!
//! ```text
//! Idle --start()--> Running+Paused --step_next()--> Running+Paused
//!                         |                              |
//!                         +--------(past last line)------+--> Idle
//! any --stop()--> Idle
//! ```
//!
//! Running and paused are simultaneous: the engine is always suspended right
//! before the statement at `current_line` and only moves when the caller
//! asks. `continue_()` repeats the step transition until a breakpoint line
//! or the end, bounded by the statement count.

use crate::capability::TypeDetector;
use crate::context::{ExecutionContext, RuleKind};
use crate::error::EngineError;
use crate::variable::{Variable, VariableScope, Write};
use rulestep_lang::{
    assignment_target, evaluate, find_assignment_operator, parse_function_call, parse_statements,
    DynamicValue, Statement, StatementKind, TypeTag,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Calls that print their first positional argument as step output
pub const LOG_HELPERS: [&str; 2] = ["log", "log_message"];

/// What a single step did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Line that was executed
    pub line: u32,
    pub kind: StatementKind,
    pub text: String,
    /// Variables whose value changed on this step
    pub changed: Vec<String>,
    /// Truthiness of a condition line (evaluated, never branched on)
    pub condition: Option<bool>,
    /// Message printed by a `log(...)` / `log_message(...)` line
    pub log: Option<String>,
    /// Line the engine is now paused on, `None` once finished
    pub next_line: Option<u32>,
    pub finished: bool,
}

/// Why `continue_()` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakpoint(u32),
    Finished,
    /// Iteration ceiling reached while still running
    StepLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueOutcome {
    pub steps: Vec<StepOutcome>,
    pub reason: StopReason,
}

/// Snapshot returned by [`ExecutionEngine::current_state`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub line: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub variables: Vec<Variable>,
    pub can_step: bool,
    pub can_continue: bool,
    pub total_lines: u32,
    pub executable_lines: u32,
}

/// Interprets rule source one statement at a time
pub struct ExecutionEngine {
    source: String,
    statements: Vec<Statement>,
    context: ExecutionContext,
    /// Index into `statements` of the statement about to run
    cursor: Option<usize>,
    step_count: u64,
    type_detector: Option<Box<dyn TypeDetector>>,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            source: String::new(),
            statements: Vec::new(),
            context: ExecutionContext::default(),
            cursor: None,
            step_count: 0,
            type_detector: None,
        }
    }

    /// Attach a static type detector; without one types come from values
    pub fn with_type_detector(mut self, detector: Box<dyn TypeDetector>) -> Self {
        self.type_detector = Some(detector);
        self
    }

    pub fn set_type_detector(&mut self, detector: Option<Box<dyn TypeDetector>>) {
        self.type_detector = detector;
    }

    /// Load new source. Breakpoints that still fit the new source are kept.
    pub fn load(&mut self, source: &str, builtin: Option<DynamicValue>, rule_kind: RuleKind) {
        self.source = source.to_string();
        self.statements = parse_statements(source);

        let breakpoints = std::mem::take(&mut self.context.breakpoints);
        self.context = ExecutionContext::new(rule_kind, builtin);
        self.set_breakpoints(breakpoints);
        self.reset();

        tracing::debug!(
            total = self.total_lines(),
            executable = self.executable_lines(),
            ?rule_kind,
            "loaded rule source"
        );
    }

    /// Back to idle with a fresh environment
    pub fn reset(&mut self) {
        self.context.reset();
        self.cursor = None;
        self.step_count = 0;
    }

    /// Reset and pause before the first executable statement
    pub fn start(&mut self) -> Result<Statement, EngineError> {
        self.reset();
        let first = self
            .next_executable(0)
            .ok_or(EngineError::NoExecutableStatements)?;

        self.pause_at(first);
        tracing::debug!(line = self.context.current_line, "execution started");
        Ok(self.statements[first].clone())
    }

    /// Execute the current statement and pause before the next one.
    /// `None` when the engine is not running.
    pub fn step_next(&mut self) -> Option<StepOutcome> {
        if !self.context.is_running {
            return None;
        }
        let index = self.cursor?;
        let statement = self.statements[index].clone();

        self.step_count += 1;
        let effects = self.execute(&statement);

        let next_line = match self.next_executable(index + 1) {
            Some(next) => {
                self.pause_at(next);
                Some(self.statements[next].line)
            }
            None => {
                self.finish();
                None
            }
        };

        tracing::debug!(line = statement.line, ?next_line, "step");
        Some(StepOutcome {
            line: statement.line,
            kind: statement.kind,
            text: statement.text,
            changed: effects.changed,
            condition: effects.condition,
            log: effects.log,
            next_line,
            finished: next_line.is_none(),
        })
    }

    /// Step until a breakpoint line or the end of the program.
    /// `None` when the engine is not running.
    pub fn continue_(&mut self) -> Option<ContinueOutcome> {
        self.continue_with(|_, _| {})
    }

    /// `continue_`, calling `on_step` after every step with the engine as
    /// that step left it
    pub fn continue_with(
        &mut self,
        mut on_step: impl FnMut(&StepOutcome, &ExecutionEngine),
    ) -> Option<ContinueOutcome> {
        if !self.context.is_running {
            return None;
        }

        let ceiling = self.statements.len();
        let mut steps = Vec::new();
        for _ in 0..ceiling {
            let Some(outcome) = self.step_next() else {
                break;
            };
            on_step(&outcome, &*self);
            let next_line = outcome.next_line;
            steps.push(outcome);

            match next_line {
                None => {
                    return Some(ContinueOutcome {
                        steps,
                        reason: StopReason::Finished,
                    })
                }
                Some(line) if self.context.breakpoints.contains(&line) => {
                    tracing::debug!(line, "halted at breakpoint");
                    return Some(ContinueOutcome {
                        steps,
                        reason: StopReason::Breakpoint(line),
                    });
                }
                Some(_) => {}
            }
        }

        let reason = if self.context.is_running {
            StopReason::StepLimit
        } else {
            StopReason::Finished
        };
        Some(ContinueOutcome { steps, reason })
    }

    /// Force idle. Idempotent; variables stay inspectable.
    pub fn stop(&mut self) {
        self.finish();
    }

    /// Replace the breakpoint set, dropping lines outside `1..=total_lines`
    pub fn set_breakpoints(&mut self, lines: impl IntoIterator<Item = u32>) -> Vec<u32> {
        let total = self.total_lines();
        let mut rejected = Vec::new();
        self.context.breakpoints = lines
            .into_iter()
            .filter(|line| {
                let ok = (1..=total).contains(line);
                if !ok {
                    rejected.push(*line);
                }
                ok
            })
            .collect();

        if !rejected.is_empty() {
            tracing::warn!(?rejected, total, "ignored out-of-range breakpoints");
        }
        rejected
    }

    /// Toggle one breakpoint; returns whether it is now set
    pub fn toggle_breakpoint(&mut self, line: u32) -> Result<bool, EngineError> {
        let total = self.total_lines();
        if !(1..=total).contains(&line) {
            return Err(EngineError::BreakpointOutOfRange { line, total });
        }
        if self.context.breakpoints.remove(&line) {
            Ok(false)
        } else {
            self.context.breakpoints.insert(line);
            Ok(true)
        }
    }

    pub fn breakpoints(&self) -> &BTreeSet<u32> {
        &self.context.breakpoints
    }

    pub fn current_state(&self) -> EngineState {
        let running = self.context.is_running;
        EngineState {
            line: self.context.current_line,
            is_running: running,
            is_paused: self.context.is_paused,
            variables: self.context.sorted_variables(),
            can_step: running && self.context.is_paused,
            can_continue: running && self.context.is_paused,
            total_lines: self.total_lines(),
            executable_lines: self.executable_lines(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statement_at(&self, line: u32) -> Option<&Statement> {
        line.checked_sub(1)
            .and_then(|index| self.statements.get(index as usize))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.context.variables.get(name)
    }

    pub fn total_lines(&self) -> u32 {
        self.statements.len() as u32
    }

    pub fn executable_lines(&self) -> u32 {
        self.statements.iter().filter(|s| s.is_executable()).count() as u32
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    fn next_executable(&self, from: usize) -> Option<usize> {
        (from..self.statements.len()).find(|&i| self.statements[i].is_executable())
    }

    fn pause_at(&mut self, index: usize) {
        self.cursor = Some(index);
        self.context.current_line = self.statements[index].line;
        self.context.is_running = true;
        self.context.is_paused = true;
    }

    fn finish(&mut self) {
        self.cursor = None;
        self.context.current_line = 0;
        self.context.is_running = false;
        self.context.is_paused = false;
    }

    fn execute(&mut self, statement: &Statement) -> Effects {
        if statement.kind != StatementKind::Condition {
            if let Some(message) = self.log_message(&statement.text) {
                return Effects {
                    log: Some(message),
                    ..Effects::default()
                };
            }
        }

        match statement.kind {
            StatementKind::Assignment => Effects {
                changed: self.execute_assignment(statement),
                ..Effects::default()
            },
            StatementKind::Condition => {
                let expr = condition_expression(&statement.text);
                Effects {
                    condition: Some(evaluate(expr, &self.context).is_truthy()),
                    ..Effects::default()
                }
            }
            _ => Effects::default(),
        }
    }

    /// First positional argument of a log helper call, evaluated. Keyword
    /// arguments (`level="info"`) are ignored.
    fn log_message(&self, text: &str) -> Option<String> {
        let (name, args) = parse_function_call(text)?;
        if !LOG_HELPERS.contains(&name) {
            return None;
        }
        let message = args
            .into_iter()
            .find(|arg| !is_keyword_argument(arg))
            .map(|arg| evaluate(arg, &self.context).to_plain_string())
            .unwrap_or_default();
        Some(message)
    }

    fn execute_assignment(&mut self, statement: &Statement) -> Vec<String> {
        let text = statement.text.as_str();
        let Some(op) = find_assignment_operator(text) else {
            return Vec::new();
        };
        let Some(target) = assignment_target(&text[..op]) else {
            tracing::debug!(line = statement.line, "unsupported assignment target");
            return Vec::new();
        };

        let evaluated = evaluate(&text[op + 1..], &self.context);
        let segments: Vec<&str> = target.path.split('.').skip(1).collect();
        let value = if segments.is_empty() {
            evaluated
        } else {
            let mut base = self
                .context
                .variables
                .get(&target.name)
                .map(|v| v.value.clone())
                .unwrap_or_default();
            base.set_path(&segments, evaluated);
            base
        };

        let type_tag = self.resolve_type(&target.name, &value);
        let changed = self.context.write_variable(
            &target.name,
            Write {
                value,
                type_tag,
                scope: VariableScope::Local,
                line: statement.line,
                step: self.step_count,
            },
        );

        if changed {
            vec![target.name]
        } else {
            Vec::new()
        }
    }

    fn resolve_type(&self, name: &str, value: &DynamicValue) -> TypeTag {
        self.type_detector
            .as_ref()
            .and_then(|detector| detector.detect_variable_type(name, &self.source))
            .unwrap_or_else(|| TypeTag::of(value))
    }
}

/// Side effects of one statement
#[derive(Debug, Default)]
struct Effects {
    changed: Vec<String>,
    condition: Option<bool>,
    log: Option<String>,
}

fn is_keyword_argument(arg: &str) -> bool {
    find_assignment_operator(arg)
        .and_then(|op| assignment_target(&arg[..op]))
        .is_some()
}

/// The tested expression of a condition line
fn condition_expression(text: &str) -> &str {
    let expr = match text.strip_prefix("if ") {
        Some(rest) => rest,
        None => text.split_once(" if ").map(|(_, rest)| rest).unwrap_or(text),
    };
    expr.trim()
        .trim_end_matches(':')
        .trim_end_matches('{')
        .trim_end()
        .trim_end_matches(" then")
}
