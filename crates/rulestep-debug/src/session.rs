//! Debug Session Controller
//!
//! Wraps the [`ExecutionEngine`] with breakpoints shared with an editor
//! surface, a terminal transcript, variable change history and an optional
//! source map for the generated code. Every transition ends in
//! [`DebugSession::refresh`], which builds a fresh [`DebugState`].
//!
//! Errors never escape: they become `error` messages in the transcript and
//! the call returns `None`.

use crate::commands::{help_text, Command};
use crate::config::DebugConfig;
use crate::editor::{EditorSurface, HeadlessEditor};
use crate::error::DebugError;
use crate::history::VariableHistory;
use crate::relevance::{display_order, filter_relevant};
use crate::state::{DebugState, Frame, FrameOrigin, TraceEntry};
use crate::terminal::{MessageKind, Terminal, TerminalMessage};
use chrono::Utc;
use rulestep_engine::{
    ContinueOutcome, EngineError, EngineState, ExecutionEngine, MockDataProvider, RuleKind,
    StepOutcome, StopReason, TypeDetector, Variable,
};
use rulestep_lang::{DynamicValue, Statement};
use rulestep_map::{QualityReport, SourceMap, SourceMapGenerator};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

pub struct DebugSession<E: EditorSurface = HeadlessEditor> {
    id: Uuid,
    config: DebugConfig,
    engine: ExecutionEngine,
    editor: E,
    terminal: Terminal,
    trace: VecDeque<TraceEntry>,
    history: VariableHistory,
    state: Arc<DebugState>,
    mock_provider: Option<Box<dyn MockDataProvider>>,
    map_generator: SourceMapGenerator,
    generated_code: Option<String>,
    source_map: Option<SourceMap>,
}

impl DebugSession<HeadlessEditor> {
    pub fn new(config: DebugConfig) -> Self {
        Self::with_editor(config, HeadlessEditor::new())
    }
}

impl Default for DebugSession<HeadlessEditor> {
    fn default() -> Self {
        Self::new(DebugConfig::default())
    }
}

impl<E: EditorSurface> DebugSession<E> {
    pub fn with_editor(config: DebugConfig, editor: E) -> Self {
        Self {
            id: Uuid::new_v4(),
            engine: ExecutionEngine::new(),
            editor,
            terminal: Terminal::new(config.terminal_limit),
            trace: VecDeque::new(),
            history: VariableHistory::new(config.trace_limit),
            state: Arc::new(DebugState::default()),
            mock_provider: None,
            map_generator: SourceMapGenerator::new(config.map.clone()),
            generated_code: None,
            source_map: None,
            config,
        }
    }

    pub fn with_type_detector(mut self, detector: Box<dyn TypeDetector>) -> Self {
        self.engine.set_type_detector(Some(detector));
        self
    }

    /// Record source for rule kinds that inject one when none is passed
    /// to `initialize`
    pub fn with_mock_provider(mut self, provider: Box<dyn MockDataProvider>) -> Self {
        self.mock_provider = Some(provider);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn history(&self) -> &VariableHistory {
        &self.history
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }

    /// Current snapshot; stays valid after later transitions
    pub fn debug_state(&self) -> Arc<DebugState> {
        Arc::clone(&self.state)
    }

    pub fn get_current_state(&self) -> EngineState {
        self.engine.current_state()
    }

    /// Load rule source. Breakpoints come from the editor surface.
    pub fn initialize(&mut self, source: &str, builtin: Option<DynamicValue>, rule_kind: RuleKind) {
        let builtin = builtin.or_else(|| {
            self.mock_provider
                .as_ref()
                .and_then(|provider| provider.mock_record(rule_kind))
        });
        self.engine.load(source, builtin, rule_kind);
        self.pull_editor_breakpoints();

        self.trace.clear();
        self.history.clear();
        self.history.rebase(&self.engine.context().sorted_variables());

        if let Some(generated) = self.generated_code.clone() {
            self.build_source_map(&generated);
        }

        let total = self.engine.total_lines();
        let executable = self.engine.executable_lines();
        self.terminal
            .info(format!("Loaded {total} lines ({executable} executable)"));
        tracing::info!(session = %self.id, total, executable, ?rule_kind, "debug session initialized");
        self.refresh();
    }

    /// Pause before the first executable statement
    pub fn start(&mut self) -> Option<Statement> {
        self.pull_editor_breakpoints();
        match self.engine.start() {
            Ok(statement) => {
                self.trace.clear();
                self.history.rebase(&self.engine.context().sorted_variables());
                self.terminal.info(format!(
                    "Started, paused at line {}: {}",
                    statement.line, statement.text
                ));
                tracing::info!(session = %self.id, line = statement.line, "execution started");
                self.refresh();
                Some(statement)
            }
            Err(err) => {
                self.report(err.into());
                self.refresh();
                None
            }
        }
    }

    pub fn step_next(&mut self) -> Option<StepOutcome> {
        let Some(outcome) = self.engine.step_next() else {
            self.report(EngineError::NotRunning.into());
            self.refresh();
            return None;
        };

        let snapshot = self.engine.context().sorted_variables();
        self.record_step(&outcome, &snapshot);
        self.record_history(outcome.line, &snapshot, self.engine.step_count());
        if outcome.finished {
            self.announce_finished();
        }
        self.refresh();
        Some(outcome)
    }

    pub fn continue_(&mut self) -> Option<ContinueOutcome> {
        self.pull_editor_breakpoints();

        let mut snapshots = Vec::new();
        let outcome = self.engine.continue_with(|_, engine| {
            snapshots.push((engine.context().sorted_variables(), engine.step_count()));
        });
        let Some(outcome) = outcome else {
            self.report(EngineError::NotRunning.into());
            self.refresh();
            return None;
        };

        for (step, (snapshot, step_count)) in outcome.steps.iter().zip(&snapshots) {
            self.record_step(step, snapshot);
            self.record_history(step.line, snapshot, *step_count);
        }

        match outcome.reason {
            StopReason::Breakpoint(line) => {
                self.terminal.info(format!("Paused at breakpoint on line {line}"));
            }
            StopReason::Finished => self.announce_finished(),
            StopReason::StepLimit => {
                self.terminal.error(format!(
                    "Stopped after {} steps without reaching the end",
                    outcome.steps.len()
                ));
            }
        }
        self.refresh();
        Some(outcome)
    }

    /// Idempotent; a second call changes nothing
    pub fn stop(&mut self) {
        if self.engine.context().is_running {
            self.engine.stop();
            self.terminal.info("Execution stopped");
            tracing::info!(session = %self.id, "execution stopped");
        }
        self.refresh();
    }

    /// Replace all breakpoints; returns the out-of-range lines that were ignored
    pub fn set_breakpoints(&mut self, lines: impl IntoIterator<Item = u32>) -> Vec<u32> {
        let rejected = self.engine.set_breakpoints(lines);
        self.report_rejected(&rejected);
        self.sync_editor_breakpoints();
        self.refresh();
        rejected
    }

    /// Returns whether the breakpoint is now set, `None` for an invalid line
    pub fn toggle_breakpoint(&mut self, line: u32) -> Option<bool> {
        let result = self.engine.toggle_breakpoint(line);
        let toggled = match result {
            Ok(set) => {
                self.sync_editor_breakpoints();
                let verb = if set { "set" } else { "removed" };
                self.terminal.info(format!("Breakpoint {verb} on line {line}"));
                Some(set)
            }
            Err(err) => {
                self.report(err.into());
                None
            }
        };
        self.refresh();
        toggled
    }

    /// Run one console command; returns the messages it produced
    pub fn execute_command(&mut self, input: &str) -> Vec<TerminalMessage> {
        let first = self.terminal.next_id();
        self.terminal
            .push(MessageKind::Debug, format!("> {}", input.trim()));

        match input.parse::<Command>() {
            Ok(command) => self.run_command(command),
            Err(err) => {
                self.report(err);
                self.refresh();
            }
        }
        self.terminal.since(first)
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Help => {
                self.terminal
                    .push(MessageKind::Output, format!("Commands:\n{}", help_text()));
                self.refresh();
            }
            Command::Vars => {
                let variables = self.visible_variables(&self.engine.context().sorted_variables());
                if variables.is_empty() {
                    self.terminal.push(MessageKind::Output, "No variables");
                }
                for variable in variables {
                    self.terminal.push(
                        MessageKind::Output,
                        format!("{}: {} = {}", variable.name, variable.type_tag, variable.value),
                    );
                }
                self.refresh();
            }
            Command::Clear => {
                self.terminal.clear();
                self.refresh();
            }
            Command::Break(line) => {
                self.toggle_breakpoint(line);
            }
            Command::Run => {
                self.start();
            }
            Command::Step => {
                self.step_next();
            }
            Command::Continue => {
                self.continue_();
            }
            Command::Stop => self.stop(),
            Command::Map => {
                match self.quality_report() {
                    Ok(report) => {
                        self.terminal.push(MessageKind::Output, report.summary());
                        for check in &report.checks {
                            self.terminal.push(
                                MessageKind::Output,
                                format!("  {:?} {}: {}", check.status, check.name, check.message),
                            );
                        }
                        if !report.gaps.is_empty() {
                            self.terminal.push(
                                MessageKind::Output,
                                format!("  unmapped generated lines: {:?}", report.gaps),
                            );
                        }
                    }
                    Err(err) => self.report(err),
                }
                self.refresh();
            }
        }
    }

    /// Build a source map between `generated_code` and the loaded rule source
    pub fn attach_generated_code(&mut self, generated_code: &str) -> QualityReport {
        self.generated_code = Some(generated_code.to_string());
        let report = self.build_source_map(generated_code);
        self.refresh();
        report
    }

    fn build_source_map(&mut self, generated_code: &str) -> QualityReport {
        let map = self.map_generator.generate(generated_code, self.engine.source());
        let report = map.quality_report(&self.config.profile());

        if report.is_trusted() {
            tracing::info!(session = %self.id, coverage = report.coverage, "source map attached");
        } else {
            tracing::warn!(
                session = %self.id,
                verdict = %report.verdict,
                gaps = ?report.gaps,
                "source map quality below profile"
            );
        }
        self.terminal.info(format!("Source map {}", report.summary()));
        self.source_map = Some(map);
        report
    }

    pub fn quality_report(&self) -> Result<QualityReport, DebugError> {
        self.source_map
            .as_ref()
            .map(|map| map.quality_report(&self.config.profile()))
            .ok_or(DebugError::NoGeneratedCode)
    }

    /// Rule line for a line reported by a runtime executing the generated code
    pub fn translate_generated_line(&mut self, generated_line: u32) -> Option<u32> {
        let found = match &self.source_map {
            None => Err(DebugError::NoGeneratedCode),
            Some(map) => map
                .mapping_for(generated_line)
                .map(|m| (m.origin_line, m.description.clone(), m.confidence))
                .ok_or(DebugError::UnmappedLine(generated_line)),
        };

        let translated = match found {
            Ok((origin_line, description, confidence)) => {
                self.terminal.push(
                    MessageKind::Trace,
                    format!(
                        "generated line {generated_line} -> rule line {origin_line}: {description} (confidence {confidence:.2})"
                    ),
                );
                Some(origin_line)
            }
            Err(err) => {
                self.report(err);
                None
            }
        };
        self.refresh();
        translated
    }

    /// Generated-code lines for the current rule breakpoints
    pub fn generated_breakpoints(&self) -> Vec<u32> {
        let Some(map) = &self.source_map else {
            return Vec::new();
        };
        let mut lines: Vec<u32> = self
            .engine
            .breakpoints()
            .iter()
            .flat_map(|&line| map.generated_lines_for(line))
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Transcript and trace for one step; `snapshot` is the state right after it
    fn record_step(&mut self, outcome: &StepOutcome, snapshot: &[Variable]) {
        let text = match outcome.condition {
            Some(result) => format!("Line {}: {} => {}", outcome.line, outcome.text, result),
            None => format!("Line {}: {}", outcome.line, outcome.text),
        };
        self.terminal.push(MessageKind::Step, text);

        if let Some(message) = &outcome.log {
            self.terminal.push(MessageKind::Output, format!("LOG: {message}"));
        }
        for name in &outcome.changed {
            if let Some(variable) = snapshot.iter().find(|v| &v.name == name) {
                self.terminal
                    .push(MessageKind::Output, format!("{} = {}", name, variable.value));
            }
        }

        self.trace.push_back(TraceEntry {
            step: self.trace.back().map_or(1, |t| t.step + 1),
            line: outcome.line,
            kind: outcome.kind,
            text: outcome.text.clone(),
            changed: outcome.changed.clone(),
            condition: outcome.condition,
            timestamp: Utc::now(),
        });
        while self.trace.len() > self.config.trace_limit.max(1) {
            self.trace.pop_front();
        }
    }

    fn record_history(&mut self, line: u32, snapshot: &[Variable], step: u64) {
        let changes = self.history.record(snapshot, line, step);
        tracing::debug!(line, changes = changes.len(), "variable history updated");
    }

    fn announce_finished(&mut self) {
        self.terminal.info(format!(
            "Execution finished after {} steps",
            self.engine.step_count()
        ));
        tracing::info!(session = %self.id, steps = self.engine.step_count(), "execution finished");
    }

    fn report(&mut self, err: DebugError) {
        tracing::debug!(session = %self.id, error = %err, "reported to terminal");
        self.terminal.error(err.to_string());
    }

    fn report_rejected(&mut self, rejected: &[u32]) {
        if !rejected.is_empty() {
            self.terminal.error(format!(
                "Ignored breakpoints outside 1..={}: {:?}",
                self.engine.total_lines(),
                rejected
            ));
        }
    }

    /// Take the editor's gutter as the breakpoint set when it has drifted
    /// from the engine's
    fn pull_editor_breakpoints(&mut self) {
        let wanted: BTreeSet<u32> = self.editor.get_breakpoints().into_iter().collect();
        if &wanted == self.engine.breakpoints() {
            return;
        }
        let rejected = self.engine.set_breakpoints(wanted);
        self.report_rejected(&rejected);
        self.sync_editor_breakpoints();
        tracing::debug!(session = %self.id, breakpoints = ?self.engine.breakpoints(), "breakpoints taken from editor");
    }

    fn sync_editor_breakpoints(&mut self) {
        self.editor.clear_all_breakpoints();
        for &line in self.engine.breakpoints() {
            self.editor.toggle_breakpoint(line);
        }
    }

    fn visible_variables(&self, variables: &[Variable]) -> Vec<Variable> {
        if self.config.hide_irrelevant_variables {
            filter_relevant(variables)
        } else {
            let mut all = variables.to_vec();
            all.sort_by(display_order);
            all
        }
    }

    /// Push the engine state to the editor and swap in a new snapshot
    fn refresh(&mut self) {
        let engine_state = self.engine.current_state();
        let running = engine_state.is_running;

        if running {
            if self.state.current_line != engine_state.line || !self.state.is_active {
                self.editor.set_execution_pointer(engine_state.line);
            }
        } else if self.state.is_active {
            self.editor.clear_execution_pointer();
        }
        let shown = self.visible_variables(&engine_state.variables);
        self.editor.show_variable_values(&shown);

        let mut call_stack = Vec::new();
        if running {
            call_stack.push(Frame {
                name: "rule".to_string(),
                line: engine_state.line,
                origin: FrameOrigin::Rule,
            });
            if let Some(generated_line) = self
                .source_map
                .as_ref()
                .and_then(|map| map.generated_lines_for(engine_state.line).first().copied())
            {
                call_stack.push(Frame {
                    name: "generated".to_string(),
                    line: generated_line,
                    origin: FrameOrigin::Generated,
                });
            }
        }

        self.state = Arc::new(DebugState {
            is_active: running,
            current_line: engine_state.line,
            breakpoints: self.engine.breakpoints().iter().copied().collect(),
            can_step: engine_state.can_step,
            can_continue: engine_state.can_continue,
            can_pause: running && !engine_state.is_paused,
            execution_trace: self.trace.iter().cloned().collect(),
            terminal_messages: self.terminal.to_vec(),
            call_stack,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_become_terminal_messages() {
        let mut session = DebugSession::new(DebugConfig::default());
        session.initialize("// only a comment", None, RuleKind::Standard);
        assert!(session.start().is_none());
        assert!(session.step_next().is_none());
        assert!(session.continue_().is_none());

        let errors: Vec<String> = session
            .terminal()
            .messages()
            .filter(|m| m.kind == MessageKind::Error)
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("ENGINE/NO_EXECUTABLE"));
        assert!(errors[1].starts_with("ENGINE/NOT_RUNNING"));
    }

    #[test]
    fn test_snapshots_are_copy_on_write() {
        let mut session = DebugSession::new(DebugConfig::default());
        session.initialize("x = 1\ny = 2", None, RuleKind::Standard);
        session.start();
        let before = session.debug_state();
        session.step_next();
        let after = session.debug_state();

        assert_eq!(before.current_line, 1);
        assert!(before.execution_trace.is_empty());
        assert_eq!(after.current_line, 2);
        assert_eq!(after.execution_trace.len(), 1);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_zero_trace_limit_keeps_latest_entry() {
        let config = DebugConfig {
            trace_limit: 0,
            ..DebugConfig::default()
        };
        let mut session = DebugSession::new(config);
        session.initialize("a = 1\nb = 2\nc = 3", None, RuleKind::Standard);
        session.start();
        session.continue_();
        let state = session.debug_state();
        assert_eq!(state.execution_trace.len(), 1);
        assert_eq!(state.execution_trace[0].line, 3);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_condition_result_reported() {
        let mut session = DebugSession::new(DebugConfig::default());
        session.initialize("total = 150\nif total > 100", None, RuleKind::Standard);
        session.start();
        session.continue_();
        let state = session.debug_state();
        assert_eq!(state.execution_trace[1].condition, Some(true));
        assert!(session
            .terminal()
            .messages()
            .any(|m| m.kind == MessageKind::Step && m.text == "Line 2: if total > 100 => true"));
    }
}
