//! Integration tests for rulestep-debug

use rulestep_debug::{
    DebugConfig, DebugSession, EditorSurface, FrameOrigin, HeadlessEditor, MessageKind,
};
use rulestep_engine::{FixedRecord, RuleKind, StopReason, Variable};
use rulestep_lang::{DynamicValue, TypeTag};
use serde_json::json;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

const TEN_LINES: &str = "a = 1
b = 2
c = a
d = b
e = 5
f = 6
g = 7
h = 8
i = 9
j = 10";

const RULES: &str = "price = 100
quantity = 3
total = price * quantity
if total > 200
discount = total * 0.1";

const GENERATED: &str = "def rule(record):
    price = 100
    quantity = 3
    total = price * quantity
    if total > 200:
        discount = total * 0.1";

fn session() -> DebugSession {
    DebugSession::new(DebugConfig::default())
}

/// Editor whose gutter is also held by the test, like a UI clicked
/// while the session runs
struct SharedEditor {
    gutter: Rc<RefCell<BTreeSet<u32>>>,
}

impl EditorSurface for SharedEditor {
    fn toggle_breakpoint(&mut self, line: u32) -> bool {
        let mut gutter = self.gutter.borrow_mut();
        if gutter.remove(&line) {
            false
        } else {
            gutter.insert(line);
            true
        }
    }

    fn get_breakpoints(&self) -> Vec<u32> {
        self.gutter.borrow().iter().copied().collect()
    }

    fn clear_all_breakpoints(&mut self) {
        self.gutter.borrow_mut().clear();
    }

    fn set_execution_pointer(&mut self, _line: u32) {}

    fn clear_execution_pointer(&mut self) {}

    fn show_variable_values(&mut self, _variables: &[Variable]) {}
}

#[test]
fn test_continue_halts_at_editor_breakpoint() {
    let mut session =
        DebugSession::with_editor(DebugConfig::default(), HeadlessEditor::with_breakpoints([5]));
    session.initialize(TEN_LINES, None, RuleKind::Standard);
    assert!(session.start().is_some());

    let outcome = session.continue_().unwrap();
    assert_eq!(outcome.reason, StopReason::Breakpoint(5));

    let state = session.get_current_state();
    assert_eq!(state.line, 5);
    assert!(state.is_paused);

    let debug_state = session.debug_state();
    assert!(debug_state.is_active);
    assert_eq!(debug_state.current_line, 5);
    assert_eq!(debug_state.breakpoints, vec![5]);
    assert_eq!(debug_state.execution_trace.len(), 4);
    assert_eq!(session.editor().execution_pointer, Some(5));

    let outcome = session.continue_().unwrap();
    assert_eq!(outcome.reason, StopReason::Finished);
    assert!(!session.debug_state().is_active);
    assert_eq!(session.editor().execution_pointer, None);
}

#[test]
fn test_stop_twice_equals_stop_once() {
    let mut session = session();
    session.initialize(TEN_LINES, None, RuleKind::Standard);
    session.start();
    session.step_next();

    session.stop();
    let once = session.debug_state();
    session.stop();
    let twice = session.debug_state();

    assert_eq!(*once, *twice);
    assert!(!twice.is_active);
    assert_eq!(twice.current_line, 0);
}

#[test]
fn test_breakpoints_sync_with_editor() {
    let mut session = DebugSession::with_editor(
        DebugConfig::default(),
        HeadlessEditor::with_breakpoints([2, 42]),
    );
    session.initialize(TEN_LINES, None, RuleKind::Standard);
    assert_eq!(session.editor().get_breakpoints(), vec![2]);
    assert!(session
        .terminal()
        .messages()
        .any(|m| m.kind == MessageKind::Error && m.text.contains("[42]")));

    assert_eq!(session.toggle_breakpoint(7), Some(true));
    assert_eq!(session.toggle_breakpoint(2), Some(false));
    assert_eq!(session.toggle_breakpoint(11), None);
    assert_eq!(session.editor().get_breakpoints(), vec![7]);

    let rejected = session.set_breakpoints([0, 3, 9]);
    assert_eq!(rejected, vec![0]);
    assert_eq!(session.debug_state().breakpoints, vec![3, 9]);
}

#[test]
fn test_gutter_clicks_after_load_reach_the_engine() {
    let gutter = Rc::new(RefCell::new(BTreeSet::new()));
    let editor = SharedEditor {
        gutter: Rc::clone(&gutter),
    };
    let mut session = DebugSession::with_editor(DebugConfig::default(), editor);
    session.initialize(TEN_LINES, None, RuleKind::Standard);

    gutter.borrow_mut().insert(3);
    assert!(session.start().is_some());
    let outcome = session.continue_().unwrap();
    assert_eq!(outcome.reason, StopReason::Breakpoint(3));
    assert_eq!(session.debug_state().breakpoints, vec![3]);

    // clicked while paused; the out-of-range one is dropped and reported
    gutter.borrow_mut().extend([7, 99]);
    let outcome = session.continue_().unwrap();
    assert_eq!(outcome.reason, StopReason::Breakpoint(7));
    assert_eq!(*gutter.borrow(), BTreeSet::from([3, 7]));
    assert!(session
        .terminal()
        .messages()
        .any(|m| m.kind == MessageKind::Error && m.text.contains("[99]")));
}

#[test]
fn test_continue_records_every_intermediate_change() {
    let mut session = session();
    session.initialize("count = 1\ncount = 2\ncount = 3", None, RuleKind::Standard);
    session.start();
    session.continue_();

    let changes: Vec<(Option<DynamicValue>, DynamicValue, u32)> = session
        .history()
        .changes_for("count")
        .map(|c| (c.previous.clone(), c.value.clone(), c.line))
        .collect();
    assert_eq!(
        changes,
        vec![
            (None, DynamicValue::Number(1.0), 1),
            (Some(DynamicValue::Number(1.0)), DynamicValue::Number(2.0), 2),
            (Some(DynamicValue::Number(2.0)), DynamicValue::Number(3.0), 3),
        ]
    );

    // each step prints the value it wrote, not the final one
    let outputs: Vec<String> = session
        .terminal()
        .messages()
        .filter(|m| m.kind == MessageKind::Output)
        .map(|m| m.text.clone())
        .collect();
    assert_eq!(outputs, vec!["count = 1", "count = 2", "count = 3"]);
}

#[test]
fn test_log_lines_print_output() {
    let mut session = session();
    session.initialize(
        "total = 250\nlog(\"big order\")\nlog_message(total, level=\"info\")",
        None,
        RuleKind::Standard,
    );
    session.start();
    session.continue_();

    let outputs: Vec<String> = session
        .terminal()
        .messages()
        .filter(|m| m.kind == MessageKind::Output)
        .map(|m| m.text.clone())
        .collect();
    assert_eq!(outputs, vec!["total = 250", "LOG: big order", "LOG: 250"]);
    assert!(session.engine().variable("level").is_none());
    assert_eq!(session.engine().context().sorted_variables().len(), 1);
}

#[test]
fn test_history_and_editor_variables() {
    let mut session = session();
    session.initialize("count = 1\ncount = 2\n__tmp__ = 3", None, RuleKind::Standard);
    session.start();
    session.continue_();

    let changes: Vec<_> = session.history().changes_for("count").collect();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].previous, Some(DynamicValue::Number(1.0)));
    assert_eq!(changes[1].value, DynamicValue::Number(2.0));

    let count = session.engine().variable("count").unwrap();
    assert_eq!(count.previous_value, Some(DynamicValue::Number(1.0)));
    assert_eq!(count.value_history.len(), 2);

    let shown: Vec<&str> = session
        .editor()
        .shown_variables
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(shown, vec!["count"]);
}

#[test]
fn test_mock_record_injected_for_record_rules() {
    let record = DynamicValue::from(json!({"customer": {"tier": "gold"}, "amount": 250}));
    let mut session = session().with_mock_provider(Box::new(FixedRecord(record)));
    session.initialize(
        "tier = record.customer.tier\nbig = record.amount > 200",
        None,
        RuleKind::Record,
    );
    session.start();
    session.continue_();

    assert_eq!(
        session.engine().variable("tier").unwrap().value,
        DynamicValue::from("gold")
    );
    assert_eq!(
        session.engine().variable("big").unwrap().value,
        DynamicValue::Bool(true)
    );

    // restart re-injects the record
    session.start();
    assert!(session.engine().variable("record").is_some());
    assert!(session.engine().variable("tier").is_none());
}

#[test]
fn test_type_detector_overrides_value_types() {
    let mut session = session().with_type_detector(Box::new(|name: &str, _: &str| {
        (name == "id").then_some(TypeTag::String)
    }));
    session.initialize("id = 42\nn = 1", None, RuleKind::Standard);
    session.start();
    session.continue_();
    assert_eq!(session.engine().variable("id").unwrap().type_tag, TypeTag::String);
    assert_eq!(session.engine().variable("n").unwrap().type_tag, TypeTag::Number);
}

#[test]
fn test_generated_code_translation() {
    let mut session = session();
    session.initialize(RULES, None, RuleKind::Standard);
    let report = session.attach_generated_code(GENERATED);
    assert!(report.gaps.is_empty());

    assert_eq!(session.translate_generated_line(4), Some(3));
    assert!(session
        .terminal()
        .messages()
        .any(|m| m.kind == MessageKind::Trace && m.text.starts_with("generated line 4 -> rule line 3")));

    // the def line is not instrumentable, so it has no rule line
    assert_eq!(session.translate_generated_line(1), None);
    assert!(session
        .terminal()
        .messages()
        .any(|m| m.kind == MessageKind::Error && m.text.starts_with("MAP/UNMAPPED")));

    session.set_breakpoints([3]);
    assert_eq!(session.generated_breakpoints(), vec![4]);

    session.start();
    session.continue_();
    let state = session.debug_state();
    let frame = state.top_frame().unwrap();
    assert_eq!(frame.origin, FrameOrigin::Generated);
    assert_eq!(frame.line, 4);
}

#[test]
fn test_translation_without_generated_code_is_reported() {
    let mut session = session();
    session.initialize(RULES, None, RuleKind::Standard);
    assert_eq!(session.translate_generated_line(1), None);
    let last = session.terminal().messages().last().unwrap().clone();
    assert_eq!(last.kind, MessageKind::Error);
    assert!(last.text.starts_with("MAP/NO_GENERATED_CODE"));
}

#[test]
fn test_console_commands() {
    let mut session = session();
    session.initialize(RULES, None, RuleKind::Standard);

    let help = session.execute_command("help");
    assert_eq!(help[0].kind, MessageKind::Debug);
    assert!(help[1].text.contains("break <line>"));

    let vars = session.execute_command("vars");
    assert_eq!(vars[1].text, "No variables");

    let toggled = session.execute_command("break 3");
    assert!(toggled.iter().any(|m| m.text == "Breakpoint set on line 3"));

    session.execute_command("run");
    let cont = session.execute_command("c");
    assert!(cont.iter().any(|m| m.text == "Paused at breakpoint on line 3"));

    let vars = session.execute_command("vars");
    let texts: Vec<&str> = vars.iter().skip(1).map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["price: number = 100", "quantity: number = 3"]);

    let unknown = session.execute_command("jump 4");
    assert_eq!(unknown[1].kind, MessageKind::Error);

    let map = session.execute_command("map");
    assert!(map[1].text.starts_with("MAP/NO_GENERATED_CODE"));

    session.execute_command("clear");
    assert!(session.terminal().is_empty());
    assert!(session.debug_state().terminal_messages.is_empty());

    session.execute_command("q");
    assert!(!session.get_current_state().is_running);
}

#[test]
fn test_terminal_cap_from_config() {
    let config = DebugConfig {
        terminal_limit: 5,
        ..DebugConfig::default()
    };
    let mut session = DebugSession::new(config);
    session.initialize(TEN_LINES, None, RuleKind::Standard);
    session.start();
    session.continue_();
    assert_eq!(session.terminal().len(), 5);
    assert_eq!(session.debug_state().terminal_messages.len(), 5);
}
