//! Integration tests for the execution engine state machine.

use rulestep_engine::{
    EngineError, ExecutionEngine, RuleKind, StopReason, BUILTIN_VARIABLE_NAME, MAX_VALUE_HISTORY,
};
use rulestep_lang::{DynamicValue, TypeTag};
use serde_json::json;

fn loaded(source: &str) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new();
    engine.load(source, None, RuleKind::Standard);
    engine
}

fn ten_line_program() -> String {
    (1..=10).map(|i| format!("v{i} = {i}")).collect::<Vec<_>>().join("\n")
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_single_assignment() {
    let mut engine = loaded("x = 5");
    engine.start().unwrap();
    engine.step_next().unwrap();

    let x = engine.variable("x").unwrap();
    assert_eq!(x.value, DynamicValue::Number(5.0));
    assert_eq!(x.type_tag, TypeTag::Number);
    assert!(x.changed);
    assert_eq!(x.previous_value, None);
}

#[test]
fn test_comment_only_program() {
    let mut engine = loaded("// note");
    assert_eq!(engine.start().unwrap_err(), EngineError::NoExecutableStatements);
}

#[test]
fn test_continue_halts_at_breakpoint() {
    let mut engine = loaded(&ten_line_program());
    engine.set_breakpoints([5]);
    engine.start().unwrap();

    let outcome = engine.continue_().unwrap();
    assert_eq!(outcome.reason, StopReason::Breakpoint(5));
    assert_eq!(outcome.steps.len(), 4);

    let state = engine.current_state();
    assert_eq!(state.line, 5);
    assert!(state.is_paused);
    assert!(engine.variable("v4").is_some());
    assert!(engine.variable("v5").is_none());

    let rest = engine.continue_().unwrap();
    assert_eq!(rest.reason, StopReason::Finished);
    assert_eq!(rest.steps.len(), 6);
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn test_current_line_in_range_while_running() {
    let mut engine = loaded("a = 1\n\n// c\nb = a\nif b > 0\nc = b");
    engine.start().unwrap();
    loop {
        let state = engine.current_state();
        if !state.is_running {
            break;
        }
        assert!(state.line >= 1 && state.line <= state.total_lines);
        engine.step_next();
    }
}

#[test]
fn test_history_never_exceeds_bound() {
    let source = (0..30).map(|i| format!("counter = {i}")).collect::<Vec<_>>().join("\n");
    let mut engine = loaded(&source);
    engine.start().unwrap();
    while engine.step_next().is_some() {
        let counter = engine.variable("counter").unwrap();
        assert!(counter.value_history.len() <= MAX_VALUE_HISTORY);
    }
}

#[test]
fn test_stop_is_idempotent() {
    let mut engine = loaded(&ten_line_program());
    engine.start().unwrap();
    engine.step_next();

    engine.stop();
    let once = engine.current_state();
    engine.stop();
    let twice = engine.current_state();

    assert_eq!(once, twice);
    assert!(!twice.is_running);
    assert!(engine.step_next().is_none());
    assert!(engine.continue_().is_none());
}

#[test]
fn test_record_rules_get_injected_data_on_every_start() {
    let record = DynamicValue::from(json!({"customer": {"tier": "gold"}}));
    let mut engine = ExecutionEngine::new();
    engine.load(
        "vip = record.customer.tier == \"gold\"\nrecord = null",
        Some(record.clone()),
        RuleKind::Record,
    );

    engine.start().unwrap();
    engine.continue_().unwrap();
    assert_eq!(engine.variable("vip").unwrap().value, DynamicValue::Bool(true));
    assert_eq!(engine.variable(BUILTIN_VARIABLE_NAME).unwrap().value, DynamicValue::Null);

    engine.start().unwrap();
    assert_eq!(engine.variable(BUILTIN_VARIABLE_NAME).unwrap().value, record);
}
