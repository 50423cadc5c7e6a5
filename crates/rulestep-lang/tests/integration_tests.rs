//! Integration tests for the rule-language layer.
//!
//! These tests drive parsing and evaluation together the way the execution
//! engine does: parse a line, pull the assignment apart, evaluate the value.

use rulestep_lang::{
    evaluate, find_assignment_operator, parse_statements, DynamicValue, StatementKind, TypeTag,
};
use std::collections::HashMap;

const SAMPLE_RULE: &str = r#"// Discount rule
customer = {"name": "Ada", "tier": "gold"}
total = 150

if total > 100 and customer.tier == "gold"
discount = 0.15
note = customer.name.contains("Ad")
"#;

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_parse_is_deterministic_and_line_aligned() {
    let first = parse_statements(SAMPLE_RULE);
    let second = parse_statements(SAMPLE_RULE);

    assert_eq!(first.len(), SAMPLE_RULE.lines().count());
    assert_eq!(first, second);

    for (index, stmt) in first.iter().enumerate() {
        assert_eq!(stmt.line as usize, index + 1);
    }
}

#[test]
fn test_sample_rule_kinds() {
    let kinds: Vec<StatementKind> = parse_statements(SAMPLE_RULE).iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::Comment,
            StatementKind::Assignment,
            StatementKind::Assignment,
            StatementKind::Empty,
            StatementKind::Condition,
            StatementKind::Assignment,
            StatementKind::Assignment,
        ]
    );
}

#[test]
fn test_condition_references() {
    let statements = parse_statements(SAMPLE_RULE);
    assert_eq!(statements[4].referenced, vec!["total", "customer"]);
}

// =============================================================================
// Evaluation through assignments
// =============================================================================

fn run_assignments(source: &str) -> HashMap<String, DynamicValue> {
    let mut env = HashMap::new();
    for stmt in parse_statements(source) {
        if stmt.kind != StatementKind::Assignment {
            continue;
        }
        let op = find_assignment_operator(&stmt.text).unwrap();
        let value = evaluate(&stmt.text[op + 1..], &env);
        env.insert(stmt.defined[0].name.clone(), value);
    }
    env
}

#[test]
fn test_scenario_simple_assignment() {
    let env = run_assignments("x = 5");
    assert_eq!(env["x"], DynamicValue::Number(5.0));
    assert_eq!(env["x"].type_tag(), TypeTag::Number);
}

#[test]
fn test_sample_rule_values() {
    let env = run_assignments(SAMPLE_RULE);
    assert_eq!(env["total"], DynamicValue::Number(150.0));
    assert_eq!(env["discount"], DynamicValue::Number(0.15));
    assert_eq!(env["note"], DynamicValue::Bool(true));
    assert_eq!(env["customer"].type_tag(), TypeTag::Object);
}
