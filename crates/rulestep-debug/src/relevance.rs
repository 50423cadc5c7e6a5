//! Variable Relevance Detector
//!
//! Separates business-relevant variables from interpreter noise for display.
//! Every heuristic is a pure function over a fixed pattern table.

use lazy_static::lazy_static;
use regex::Regex;
use rulestep_engine::{Variable, VariableScope};
use rulestep_lang::DynamicValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Dunder names that still carry user data
pub const DUNDER_EXCEPTIONS: &[&str] = &["__properties__"];

/// Field names worth showing even while empty
pub const MEANINGFUL_EMPTY_NAMES: &[&str] = &["status", "result", "message", "error", "response"];

/// Built-in functions, modules and helpers injected by the runtime
pub const BUILTIN_NAMES: &[&str] = &[
    "print", "len", "str", "int", "float", "bool", "list", "dict", "set", "tuple", "range",
    "type", "isinstance", "getattr", "setattr", "hasattr", "open", "input", "sum", "min", "max",
    "abs", "round", "sorted", "reversed", "map", "filter", "zip", "enumerate", "any", "all",
    "repr", "format", "object", "super", "id", "hash", "iter", "next", "vars", "globals",
    "locals", "eval", "exec", "compile", "json", "sys", "math", "re", "os", "datetime",
    "traceback", "log", "log_message", "step_control",
];

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();

    /// Business-domain names: entity and money prefixes
    static ref BUSINESS_NAME: Regex = Regex::new(
        r"(?i)^(customer|client|user|account|order|product|item|price|amount|total|subtotal|discount|tax|fee|cost|quantity|qty|status|date|time|score|rate|limit|balance|payment|invoice|record|rule)"
    ).unwrap();

    /// Boolean flags: isActive, has_items, canRetry
    static ref FLAG_NAME: Regex = Regex::new(r"^(is|has|can|should)([A-Z_]|$)").unwrap();

    /// Action methods: getTotal, set_status, calculateFee
    static ref ACTION_NAME: Regex = Regex::new(
        r"^(get|set|create|update|delete|calculate|validate|check|process|apply)([A-Z_]|$)"
    ).unwrap();
}

/// Why a variable is shown or hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    /// Matches a business-domain pattern
    Business,
    /// Holds non-trivial content
    Content,
    /// Empty but named like a field worth watching
    MeaningfulEmpty,
    /// An empty array or object
    EmptyCollection,
    /// A plausible user-defined identifier
    Identifier,
    Dunder,
    Builtin,
    Empty,
    /// Not a plausible identifier at all
    Unrecognized,
}

impl Relevance {
    pub fn is_relevant(&self) -> bool {
        matches!(
            self,
            Relevance::Business
                | Relevance::Content
                | Relevance::MeaningfulEmpty
                | Relevance::EmptyCollection
                | Relevance::Identifier
        )
    }
}

pub fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

pub fn is_business_name(name: &str) -> bool {
    BUSINESS_NAME.is_match(name) || FLAG_NAME.is_match(name) || ACTION_NAME.is_match(name)
}

pub fn is_plausible_identifier(name: &str) -> bool {
    name.len() > 1 && IDENTIFIER.is_match(name) && !is_builtin(name)
}

fn is_blank(value: &DynamicValue) -> bool {
    match value {
        DynamicValue::Null => true,
        DynamicValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn has_content(value: &DynamicValue) -> bool {
    match value {
        DynamicValue::Null => false,
        DynamicValue::Bool(_) => true,
        DynamicValue::Number(n) => n.is_finite(),
        DynamicValue::String(s) => !s.trim().is_empty(),
        DynamicValue::Array(items) => !items.is_empty(),
        DynamicValue::Object(fields) => !fields.is_empty(),
    }
}

/// Classify one captured name/value pair
pub fn assess(name: &str, value: &DynamicValue) -> Relevance {
    if is_dunder(name) && !DUNDER_EXCEPTIONS.contains(&name) {
        return Relevance::Dunder;
    }
    if is_builtin(name) {
        return Relevance::Builtin;
    }
    if is_blank(value) {
        let lowered = name.to_lowercase();
        return if MEANINGFUL_EMPTY_NAMES.contains(&lowered.as_str()) {
            Relevance::MeaningfulEmpty
        } else {
            Relevance::Empty
        };
    }
    if value.is_empty_collection() {
        return Relevance::EmptyCollection;
    }
    if is_business_name(name) {
        return Relevance::Business;
    }
    if has_content(value) {
        return Relevance::Content;
    }
    if is_plausible_identifier(name) {
        Relevance::Identifier
    } else {
        Relevance::Unrecognized
    }
}

pub fn is_relevant(variable: &Variable) -> bool {
    assess(&variable.name, &variable.value).is_relevant()
}

/// Variables written by executed statements first, then by name
pub fn display_order(a: &Variable, b: &Variable) -> Ordering {
    let rank = |v: &Variable| match v.scope {
        VariableScope::Local => 0,
        VariableScope::Injected => 1,
    };
    rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
}

/// Relevant variables in display order
pub fn filter_relevant(variables: &[Variable]) -> Vec<Variable> {
    let mut relevant: Vec<Variable> = variables.iter().filter(|v| is_relevant(v)).cloned().collect();
    relevant.sort_by(display_order);
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulestep_lang::TypeTag;
    use serde_json::json;
    use std::collections::VecDeque;

    fn var(name: &str, value: DynamicValue, scope: VariableScope) -> Variable {
        Variable {
            name: name.to_string(),
            type_tag: TypeTag::of(&value),
            value,
            scope,
            changed: true,
            previous_value: None,
            value_history: VecDeque::new(),
        }
    }

    #[test]
    fn test_dunder_and_builtins_are_noise() {
        assert_eq!(assess("__name__", &"main".into()), Relevance::Dunder);
        assert_eq!(assess("__properties__", &json!({"a": 1}).into()), Relevance::Content);
        assert_eq!(assess("print", &"fn".into()), Relevance::Builtin);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(assess("scratch", &DynamicValue::Null), Relevance::Empty);
        assert_eq!(assess("status", &DynamicValue::Null), Relevance::MeaningfulEmpty);
        assert_eq!(assess("Result", &"".into()), Relevance::MeaningfulEmpty);
        assert_eq!(assess("items", &json!([]).into()), Relevance::EmptyCollection);
    }

    #[test]
    fn test_business_patterns() {
        for name in ["customerName", "order_id", "totalPrice", "isActive", "has_items", "calculateFee"] {
            assert!(is_business_name(name), "{name}");
        }
        assert!(!is_business_name("island"));
        assert!(!is_business_name("settle"));
        assert_eq!(assess("discount", &DynamicValue::Number(5.0)), Relevance::Business);
        assert_eq!(assess("x", &DynamicValue::Number(5.0)), Relevance::Content);
        assert_eq!(assess("ratio", &DynamicValue::Number(f64::NAN)), Relevance::Identifier);
        assert_eq!(assess("$", &DynamicValue::Number(f64::NAN)), Relevance::Unrecognized);
    }

    #[test]
    fn test_filter_orders_locals_first() {
        let vars = vec![
            var("record", json!({"id": 1}).into(), VariableScope::Injected),
            var("zeta", DynamicValue::Number(1.0), VariableScope::Local),
            var("__doc__", "x".into(), VariableScope::Local),
            var("alpha", DynamicValue::Bool(true), VariableScope::Local),
        ];
        let names: Vec<String> = filter_relevant(&vars).into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["alpha", "zeta", "record"]);
    }
}
