//! Expression evaluator.
//!
//! Evaluation walks a fixed ladder and every rung has a fallback, so any
//! text evaluates to *some* value:
//!
//! 1. empty string literals
//! 2. quoted string literals
//! 3. integer and decimal literals
//! 4. `true` / `false` / `null`
//! 5. bracketed JSON arrays and objects (raw text when the JSON is invalid)
//! 6. one pair of enclosing parentheses, evaluated as the inner expression
//! 7. method calls `receiver.method(args)` through a closed dispatch table
//! 8. variable lookup, including dotted property reads
//! 9. boolean `or` / `and` / `not`
//! 10. binary comparison (`==`, `!=`, `>=`, `<=`, `>`, `<`)
//! 11. the trimmed text itself

use crate::value::DynamicValue;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^-?\d+(\.\d+)?$").unwrap();

    static ref VARIABLE_PATH: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();

    /// Closed method dispatch table. Adding a method means adding an entry here.
    static ref METHODS: HashMap<&'static str, MethodFn> = {
        let mut m: HashMap<&'static str, MethodFn> = HashMap::new();
        m.insert("contains", method_contains);
        m.insert("startsWith", method_starts_with);
        m.insert("endsWith", method_ends_with);
        m.insert("toUpperCase", method_to_upper);
        m.insert("toLowerCase", method_to_lower);
        m.insert("trim", method_trim);
        m.insert("length", method_length);
        m.insert("toString", method_to_string);
        m.insert("keys", method_keys);
        m.insert("toBase64", method_to_base64);
        m.insert("fromBase64", method_from_base64);
        m
    };
}

/// Signature of a dispatch-table entry: receiver and evaluated arguments
pub type MethodFn = fn(&DynamicValue, &[DynamicValue]) -> DynamicValue;

/// Read access to the variables an expression can see
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<&DynamicValue>;
}

impl Environment for HashMap<String, DynamicValue> {
    fn lookup(&self, name: &str) -> Option<&DynamicValue> {
        self.get(name)
    }
}

impl Environment for BTreeMap<String, DynamicValue> {
    fn lookup(&self, name: &str) -> Option<&DynamicValue> {
        self.get(name)
    }
}

/// Names of every method in the dispatch table
pub fn supported_methods() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = METHODS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Evaluate an expression against an environment
pub fn evaluate(expr: &str, env: &dyn Environment) -> DynamicValue {
    let expr = expr.trim();

    if expr.is_empty() || expr == "\"\"" || expr == "''" {
        return DynamicValue::String(String::new());
    }

    if let Some(literal) = parse_string_literal(expr) {
        return DynamicValue::String(literal);
    }

    if NUMBER.is_match(expr) {
        if let Ok(n) = expr.parse::<f64>() {
            return DynamicValue::Number(n);
        }
    }

    match expr {
        "true" => return DynamicValue::Bool(true),
        "false" => return DynamicValue::Bool(false),
        "null" => return DynamicValue::Null,
        _ => {}
    }

    if (expr.starts_with('[') && expr.ends_with(']'))
        || (expr.starts_with('{') && expr.ends_with('}'))
    {
        return DynamicValue::parse_json(expr)
            .unwrap_or_else(|_| DynamicValue::String(expr.to_string()));
    }

    if expr.starts_with('(') && expr.ends_with(')') && matching_open_paren(expr) == Some(0) {
        return evaluate(&expr[1..expr.len() - 1], env);
    }

    if let Some(call) = parse_method_call(expr) {
        return call_method(&call, env);
    }

    if VARIABLE_PATH.is_match(expr) {
        if let Some(value) = lookup_path(expr, env) {
            return value.clone();
        }
    }

    if let Some((lhs, rhs)) = split_top_level(expr, " or ") {
        let result = evaluate(lhs, env).is_truthy() || evaluate(rhs, env).is_truthy();
        return DynamicValue::Bool(result);
    }

    if let Some((lhs, rhs)) = split_top_level(expr, " and ") {
        let result = evaluate(lhs, env).is_truthy() && evaluate(rhs, env).is_truthy();
        return DynamicValue::Bool(result);
    }

    if let Some(operand) = expr.strip_prefix("not ") {
        return DynamicValue::Bool(!evaluate(operand, env).is_truthy());
    }

    if let Some((lhs, op, rhs)) = find_comparison(expr) {
        let left = evaluate(lhs, env);
        let right = evaluate(rhs, env);
        return DynamicValue::Bool(compare(&left, op, &right));
    }

    DynamicValue::String(expr.to_string())
}

/// A free function call `name(args)` spanning the whole expression.
/// Arguments come back unevaluated.
pub fn parse_function_call(expr: &str) -> Option<(&str, Vec<&str>)> {
    let expr = expr.trim().trim_end_matches(';').trim_end();
    if !expr.ends_with(')') {
        return None;
    }
    let open = matching_open_paren(expr)?;
    let name = expr[..open].trim_end();
    if !VARIABLE_PATH.is_match(name) {
        return None;
    }
    Some((name, split_arguments(&expr[open + 1..expr.len() - 1])))
}

/// Resolve `name` or `name.field.sub` against the environment
pub fn lookup_path<'a>(path: &str, env: &'a dyn Environment) -> Option<&'a DynamicValue> {
    let mut segments = path.split('.');
    let base = env.lookup(segments.next()?)?;
    let rest: Vec<&str> = segments.collect();
    base.get_path(&rest)
}

/// A string literal whose only unescaped quote of its kind is the closing one
fn parse_string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else if c == quote {
            return None;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[derive(Debug)]
struct MethodCall<'a> {
    receiver: &'a str,
    method: &'a str,
    args: Vec<&'a str>,
}

/// Recognise `receiver.method(args)` where the final `)` closes the call
fn parse_method_call(expr: &str) -> Option<MethodCall<'_>> {
    if !expr.ends_with(')') {
        return None;
    }
    let open = matching_open_paren(expr)?;
    let head = &expr[..open];
    let dot = head.rfind('.')?;
    let receiver = &head[..dot];
    let method = &head[dot + 1..];

    if !VARIABLE_PATH.is_match(receiver)
        || method.is_empty()
        || !method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }

    let inner = &expr[open + 1..expr.len() - 1];
    let args = split_arguments(inner);
    Some(MethodCall {
        receiver,
        method,
        args,
    })
}

/// Byte offset of the `(` matching the trailing `)`
fn matching_open_paren(expr: &str) -> Option<usize> {
    let blanked = crate::statement::blank_string_literals(expr);
    let mut depth = 0i32;
    for (i, b) in blanked.bytes().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn call_method(call: &MethodCall<'_>, env: &dyn Environment) -> DynamicValue {
    let receiver = lookup_path(call.receiver, env)
        .cloned()
        .unwrap_or(DynamicValue::Null);
    let args: Vec<DynamicValue> = call.args.iter().map(|a| evaluate(a, env)).collect();

    match METHODS.get(call.method) {
        Some(method) => method(&receiver, &args),
        None => receiver,
    }
}

/// Split call arguments on commas at nesting depth zero
fn split_arguments(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let blanked = crate::statement::blank_string_literals(inner);
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in blanked.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

/// Split on the first occurrence of `sep` outside strings and brackets
fn split_top_level<'a>(expr: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    let blanked = crate::statement::blank_string_literals(expr);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(sep.as_bytes()) => {
                return Some((&expr[..i], &expr[i + sep.len()..]));
            }
            _ => {}
        }
    }
    None
}

/// First top-level comparison operator
fn find_comparison(expr: &str) -> Option<(&str, &'static str, &str)> {
    const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

    let blanked = crate::statement::blank_string_literals(expr);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ if depth == 0 => {
                for op in OPERATORS {
                    if bytes[i..].starts_with(op.as_bytes()) {
                        return Some((&expr[..i], op, &expr[i + op.len()..]));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn compare(left: &DynamicValue, op: &str, right: &DynamicValue) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (DynamicValue::Number(a), DynamicValue::Number(b)) => a.partial_cmp(b),
        (DynamicValue::String(a), DynamicValue::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        "==" => left == right,
        "!=" => left != right,
        ">" => ordering == Some(Ordering::Greater),
        "<" => ordering == Some(Ordering::Less),
        ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

// === Dispatch table entries ===

fn first_arg_text(args: &[DynamicValue]) -> String {
    args.first().map(DynamicValue::to_plain_string).unwrap_or_default()
}

fn method_contains(receiver: &DynamicValue, args: &[DynamicValue]) -> DynamicValue {
    let found = match receiver {
        DynamicValue::String(s) => s.contains(first_arg_text(args).as_str()),
        DynamicValue::Array(items) => args.first().is_some_and(|needle| items.contains(needle)),
        DynamicValue::Object(_) => receiver.get(&first_arg_text(args)).is_some(),
        _ => false,
    };
    DynamicValue::Bool(found)
}

fn method_starts_with(receiver: &DynamicValue, args: &[DynamicValue]) -> DynamicValue {
    let result = receiver
        .as_str()
        .is_some_and(|s| s.starts_with(first_arg_text(args).as_str()));
    DynamicValue::Bool(result)
}

fn method_ends_with(receiver: &DynamicValue, args: &[DynamicValue]) -> DynamicValue {
    let result = receiver
        .as_str()
        .is_some_and(|s| s.ends_with(first_arg_text(args).as_str()));
    DynamicValue::Bool(result)
}

fn method_to_upper(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    match receiver {
        DynamicValue::String(s) => DynamicValue::String(s.to_uppercase()),
        other => other.clone(),
    }
}

fn method_to_lower(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    match receiver {
        DynamicValue::String(s) => DynamicValue::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn method_trim(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    match receiver {
        DynamicValue::String(s) => DynamicValue::String(s.trim().to_string()),
        other => other.clone(),
    }
}

fn method_length(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    match receiver {
        DynamicValue::String(s) => DynamicValue::Number(s.chars().count() as f64),
        DynamicValue::Array(items) => DynamicValue::Number(items.len() as f64),
        DynamicValue::Object(fields) => DynamicValue::Number(fields.len() as f64),
        _ => DynamicValue::Null,
    }
}

fn method_to_string(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    DynamicValue::String(receiver.to_plain_string())
}

fn method_keys(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    match receiver {
        DynamicValue::Object(fields) => DynamicValue::Array(
            fields
                .iter()
                .map(|(k, _)| DynamicValue::String(k.clone()))
                .collect(),
        ),
        _ => DynamicValue::Array(Vec::new()),
    }
}

fn method_to_base64(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    if receiver.is_null() {
        return DynamicValue::Null;
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(receiver.to_plain_string());
    DynamicValue::String(encoded)
}

fn method_from_base64(receiver: &DynamicValue, _args: &[DynamicValue]) -> DynamicValue {
    let Some(text) = receiver.as_str() else {
        return receiver.clone();
    };
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(DynamicValue::String)
        .unwrap_or_else(|| receiver.clone())
}
