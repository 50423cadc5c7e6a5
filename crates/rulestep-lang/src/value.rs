//! Runtime values for the rule language.
//!
//! `DynamicValue` mirrors the small literal grammar the evaluator accepts:
//! strings, numbers, booleans, null, JSON arrays and JSON objects. Objects
//! keep insertion order.

use crate::error::LangError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A value produced by evaluating a rule-language expression
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<DynamicValue>),
    /// Ordered key/value pairs
    Object(Vec<(String, DynamicValue)>),
}

/// Coarse type of a variable, either detected or inferred from its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Unknown,
}

impl TypeTag {
    /// Value-based inference: null, array, object, then the primitive kind
    pub fn of(value: &DynamicValue) -> Self {
        match value {
            DynamicValue::Null => TypeTag::Null,
            DynamicValue::Bool(_) => TypeTag::Boolean,
            DynamicValue::Number(_) => TypeTag::Number,
            DynamicValue::String(_) => TypeTag::String,
            DynamicValue::Array(_) => TypeTag::Array,
            DynamicValue::Object(_) => TypeTag::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DynamicValue {
    /// Parse a JSON document into a value
    pub fn parse_json(text: &str) -> Result<Self, LangError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| LangError::Json(e.to_string()))?;
        Ok(Self::from(json))
    }

    pub fn type_tag(&self) -> TypeTag {
        TypeTag::of(self)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Truthiness used by conditions and boolean operators
    pub fn is_truthy(&self) -> bool {
        match self {
            DynamicValue::Null => false,
            DynamicValue::Bool(b) => *b,
            DynamicValue::Number(n) => *n != 0.0 && !n.is_nan(),
            DynamicValue::String(s) => !s.is_empty(),
            DynamicValue::Array(items) => !items.is_empty(),
            DynamicValue::Object(fields) => !fields.is_empty(),
        }
    }

    /// True for empty arrays and empty objects
    pub fn is_empty_collection(&self) -> bool {
        match self {
            DynamicValue::Array(items) => items.is_empty(),
            DynamicValue::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a field on an object value
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        match self {
            DynamicValue::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a dotted path (`customer.address.city`) through nested objects
    pub fn get_path(&self, path: &[&str]) -> Option<&DynamicValue> {
        path.iter().try_fold(self, |current, segment| current.get(segment))
    }

    /// Set a field on an object value, replacing any existing entry.
    /// Non-object values are replaced by a fresh object first.
    pub fn set_field(&mut self, key: &str, value: DynamicValue) {
        if !matches!(self, DynamicValue::Object(_)) {
            *self = DynamicValue::Object(Vec::new());
        }
        if let DynamicValue::Object(fields) = self {
            match fields.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => *existing = value,
                None => fields.push((key.to_string(), value)),
            }
        }
    }

    /// Set a value at a dotted path, creating intermediate objects
    pub fn set_path(&mut self, path: &[&str], value: DynamicValue) {
        match path {
            [] => *self = value,
            [last] => self.set_field(last, value),
            [head, rest @ ..] => {
                if !matches!(self.get(head), Some(DynamicValue::Object(_))) {
                    self.set_field(head, DynamicValue::Object(Vec::new()));
                }
                if let DynamicValue::Object(fields) = self {
                    if let Some((_, child)) = fields.iter_mut().find(|(k, _)| k == head) {
                        child.set_path(rest, value);
                    }
                }
            }
        }
    }

    /// Plain-text rendering: strings without quotes, everything else as JSON
    pub fn to_plain_string(&self) -> String {
        match self {
            DynamicValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            DynamicValue::Null => serde_json::Value::Null,
            DynamicValue::Bool(b) => serde_json::Value::Bool(*b),
            DynamicValue::Number(n) => number_to_json(*n),
            DynamicValue::String(s) => serde_json::Value::String(s.clone()),
            DynamicValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(DynamicValue::to_json).collect())
            }
            DynamicValue::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Integral numbers render without a trailing `.0`
fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            serde_json::Value::Number(n) => DynamicValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(items) => {
                DynamicValue::Array(items.into_iter().map(DynamicValue::from).collect())
            }
            serde_json::Value::Object(map) => DynamicValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, DynamicValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<f64> for DynamicValue {
    fn from(n: f64) -> Self {
        DynamicValue::Number(n)
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(DynamicValue::from)
    }
}
