//! Optional external capabilities the engine and session consume.
//!
//! Both are best-effort: when absent the engine infers types from values and
//! record-bound rules run without injected data.

use crate::context::RuleKind;
use rulestep_lang::{DynamicValue, TypeTag};

/// Static type detection over the rule source
pub trait TypeDetector {
    /// `None` means "no opinion"; the engine then infers from the value
    fn detect_variable_type(&self, name: &str, source_text: &str) -> Option<TypeTag>;
}

impl<F> TypeDetector for F
where
    F: Fn(&str, &str) -> Option<TypeTag>,
{
    fn detect_variable_type(&self, name: &str, source_text: &str) -> Option<TypeTag> {
        self(name, source_text)
    }
}

/// Supplies the record injected into record-bound rules
pub trait MockDataProvider {
    fn mock_record(&self, kind: RuleKind) -> Option<DynamicValue>;
}

/// A provider that always hands out the same record
#[derive(Debug, Clone)]
pub struct FixedRecord(pub DynamicValue);

impl MockDataProvider for FixedRecord {
    fn mock_record(&self, kind: RuleKind) -> Option<DynamicValue> {
        kind.injects_builtin().then(|| self.0.clone())
    }
}
