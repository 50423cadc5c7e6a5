//! Errors for the rule-language layer
use thiserror::Error;

/// Parsing and evaluation degrade instead of failing, so the only hard
/// error here is decoding an explicit JSON document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LangError {
    #[error("PARSE/JSON: {0}")]
    Json(String),
}
