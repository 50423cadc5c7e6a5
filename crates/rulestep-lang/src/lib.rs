//! Rulestep language layer: statements, values and expression evaluation.
//!
//! Rule source is classified line by line into [`Statement`]s by
//! [`parse_statements`]. Expressions are evaluated lazily, at execution time,
//! by [`evaluate`] against any [`Environment`].
//!
//! # Example
//!
//! ```ignore
//! use rulestep_lang::{evaluate, parse_statements, DynamicValue};
//! use std::collections::HashMap;
//!
//! let statements = parse_statements("total = 150\nif total > 100");
//! let mut env = HashMap::new();
//! env.insert("total".to_string(), DynamicValue::Number(150.0));
//! assert_eq!(evaluate("total > 100", &env), DynamicValue::Bool(true));
//! ```

pub mod error;
pub mod eval;
pub mod statement;
pub mod value;

pub use error::LangError;
pub use eval::{evaluate, lookup_path, parse_function_call, supported_methods, Environment};
pub use statement::{
    assignment_target, classify, extract_identifiers, find_assignment_operator, parse_line,
    parse_statements, Statement, StatementKind, VariableRef, KEYWORD_STOPLIST,
};
pub use value::{DynamicValue, TypeTag};
