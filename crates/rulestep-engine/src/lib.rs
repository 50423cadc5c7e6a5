//! Rulestep Engine: statement-at-a-time interpretation of rule source
//!
//! The [`ExecutionEngine`] owns the variable environment
//! ([`ExecutionContext`]) and a statement cursor, and only moves when asked:
//! `start`, `step_next`, `continue_`, `stop`.

pub mod capability;
pub mod context;
pub mod engine;
pub mod error;
pub mod variable;

pub use capability::{FixedRecord, MockDataProvider, TypeDetector};
pub use context::{ExecutionContext, RuleKind, BUILTIN_VARIABLE_NAME};
pub use engine::{
    ContinueOutcome, EngineState, ExecutionEngine, StepOutcome, StopReason, LOG_HELPERS,
};
pub use error::EngineError;
pub use variable::{HistoryEntry, Variable, VariableScope, MAX_VALUE_HISTORY};
