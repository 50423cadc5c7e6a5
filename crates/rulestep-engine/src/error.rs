//! Engine error model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Every line is a comment or empty
    #[error("ENGINE/NO_EXECUTABLE: no executable statements")]
    NoExecutableStatements,

    /// Step or continue requested while the engine is idle
    #[error("ENGINE/NOT_RUNNING: execution has not been started")]
    NotRunning,

    #[error("ENGINE/BREAKPOINT: line {line} is outside 1..={total}")]
    BreakpointOutOfRange { line: u32, total: u32 },
}
