//! Debug session error model
use rulestep_engine::EngineError;
use rulestep_map::MapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebugError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("CONFIG/IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("COMMAND/UNKNOWN: {0} (type `help`)")]
    UnknownCommand(String),

    #[error("COMMAND/ARGUMENT: {0}")]
    InvalidArgument(String),

    #[error("MAP/NO_GENERATED_CODE: no generated code attached")]
    NoGeneratedCode,

    #[error("MAP/UNMAPPED: generated line {0} has no rule line")]
    UnmappedLine(u32),
}
