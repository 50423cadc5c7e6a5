//! Error model for source-map generation and persistence
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("MAP/IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("MAP/SERIALIZE: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("CONFIG/PROFILE: {0}")]
    Profile(String),
}
