use crate::types::SessionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid session handle: {0}")]
    InvalidHandle(SessionId),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("haystack must contain at least one entry")]
    EmptyHaystack,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("options must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("malformed options: {0}")]
    Malformed(String),

    #[error("unknown case mode: {0}")]
    UnknownCaseMode(i64),

    #[error("unknown sort criterion {value} at position {position}")]
    UnknownCriterion { position: usize, value: i64 },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("engine is no longer accepting requests")]
    Closed,
}
