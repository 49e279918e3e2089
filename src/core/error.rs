use thiserror::Error;

use crate::requests::Expense;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dependency cycle through {0:?}")]
    DependencyCycle(Expense),

    #[error("Unknown expense referenced: {0:?}")]
    UnknownExpense(Expense),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
