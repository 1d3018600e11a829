//! Error types for the saw demo core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum SdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown parameter id: {0}")]
    UnknownParam(u32),
}

/// Result type alias
pub type SdResult<T> = Result<T, SdError>;
