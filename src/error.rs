//! Crate-wide error types.

use thiserror::Error;

pub type StackscopeResult<T> = Result<T, StackscopeError>;

#[derive(Debug, Error)]
pub enum StackscopeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("line {line}: invalid sample timestamp {text:?}")]
    Timestamp { line: usize, text: String },

    #[error("stack dump ending at line {line} (timestamp {timestamp_ns}): {message}")]
    Dump {
        line: usize,
        timestamp_ns: i64,
        message: String,
    },

    #[error("stack parse: {0}")]
    StackParse(String),

    #[error("record error: {0}")]
    Record(String),
}

impl From<ureq::Error> for StackscopeError {
    fn from(value: ureq::Error) -> Self {
        Self::Record(value.to_string())
    }
}
