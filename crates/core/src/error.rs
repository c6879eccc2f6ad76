use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Malformed diff at line {line}: {message}")]
    Diff { line: usize, message: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TestscopeError>;
