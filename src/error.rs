use thiserror::Error;

/// Unified error discriminant for every fallible operation in the core.
#[derive(Debug, Error)]
pub enum FsoError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("allocation failed: {0}")]
    OutOfMemory(String),
    #[error("component not initialized: {0}")]
    NotInitialized(String),
    #[error("algorithm did not converge: {0}")]
    NotConverged(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsoError>;

impl From<&'static str> for FsoError {
    fn from(s: &'static str) -> Self {
        FsoError::InvalidParam(s.to_string())
    }
}

impl From<String> for FsoError {
    fn from(s: String) -> Self {
        FsoError::InvalidParam(s)
    }
}
