// Error types module

use std::fmt;

use crate::params::EditError;
use crate::storage::StorageError;

/// Top-level error type for the service
///
/// Wraps the subsystem errors so callers can map any failure to a
/// response status in one place.
#[derive(Debug)]
pub enum ServiceError {
    /// Configuration errors (invalid YAML, missing env vars, etc.)
    Config(String),

    /// Object storage failures (missing key, backend unavailable)
    Storage(StorageError),

    /// Parameter resolution or image editing failures
    Edit(EditError),

    /// Unexpected failures (worker panics, join errors)
    Internal(String),
}

impl ServiceError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServiceError::Config(_) => 500,
            ServiceError::Storage(err) => err.to_http_status(),
            ServiceError::Edit(err) => err.to_http_status(),
            ServiceError::Internal(_) => 500,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServiceError::Storage(err) => write!(f, "Storage error: {}", err),
            ServiceError::Edit(err) => write!(f, "Edit error: {}", err),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Storage(err) => Some(err),
            ServiceError::Edit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<EditError> for ServiceError {
    fn from(err: EditError) -> Self {
        ServiceError::Edit(err)
    }
}
