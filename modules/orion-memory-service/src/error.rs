//! Error type for the fact store and retention policy.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The underlying database could not be reached or a statement failed.
    /// Never retried inside the store.
    StorageUnavailable(String),
    /// Invalid retention settings, detected before the store is opened
    Configuration(String),
}

impl MemoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        MemoryError::StorageUnavailable(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        MemoryError::Configuration(message.into())
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, MemoryError::StorageUnavailable(_))
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::StorageUnavailable(msg) => write!(f, "storage unavailable: {}", msg),
            MemoryError::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for MemoryError {}

impl From<rusqlite::Error> for MemoryError {
    fn from(e: rusqlite::Error) -> Self {
        MemoryError::StorageUnavailable(e.to_string())
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;
