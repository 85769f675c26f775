//! Error types for the HRV link

use thiserror::Error;

/// Core HRV link errors
#[derive(Error, Debug)]
pub enum HrvError {
    // Wire errors
    #[error("Malformed {frame} frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        frame: &'static str,
        expected: usize,
        actual: usize,
    },

    // Storage errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Preference errors
    #[error("Invalid threshold {key}: {value:?}")]
    InvalidThreshold { key: String, value: String },

    // Link errors
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // Runtime errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HrvError {
    /// True for the error a missing partition or key produces
    pub fn is_not_found(&self) -> bool {
        matches!(self, HrvError::NotFound(_))
    }
}

/// Result type for HRV link operations
pub type HrvResult<T> = Result<T, HrvError>;
