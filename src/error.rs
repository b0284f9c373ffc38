//! Error types for CacheTable
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for CacheTable operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Counter {key} holds non-numeric value {value}")]
    NonNumeric { key: String, value: String },

    #[error("Counter overflow: {0}")]
    CounterOverflow(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// True for errors caused by the caller passing bad input.
    ///
    /// Usage errors are programmer bugs and should not be retried; the rest
    /// come from the environment (disk, files) and may succeed on retry.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidNamespace(_)
                | CacheError::NonNumeric { .. }
                | CacheError::CounterOverflow(_)
        )
    }
}
