use thiserror::Error;

/// Storage-specific error types for gate metadata.
///
/// These errors represent failures turning typed records into stored values
/// and back, or writing them to the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused the write
    #[error("Store rejected write to {key}")]
    WriteRejected { key: String },

    /// Backing file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record failed validation
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
