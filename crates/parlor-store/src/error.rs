use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Generic I/O error while reading or writing a collection file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Collection serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Refused to overwrite a collection file with invalid records.
    #[error("Refusing to persist invalid collection: {0}")]
    InvalidCollection(String),

    /// The named record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requesting user is not a participant/admin of the thread.
    #[error("Access denied")]
    Forbidden,

    /// Malformed caller input (username, text, field value).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
