use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A live session already owns the requested join code.
    #[error("join code `{0}` is already in use")]
    JoinCodeTaken(String),
    /// A record with the same identifier already exists.
    #[error("record `{0}` already exists")]
    Duplicate(String),
}
