//! Storage error types.

use hustle_core::{ErrorKind, HustleError};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A record's shape does not match the table's declared schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A block (or table) cannot admit a row within its byte-size budget.
    #[error("out of memory allocating a new block: {0}")]
    OutOfMemory(String),

    /// A row id does not resolve to any block in the table.
    #[error("row id {0} out of range")]
    RowOutOfRange(u64),

    /// A column id does not exist in the schema.
    #[error("column index {0} out of range")]
    ColumnOutOfRange(usize),

    /// I/O failure reading or writing a block-file snapshot.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file's contents are structurally invalid.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Catch-all for invariant violations -- always a bug.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch(_))
    }
}

impl From<StorageError> for HustleError {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            StorageError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            StorageError::Io(_) | StorageError::CorruptSnapshot(_) => ErrorKind::ExecutionError,
            StorageError::OutOfMemory(_)
            | StorageError::RowOutOfRange(_)
            | StorageError::ColumnOutOfRange(_) => ErrorKind::ExecutionError,
            StorageError::Internal(_) => ErrorKind::Internal,
        };
        let message = err.to_string();
        HustleError::with_source(kind, message, err)
    }
}
