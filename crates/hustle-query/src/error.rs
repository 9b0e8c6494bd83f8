//! Query-layer errors (spec §7: `PlanError`, `UnsupportedFeature`,
//! `ExecutionError`).

use hustle_core::{ErrorKind, HustleError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Resolution produced an inconsistent reference: unknown column,
    /// type-incompatible comparison, or an unresolvable table name.
    #[error("plan error: {0}")]
    Plan(String),

    /// A construct the core execution path cannot run (spec §1 NON-GOALS:
    /// correlated subqueries, window functions, full outer joins; spec
    /// §4.5: NOT in a non-leaf position; spec §4.7: non-equijoin
    /// predicates).
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Arithmetic overflow or another runtime failure during execution.
    #[error("execution error: {0}")]
    Execution(String),

    #[error(transparent)]
    Storage(#[from] hustle_storage::StorageError),
}

pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    pub fn plan(message: impl Into<String>) -> Self {
        Self::Plan(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

impl From<QueryError> for HustleError {
    fn from(err: QueryError) -> Self {
        let kind = match &err {
            QueryError::Plan(_) => ErrorKind::PlanError,
            QueryError::Unsupported(_) => ErrorKind::UnsupportedFeature,
            QueryError::Execution(_) => ErrorKind::ExecutionError,
            QueryError::Storage(e) => {
                if e.is_schema_mismatch() {
                    ErrorKind::SchemaMismatch
                } else {
                    ErrorKind::ExecutionError
                }
            }
        };
        let message = err.to_string();
        HustleError::with_source(kind, message, err)
    }
}
