//! Oracle errors (spec §7: `PlanError`, `UnsupportedFeature`).

use hustle_core::{ErrorKind, HustleError};

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The SQL text itself did not parse.
    #[error("parse error: {0}")]
    Parse(String),

    /// Parsed fine, but resolution hit an unknown table/column, an
    /// ambiguous unqualified column, or a non-equijoin comparison between
    /// two tables.
    #[error("plan error: {0}")]
    Plan(String),

    /// A SQL construct the core does not execute (spec §1 NON-GOALS:
    /// correlated subqueries, window functions, full outer joins; OR across
    /// tables, since it can't be pushed into a per-table predicate map).
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// The shadow database rejected a DDL/DML statement or a textual
    /// EXPLAIN request.
    #[error(transparent)]
    Shadow(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, OracleError>;

impl OracleError {
    pub fn plan(message: impl Into<String>) -> Self {
        Self::Plan(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

impl From<OracleError> for HustleError {
    fn from(err: OracleError) -> Self {
        let kind = match &err {
            OracleError::Parse(_) | OracleError::Plan(_) => ErrorKind::PlanError,
            OracleError::Unsupported(_) => ErrorKind::UnsupportedFeature,
            OracleError::Shadow(_) => ErrorKind::ExecutionError,
        };
        let message = err.to_string();
        HustleError::with_source(kind, message, err)
    }
}
