//! The shared error taxonomy (spec §7 ERROR HANDLING DESIGN).
//!
//! Every crate in the workspace defines its own narrow, `thiserror`-derived
//! error type for its own concern (`StorageError`, `SchedulerError`, ...);
//! each of those converts into [`HustleError`] at the crate boundary so the
//! driver can always branch on one [`ErrorKind`] regardless of which layer
//! raised the error.

use std::fmt;

/// The five error kinds named in spec §7. Not a type per kind -- a tag
/// carried alongside a message, so callers can switch on it without
/// downcasting through `dyn Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Insertion or DDL shape does not match the declared schema.
    SchemaMismatch,
    /// The oracle returned a construct the core cannot execute.
    UnsupportedFeature,
    /// Resolution produced inconsistent references.
    PlanError,
    /// Arithmetic overflow, I/O failure, or other runtime failure.
    ExecutionError,
    /// An invariant was violated; always a bug.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SchemaMismatch => "schema_mismatch",
            Self::UnsupportedFeature => "unsupported_feature",
            Self::PlanError => "plan_error",
            Self::ExecutionError => "execution_error",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// The umbrella error type surfaced by `execute_query` and friends.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HustleError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HustleError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    pub fn unsupported_feature(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFeature, message)
    }

    pub fn plan_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PlanError, message)
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutionError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HustleError>;
