//! Shared domain types for the Hustle analytical query engine.
//!
//! This crate has no I/O and no concurrency of its own: it defines the
//! vocabulary (schemas, ids, scalar values, comparators, error taxonomy)
//! that `hustle-storage`, `hustle-scheduler`, `hustle-query`, and
//! `hustle-oracle` all build on.

pub mod comparator;
pub mod error;
pub mod ids;
pub mod schema;
pub mod value;

pub use comparator::CompareOp;
pub use error::{ErrorKind, HustleError, Result};
pub use ids::{BlockId, ChunkRowId, RowId, RowInBlock, TableName};
pub use schema::{Column, ColumnType, Schema};
pub use value::Value;
