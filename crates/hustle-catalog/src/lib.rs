//! Engine-wide persistent state that outlives a single connection: the
//! tuning knobs in [`EngineConfig`] and the table-schema catalog in
//! [`CatalogDocument`]. Grouped in one crate the way the teacher grouped
//! its own engine-wide settings in `beads-config`.

pub mod catalog;
pub mod config;

pub use catalog::{CatalogDocument, CatalogError};
pub use config::{ConfigError, EngineConfig};
