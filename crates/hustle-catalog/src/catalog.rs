//! The JSON catalog document (spec §6 "Catalog file"): table schemas, kept
//! on disk and rewritten atomically (write-temp-then-rename) whenever a
//! table is created or dropped.
//!
//! The document's shape is extended past spec.md's bare "name, column list,
//! primary key" to also record each column's nullable/unique flags and the
//! primary key, per `original_source/src/catalog/column_schema.h`'s
//! `ColumnSchema` (name, type, `notNull_`, `unique_`) and
//! `table_schema.h`'s `TableSchema` (name, columns, `primary_key_`) --
//! exactly the fields `hustle_core::Schema`/`Column` already carry, so the
//! document stores a `Schema` per table rather than a parallel struct.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hustle_core::{ErrorKind, HustleError, Schema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed catalog document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("table {0} already exists in the catalog")]
    AlreadyExists(String),
    #[error("table {0} is not in the catalog")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for HustleError {
    fn from(err: CatalogError) -> Self {
        let kind = match &err {
            CatalogError::Io { .. } | CatalogError::Malformed(_) => ErrorKind::ExecutionError,
            CatalogError::AlreadyExists(_) | CatalogError::NotFound(_) => ErrorKind::SchemaMismatch,
        };
        let message = err.to_string();
        HustleError::with_source(kind, message, err)
    }
}

/// The catalog document itself: every table Hustle currently knows about.
/// Serialized as a `BTreeMap` (sorted by name) so repeated saves of an
/// unchanged catalog produce byte-identical files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    tables: BTreeMap<String, Schema>,
}

impl CatalogDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the catalog document at `path`. A missing file is not an
    /// error -- it means a fresh database with no tables yet (spec §6:
    /// "on open, the engine reads this file").
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(err) => Err(CatalogError::Io { path: path.to_path_buf(), source: err }),
        }
    }

    /// Rewrites the catalog document at `path` atomically: write to a
    /// sibling temp file, then rename over the target. A reader never
    /// observes a half-written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|err| CatalogError::Io { path: path.to_path_buf(), source: err })?;
        use std::io::Write as _;
        tmp.write_all(contents.as_bytes()).map_err(|err| CatalogError::Io { path: path.to_path_buf(), source: err })?;
        tmp.persist(path).map_err(|err| CatalogError::Io { path: path.to_path_buf(), source: err.error })?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Schema> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn add_table(&mut self, name: &str, schema: Schema) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(CatalogError::AlreadyExists(name.to_string()));
        }
        self.tables.insert(name.to_string(), schema);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables.remove(name).map(|_| ()).ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType};

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Column::new("lo_orderkey", ColumnType::Int64).not_null().unique(),
            Column::new("lo_quantity", ColumnType::Int64),
        ])
        .with_primary_key(vec![0])
    }

    #[test]
    fn missing_file_loads_as_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let doc = CatalogDocument::load(&path).unwrap();
        assert_eq!(doc.table_names().count(), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut doc = CatalogDocument::new();
        doc.add_table("lineorder", sample_schema()).unwrap();
        doc.save(&path).unwrap();

        let reloaded = CatalogDocument::load(&path).unwrap();
        assert_eq!(reloaded.table("lineorder"), Some(&sample_schema()));
    }

    #[test]
    fn add_table_rejects_duplicate_name() {
        let mut doc = CatalogDocument::new();
        doc.add_table("lineorder", sample_schema()).unwrap();
        let err = doc.add_table("lineorder", sample_schema()).unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(name) if name == "lineorder"));
    }

    #[test]
    fn drop_table_removes_entry() {
        let mut doc = CatalogDocument::new();
        doc.add_table("lineorder", sample_schema()).unwrap();
        doc.drop_table("lineorder").unwrap();
        assert!(doc.table("lineorder").is_none());
    }

    #[test]
    fn drop_table_missing_is_an_error() {
        let mut doc = CatalogDocument::new();
        assert!(matches!(doc.drop_table("nope"), Err(CatalogError::NotFound(_))));
    }
}
