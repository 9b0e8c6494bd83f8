//! The SQL parsing oracle (spec §6 "Parser oracle"): a shadow SQLite
//! database that mirrors DDL, plus a resolver that turns a `SELECT` string
//! into the reference bundle `hustle-query`'s operator framework consumes.
//!
//! Grounded on `beads-storage/src/sqlite/store.rs` for the shadow
//! connection's lifecycle, and on `original_source/src/resolver/Resolver.cpp`
//! for what gets resolved and in what order.

mod error;
mod resolve;
mod shadow;

pub use error::{OracleError, Result};
pub use resolve::{resolve_select, ResolvedQuery, TableShape};
pub use shadow::ShadowDb;

use std::collections::HashMap;

use hustle_core::Schema;

/// Ties the shadow database to the table-shape registry the resolver needs,
/// so a caller only has to track one handle per open Hustle database.
pub struct Oracle {
    shadow: ShadowDb,
    shapes: HashMap<String, TableShape>,
}

impl Oracle {
    pub fn open() -> Result<Self> {
        Ok(Self { shadow: ShadowDb::open_in_memory()?, shapes: HashMap::new() })
    }

    /// Mirrors `CREATE TABLE name (...)` into the shadow database and
    /// records its column names for resolution (spec §6 "the engine reads
    /// this file" -- the catalog document is what actually owns the
    /// schema; this just keeps the oracle's own copy in sync with it).
    pub fn create_table(&mut self, name: &str, schema: &Schema) -> Result<()> {
        self.shadow.create_table(name, schema)?;
        let columns = schema.columns.iter().map(|c| c.name.clone()).collect();
        self.shapes.insert(name.to_string(), TableShape::new(name, columns));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.shadow.drop_table(name)?;
        self.shapes.remove(name);
        Ok(())
    }

    /// Resolves a `SELECT` string against the tables currently mirrored
    /// into this oracle.
    pub fn resolve(&self, sql: &str) -> Result<ResolvedQuery> {
        let shapes: Vec<&TableShape> = self.shapes.values().collect();
        let owned: Vec<TableShape> = shapes.iter().map(|s| TableShape::new(s.name.clone(), s.columns.clone())).collect();
        resolve_select(sql, &owned)
    }

    /// Textual `EXPLAIN QUERY PLAN` for a SELECT, delegated verbatim to the
    /// shadow database (spec §6: `get_plan(sql) -> textual EXPLAIN output`).
    pub fn get_plan(&self, sql: &str) -> Result<String> {
        self.shadow.explain(sql)
    }

    /// Runs `sql` against the shadow database directly -- the
    /// unsupported-feature fallback path (spec §7) for DDL/DML.
    pub fn execute_fallback(&self, sql: &str) -> Result<usize> {
        self.shadow.execute_raw(sql)
    }

    /// The SELECT counterpart of [`Oracle::execute_fallback`]: runs `sql`
    /// against the shadow database and returns its rows as text (spec §7:
    /// "return the oracle's textual output verbatim").
    pub fn query_fallback(&self, sql: &str) -> Result<String> {
        self.shadow.query_text(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType};

    #[test]
    fn create_table_then_resolve_round_trips() {
        let mut oracle = Oracle::open().unwrap();
        oracle
            .create_table("t", &Schema::new(vec![Column::new("a", ColumnType::Int64), Column::new("b", ColumnType::Int64)]))
            .unwrap();
        let resolved = oracle.resolve("SELECT a FROM t WHERE b = 1").unwrap();
        assert_eq!(resolved.tables, vec!["t".to_string()]);
        assert_eq!(resolved.projected.len(), 1);
    }

    #[test]
    fn drop_table_forgets_its_shape() {
        let mut oracle = Oracle::open().unwrap();
        oracle.create_table("t", &Schema::new(vec![Column::new("a", ColumnType::Int64)])).unwrap();
        oracle.drop_table("t").unwrap();
        assert!(oracle.resolve("SELECT a FROM t").is_err());
    }
}
