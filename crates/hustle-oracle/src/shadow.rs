//! The "shadow" database (spec §6 "Parser oracle" (i)): an in-memory
//! SQLite connection that mirrors every `CREATE TABLE`/`DROP TABLE` Hustle
//! runs, so unsupported-feature fallback and `get_plan` have a real engine
//! to delegate to. Connection lifecycle follows the same
//! mutex-guarded-`Connection` shape the teacher's SQLite store used, minus
//! the on-disk path and schema migrations (the shadow is always in-memory
//! and has no schema of its own beyond whatever Hustle mirrors into it).

use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use hustle_core::{Column, ColumnType, Schema};

use crate::error::Result;

pub struct ShadowDb {
    conn: Mutex<Connection>,
}

impl ShadowDb {
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory shadow database");
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Mirrors a Hustle `CREATE TABLE` into the shadow database, using
    /// SQLite's own type affinities (spec §3's three logical types all
    /// have an unambiguous SQLite counterpart).
    pub fn create_table(&self, name: &str, schema: &Schema) -> Result<()> {
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, sqlite_type(c.ty)))
            .collect();
        let ddl = format!("CREATE TABLE \"{name}\" ({})", columns.join(", "));
        let conn = self.conn.lock().expect("shadow db mutex poisoned");
        conn.execute(&ddl, [])?;
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().expect("shadow db mutex poisoned");
        conn.execute(&format!("DROP TABLE \"{name}\""), [])?;
        Ok(())
    }

    /// Runs an arbitrary statement against the shadow database -- used for
    /// unsupported-feature fallback (spec §7: "return the oracle's textual
    /// output verbatim").
    pub fn execute_raw(&self, sql: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("shadow db mutex poisoned");
        Ok(conn.execute(sql, [])?)
    }

    /// Runs a SELECT against the shadow database and renders its rows as
    /// pipe-separated text, one row per line with a header of column
    /// names first -- the unsupported-feature fallback's "textual output
    /// verbatim" (spec §7).
    pub fn query_text(&self, sql: &str) -> Result<String> {
        let conn = self.conn.lock().expect("shadow db mutex poisoned");
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let header = stmt.column_names().join("|");
        let mut rows = stmt.query([])?;
        let mut lines = vec![header];
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: rusqlite::types::Value = row.get(i)?;
                cells.push(format_value(&value));
            }
            lines.push(cells.join("|"));
        }
        Ok(lines.join("\n"))
    }

    /// Textual `EXPLAIN QUERY PLAN` output for a SELECT (spec §6:
    /// `get_plan(sql) -> textual EXPLAIN output`).
    pub fn explain(&self, sql: &str) -> Result<String> {
        let conn = self.conn.lock().expect("shadow db mutex poisoned");
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        let mut rows = stmt.query([])?;
        let mut lines = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let parent: i64 = row.get(1)?;
            let detail: String = row.get(3)?;
            lines.push(format!("{id}|{parent}|{detail}"));
        }
        Ok(lines.join("\n"))
    }
}

fn format_value(value: &rusqlite::types::Value) -> String {
    use rusqlite::types::Value as SqliteValue;
    match value {
        SqliteValue::Null => "NULL".to_string(),
        SqliteValue::Integer(i) => i.to_string(),
        SqliteValue::Real(f) => f.to_string(),
        SqliteValue::Text(s) => s.clone(),
        SqliteValue::Blob(b) => format!("{b:?}"),
    }
}

fn sqlite_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Int64 => "INTEGER",
        ColumnType::Utf8 => "TEXT",
        ColumnType::FixedBytes(_) => "BLOB",
    }
}
