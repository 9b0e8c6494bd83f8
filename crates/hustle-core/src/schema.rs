//! Table schemas (spec §3 DATA MODEL: "Schema").

use serde::{Deserialize, Serialize};

/// The logical type of a column.
///
/// Hustle's three logical types, per spec §3: a signed 64-bit integer, a
/// fixed-length byte string, and a variable-length UTF-8 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "width")]
pub enum ColumnType {
    Int64,
    FixedBytes(u16),
    Utf8,
}

impl ColumnType {
    /// Whether this type stores a fixed number of bytes per value (as
    /// opposed to the offsets+data-buffer layout of variable-length types).
    pub fn is_fixed_width(self) -> bool {
        !matches!(self, ColumnType::Utf8)
    }

    /// The per-row byte width for fixed-width types; `None` for
    /// variable-length columns, whose width depends on the value.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnType::Int64 => Some(8),
            ColumnType::FixedBytes(n) => Some(n as usize),
            ColumnType::Utf8 => None,
        }
    }
}

/// One column of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Declared unique; the engine does not enforce this (spec §3).
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// An immutable, ordered list of columns plus a declared primary key.
///
/// Schemas are immutable once a table exists (spec §3); the catalog creates
/// a fresh [`Schema`] at `create_table` time and never mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
    /// Indices into `columns` naming the primary key. Uniqueness is not
    /// enforced by the engine (spec §3); this is metadata only.
    pub primary_key: Vec<usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            primary_key: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: Vec<usize>) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn column_index_finds_by_name() {
        let schema = Schema::new(vec![
            Column::new("a", ColumnType::Int64),
            Column::new("b", ColumnType::Utf8),
        ]);
        assert_eq!(schema.column_index("b"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
    }

    #[test]
    fn fixed_width_reports_byte_size() {
        assert_eq!(ColumnType::Int64.fixed_width(), Some(8));
        assert_eq!(ColumnType::FixedBytes(16).fixed_width(), Some(16));
        assert_eq!(ColumnType::Utf8.fixed_width(), None);
    }
}
