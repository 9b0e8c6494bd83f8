//! `LazyTable` and `OperatorResult` (spec §3): the handles passed between
//! operators without copying column data.

use std::sync::Arc;

use hustle_core::{BlockId, RowId, Value};
use hustle_storage::{Bitmap, Table};
use parking_lot::Mutex;

use crate::error::QueryError;
use crate::hash_table::HashTable;

/// A handle to one table's participation in a plan: an optional per-block
/// filter, an optional vector of surviving global row ids, and an optional
/// hash table built on the filter-surviving rows by a prior fused
/// select-build-hash (spec §4.6).
#[derive(Clone)]
pub struct LazyTable {
    pub table: Arc<Table>,
    /// One bitmap per block, parallel to `table`'s block sequence. `None`
    /// means "every live row passes" (no filter has been applied yet).
    pub filter: Option<Vec<Bitmap>>,
    /// Global row ids surviving the pipeline so far. `None` means "use
    /// `filter` (or full validity) directly," i.e. no join has run yet.
    pub indices: Option<Vec<RowId>>,
    pub hash_table: Option<Arc<HashTable>>,
}

impl LazyTable {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            filter: None,
            indices: None,
            hash_table: None,
        }
    }

    pub fn with_filter(table: Arc<Table>, filter: Vec<Bitmap>) -> Self {
        Self {
            table,
            filter: Some(filter),
            indices: None,
            hash_table: None,
        }
    }

    /// Whether block-local row `row` in block `block_id` currently
    /// survives: masked by the filter if one is present, else by the
    /// block's own validity bitmap.
    pub fn row_survives(&self, block_id: BlockId, row: usize) -> bool {
        match &self.filter {
            Some(filters) => filters
                .get(block_id.0 as usize)
                .map(|bm| bm.get(row))
                .unwrap_or(false),
            None => self
                .table
                .with_block(block_id, |b| b.validity().get(row))
                .unwrap_or(false),
        }
    }

    /// Iterates the global row ids this table currently contributes,
    /// honoring `indices` when present (post-join) or the filter/validity
    /// bitmaps otherwise.
    pub fn surviving_row_ids(&self) -> Vec<RowId> {
        if let Some(indices) = &self.indices {
            return indices.clone();
        }
        let mut out = Vec::new();
        let mut base: u64 = 0;
        self.table.for_each_block(|block_id, block| {
            for row in 0..block.row_count() {
                if self.row_survives(block_id, row) {
                    out.push(RowId(base + row as u64));
                }
            }
            base += block.row_count() as u64;
        });
        out
    }
}

/// A named column of already-materialized cells, produced by an operator
/// whose output rows no longer correspond to any single bound table's
/// indices -- currently only [`crate::operators::hash_aggregate`]'s
/// one-row-per-group output.
#[derive(Debug, Clone)]
pub struct VirtualColumn {
    pub name: String,
    pub values: Vec<Value>,
}

/// Column-major virtual rows carried by an [`OperatorResult`] in place of
/// bound [`LazyTable`]s.
#[derive(Debug, Clone, Default)]
pub struct VirtualRows {
    pub columns: Vec<VirtualColumn>,
}

/// An ordered set of [`LazyTable`]s passed between operators (spec §3
/// "OperatorResult"), or -- once a query has passed through aggregation --
/// a set of already-materialized [`VirtualRows`]. Carries a first-error
/// slot (spec §7 "Propagation"): once set, later writers leave the first
/// error in place and downstream operators observing an error stop
/// spawning further subtasks.
pub struct OperatorResult {
    pub tables: Vec<LazyTable>,
    pub virtual_rows: Option<VirtualRows>,
    error: Mutex<Option<QueryError>>,
}

impl OperatorResult {
    pub fn new(tables: Vec<LazyTable>) -> Self {
        Self {
            tables,
            virtual_rows: None,
            error: Mutex::new(None),
        }
    }

    pub fn virtual_rows(rows: VirtualRows) -> Self {
        Self {
            tables: Vec::new(),
            virtual_rows: Some(rows),
            error: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Records `err` only if no error has been recorded yet.
    pub fn report_error(&self, err: QueryError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().is_some()
    }

    pub fn take_error(&self) -> Option<QueryError> {
        self.error.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType, Schema, Value};

    fn small_table() -> Arc<Table> {
        let schema = Schema::new(vec![Column::new("id", ColumnType::Int64)]);
        let table = Table::new(schema, 4096);
        for v in [1, 2, 3] {
            table.insert_record(&[Value::Int(v)]).unwrap();
        }
        Arc::new(table)
    }

    #[test]
    fn no_filter_no_indices_surfaces_all_live_rows() {
        let table = small_table();
        let lazy = LazyTable::new(table);
        assert_eq!(lazy.surviving_row_ids(), vec![RowId(0), RowId(1), RowId(2)]);
    }

    #[test]
    fn filter_restricts_surviving_rows() {
        let table = small_table();
        let mut bm = Bitmap::with_capacity(3);
        bm.push(false);
        bm.push(true);
        bm.push(false);
        let lazy = LazyTable::with_filter(table, vec![bm]);
        assert_eq!(lazy.surviving_row_ids(), vec![RowId(1)]);
    }

    #[test]
    fn indices_override_filter_after_a_join() {
        let table = small_table();
        let mut lazy = LazyTable::new(table);
        lazy.indices = Some(vec![RowId(2), RowId(2), RowId(0)]);
        assert_eq!(lazy.surviving_row_ids(), vec![RowId(2), RowId(2), RowId(0)]);
    }

    #[test]
    fn first_error_sticks() {
        let result = OperatorResult::empty();
        result.report_error(QueryError::execution("first"));
        result.report_error(QueryError::execution("second"));
        assert_eq!(result.take_error().unwrap().to_string(), "execution error: first");
    }
}
