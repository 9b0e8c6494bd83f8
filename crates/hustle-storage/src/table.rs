//! A table: an ordered sequence of blocks sharing one schema, plus a
//! block-row-offset prefix sum for `(block_id, row_in_block) ↔ row_id`
//! conversions (spec §3 "Table").

use parking_lot::RwLock;

use hustle_core::{BlockId, RowId, RowInBlock, Schema, Value};

use crate::block::Block;
use crate::error::{Result, StorageError};

struct Inner {
    blocks: Vec<Block>,
    /// `row_offsets[i]` is the global row id of block `i`'s first row.
    row_offsets: Vec<u64>,
}

/// A table's blocks are append-only; appends are serialized behind this
/// structure's single writer lock (an `RwLock`), while readers (operators)
/// share read access for the duration of a plan execution (spec §5 "Shared
/// resource discipline").
pub struct Table {
    schema: Schema,
    capacity_bytes: usize,
    inner: RwLock<Inner>,
}

impl Table {
    pub fn new(schema: Schema, capacity_bytes: usize) -> Self {
        Self {
            schema,
            capacity_bytes,
            inner: RwLock::new(Inner {
                blocks: Vec::new(),
                row_offsets: Vec::new(),
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_blocks(&self) -> usize {
        self.inner.read().blocks.len()
    }

    pub fn num_rows(&self) -> u64 {
        let inner = self.inner.read();
        match (inner.row_offsets.last(), inner.blocks.last()) {
            (Some(&offset), Some(last)) => offset + last.row_count() as u64,
            _ => 0,
        }
    }

    /// Converts a global row id into `(block_id, row_in_block)` via binary
    /// search over the row-offset prefix sum.
    pub fn locate(&self, row_id: RowId) -> Result<(BlockId, RowInBlock)> {
        let inner = self.inner.read();
        let idx = match inner.row_offsets.binary_search(&row_id.0) {
            Ok(i) => i,
            Err(0) => return Err(StorageError::RowOutOfRange(row_id.0)),
            Err(i) => i - 1,
        };
        let block = inner
            .blocks
            .get(idx)
            .ok_or(StorageError::RowOutOfRange(row_id.0))?;
        let row_in_block = row_id.0 - inner.row_offsets[idx];
        if row_in_block as usize >= block.row_count() {
            return Err(StorageError::RowOutOfRange(row_id.0));
        }
        Ok((BlockId(idx as u32), RowInBlock(row_in_block as u32)))
    }

    /// Appends one row, returning its global row id (spec §4.2
    /// "insert_record").
    pub fn insert_record(&self, values: &[Value]) -> Result<RowId> {
        let mut inner = self.inner.write();
        let row_bytes_probe = Block::row_byte_width_for_schema(&self.schema, values)?;

        let needs_new_block = match inner.blocks.last() {
            Some(last) => !last.can_admit(row_bytes_probe),
            None => true,
        };
        if needs_new_block {
            let offset = inner
                .row_offsets
                .last()
                .zip(inner.blocks.last())
                .map(|(&o, b)| o + b.row_count() as u64)
                .unwrap_or(0);
            inner.row_offsets.push(offset);
            inner.blocks.push(Block::new(&self.schema, self.capacity_bytes));
        }

        let block_idx = inner.blocks.len() - 1;
        let base = inner.row_offsets[block_idx];
        let row_in_block = inner.blocks[block_idx].insert_record(values)?;
        Ok(RowId(base + row_in_block as u64))
    }

    /// Bulk-appends pre-built per-column arrays (spec §4.2
    /// "insert_records"), splitting across new blocks as admission demands.
    pub fn insert_records(&self, column_arrays: &[Vec<Value>]) -> Result<RowId> {
        if column_arrays.is_empty() || column_arrays[0].is_empty() {
            return Err(StorageError::schema_mismatch("empty insert_records batch".to_string()));
        }
        let num_rows = column_arrays[0].len();
        let mut first_id = None;
        for row in 0..num_rows {
            let values: Vec<Value> = column_arrays.iter().map(|c| c[row].clone()).collect();
            let id = self.insert_record(&values)?;
            if first_id.is_none() {
                first_id = Some(id);
            }
        }
        Ok(first_id.unwrap())
    }

    pub fn update_by_rowid(&self, row_id: RowId, col_id: usize, value: &Value) -> Result<()> {
        let (block_id, row_in_block) = self.locate(row_id)?;
        let mut inner = self.inner.write();
        inner.blocks[block_id.0 as usize].update(row_in_block.0 as usize, col_id, value)
    }

    pub fn delete_by_rowid(&self, row_id: RowId) -> Result<()> {
        let (block_id, row_in_block) = self.locate(row_id)?;
        let mut inner = self.inner.write();
        inner.blocks[block_id.0 as usize].delete(row_in_block.0 as usize)
    }

    /// Iterates blocks in order under a shared read lock, per block id.
    pub fn for_each_block<F: FnMut(BlockId, &Block)>(&self, mut f: F) {
        let inner = self.inner.read();
        for (idx, block) in inner.blocks.iter().enumerate() {
            f(BlockId(idx as u32), block);
        }
    }

    pub fn with_block<R>(&self, block_id: BlockId, f: impl FnOnce(&Block) -> R) -> Result<R> {
        let inner = self.inner.read();
        let block = inner
            .blocks
            .get(block_id.0 as usize)
            .ok_or(StorageError::RowOutOfRange(block_id.0 as u64))?;
        Ok(f(block))
    }

    pub fn with_block_mut<R>(&self, block_id: BlockId, f: impl FnOnce(&mut Block) -> R) -> Result<R> {
        let mut inner = self.inner.write();
        let block = inner
            .blocks
            .get_mut(block_id.0 as usize)
            .ok_or(StorageError::RowOutOfRange(block_id.0 as u64))?;
        Ok(f(block))
    }

    /// The inverse of [`Table::locate`]: converts a `(block_id,
    /// row_in_block)` pair back into the global row id it corresponds to.
    /// Used when a join or hash-probe result is expressed as a
    /// `ChunkRowId` and must be promoted to a `RowId` for materialization.
    pub fn global_row_id(&self, block_id: BlockId, row_in_block: RowInBlock) -> RowId {
        let inner = self.inner.read();
        RowId(inner.row_offsets[block_id.0 as usize] + row_in_block.0 as u64)
    }

    /// Reads one cell by global row id, returning `Value::Null` if the row
    /// is out of range or the column is missing. Used by aggregation and
    /// materialization, which address rows one at a time rather than
    /// block-at-a-time.
    pub fn cell_at(&self, row_id: RowId, col_index: usize) -> Value {
        self.locate(row_id)
            .and_then(|(block_id, row_in_block)| {
                self.with_block(block_id, |b| {
                    b.column(col_index)
                        .map(|c| c.get(row_in_block.0 as usize))
                        .unwrap_or(Value::Null)
                })
            })
            .unwrap_or(Value::Null)
    }

    /// Appends an already-built block as the table's new last block, used
    /// when restoring blocks from a snapshot (spec §6). Callers must supply
    /// blocks in order.
    pub fn adopt_block(&self, block: Block) {
        let mut inner = self.inner.write();
        let offset = inner
            .row_offsets
            .last()
            .zip(inner.blocks.last())
            .map(|(&o, b)| o + b.row_count() as u64)
            .unwrap_or(0);
        inner.row_offsets.push(offset);
        inner.blocks.push(block);
    }
}
