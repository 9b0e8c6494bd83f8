//! A block: a fixed-maximum-byte-size row group of per-column arrays, a
//! validity bitmap, and optional SMA metadata (spec §3 "Block").

use hustle_core::{Schema, Value};

use crate::bitmap::Bitmap;
use crate::column::ColumnBuffer;
use crate::error::{Result, StorageError};
use crate::sma::Sma;

pub struct Block {
    columns: Vec<ColumnBuffer>,
    validity: Bitmap,
    byte_count: usize,
    capacity_bytes: usize,
    smas: Vec<Option<Sma>>,
    sma_dirty: bool,
}

impl Block {
    pub fn new(schema: &Schema, capacity_bytes: usize) -> Self {
        let columns = schema.columns.iter().map(|c| ColumnBuffer::new(&c.ty)).collect();
        let num_columns = schema.columns.len();
        Self {
            columns,
            validity: Bitmap::new(),
            byte_count: 0,
            capacity_bytes,
            smas: vec![None; num_columns],
            sma_dirty: true,
        }
    }

    pub fn row_count(&self) -> usize {
        self.validity.len()
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn validity(&self) -> &Bitmap {
        &self.validity
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Result<&ColumnBuffer> {
        self.columns.get(idx).ok_or(StorageError::ColumnOutOfRange(idx))
    }

    /// The byte width a row made of `values` would add, summed per column.
    pub fn row_byte_width(&self, values: &[Value]) -> Result<usize> {
        if values.len() != self.columns.len() {
            return Err(StorageError::schema_mismatch(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        let mut total = 0;
        for (col, value) in self.columns.iter().zip(values) {
            total += col.row_byte_width(value)?;
        }
        Ok(total)
    }

    /// Same computation as [`Block::row_byte_width`] but from a schema
    /// alone, for callers (like [`crate::table::Table`]) deciding whether a
    /// row needs a new block before one is guaranteed to exist.
    pub fn row_byte_width_for_schema(schema: &Schema, values: &[Value]) -> Result<usize> {
        if values.len() != schema.columns.len() {
            return Err(StorageError::schema_mismatch(format!(
                "expected {} values, got {}",
                schema.columns.len(),
                values.len()
            )));
        }
        let mut total = 0;
        for (column, value) in schema.columns.iter().zip(values) {
            total += crate::column::row_byte_width_for(&column.ty, value)?;
        }
        Ok(total)
    }

    /// Whether this block can admit a new row of `row_bytes` without
    /// exceeding its capacity (spec §4.2 "Block admission").
    pub fn can_admit(&self, row_bytes: usize) -> bool {
        self.byte_count + row_bytes <= self.capacity_bytes
    }

    /// Appends one row, returning its row-in-block index.
    pub fn insert_record(&mut self, values: &[Value]) -> Result<usize> {
        let row_bytes = self.row_byte_width(values)?;
        for (col, value) in self.columns.iter_mut().zip(values) {
            col.push_value(value)?;
        }
        self.validity.push(true);
        self.byte_count += row_bytes;
        self.sma_dirty = true;
        Ok(self.row_count() - 1)
    }

    /// Appends many rows at once, given as one `Vec<Value>` per column in
    /// schema order (spec §4.2 "insert_records").
    pub fn insert_records(&mut self, column_arrays: &[Vec<Value>]) -> Result<usize> {
        if column_arrays.len() != self.columns.len() {
            return Err(StorageError::schema_mismatch(format!(
                "expected {} columns, got {}",
                self.columns.len(),
                column_arrays.len()
            )));
        }
        let num_rows = column_arrays.first().map(|c| c.len()).unwrap_or(0);
        for arr in column_arrays {
            if arr.len() != num_rows {
                return Err(StorageError::schema_mismatch(
                    "column arrays must all have the same length".to_string(),
                ));
            }
        }
        let first_row = self.row_count();
        for row in 0..num_rows {
            let values: Vec<Value> = column_arrays.iter().map(|c| c[row].clone()).collect();
            self.insert_record(&values)?;
        }
        Ok(first_row)
    }

    pub fn update(&mut self, row: usize, col_id: usize, value: &Value) -> Result<()> {
        if row >= self.row_count() {
            return Err(StorageError::RowOutOfRange(row as u64));
        }
        let col = self.columns.get_mut(col_id).ok_or(StorageError::ColumnOutOfRange(col_id))?;
        if !col.set_in_place(row, value)? {
            let new_str = match value {
                Value::Str(s) => s.clone(),
                Value::Null => String::new(),
                other => {
                    return Err(StorageError::schema_mismatch(format!(
                        "expected utf8, got {other:?}"
                    )))
                }
            };
            let rebuilt = col.recompact_utf8(row, &new_str);
            self.columns[col_id] = rebuilt;
        } else if let ColumnBuffer::Utf8 { .. } = col {
            if let Value::Str(s) = value {
                col.set_utf8_same_width(row, s);
            }
        }
        self.sma_dirty = true;
        Ok(())
    }

    pub fn delete(&mut self, row: usize) -> Result<()> {
        if row >= self.row_count() {
            return Err(StorageError::RowOutOfRange(row as u64));
        }
        self.validity.clear_bit(row);
        self.sma_dirty = true;
        Ok(())
    }

    pub fn get_row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// Rebuilds every column's SMA from the current live rows. A no-op if
    /// nothing has changed since the last rebuild (spec §4.3: "rebuilt
    /// lazily on demand, flagged dirty on any mutation").
    pub fn rebuild_sma(&mut self) {
        if !self.sma_dirty {
            return;
        }
        for (idx, col) in self.columns.iter().enumerate() {
            self.smas[idx] = Sma::compute(col, &self.validity);
        }
        self.sma_dirty = false;
    }

    /// A column's SMA, or `None` if it hasn't been computed (or the block
    /// has no live rows). Callers needing an up-to-date SMA should call
    /// [`Block::rebuild_sma`] first.
    pub fn sma(&self, col_id: usize) -> Option<&Sma> {
        self.smas.get(col_id).and_then(|s| s.as_ref())
    }

    pub fn sma_is_dirty(&self) -> bool {
        self.sma_dirty
    }

    /// Replaces this block's live storage wholesale, used when restoring a
    /// block from a snapshot (spec §6). Byte count is recomputed from the
    /// adopted columns rather than trusted from the file.
    pub(crate) fn adopt_raw(&mut self, columns: Vec<ColumnBuffer>, validity: Bitmap) {
        self.byte_count = columns.iter().map(|c| c.byte_len()).sum();
        self.columns = columns;
        self.validity = validity;
        self.sma_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType};

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int64),
            Column::new("name", ColumnType::Utf8),
        ])
    }

    #[test]
    fn insert_respects_capacity() {
        let mut block = Block::new(&schema(), 64);
        let row = vec![Value::Int(1), Value::Str("ab".into())];
        let width = block.row_byte_width(&row).unwrap();
        assert!(block.can_admit(width));
        block.insert_record(&row).unwrap();
        assert_eq!(block.row_count(), 1);
    }

    #[test]
    fn delete_clears_validity_without_shrinking() {
        let mut block = Block::new(&schema(), 4096);
        block.insert_record(&[Value::Int(1), Value::Str("a".into())]).unwrap();
        block.insert_record(&[Value::Int(2), Value::Str("b".into())]).unwrap();
        block.delete(0).unwrap();
        assert_eq!(block.row_count(), 2);
        assert!(!block.validity().get(0));
        assert!(block.validity().get(1));
    }

    #[test]
    fn sma_rebuild_skips_tombstoned_rows() {
        let mut block = Block::new(&schema(), 4096);
        block.insert_record(&[Value::Int(5), Value::Str("x".into())]).unwrap();
        block.insert_record(&[Value::Int(1), Value::Str("y".into())]).unwrap();
        block.delete(1).unwrap();
        block.rebuild_sma();
        let sma = block.sma(0).unwrap();
        assert_eq!(sma.min, Value::Int(5));
        assert_eq!(sma.max, Value::Int(5));
    }

    #[test]
    fn update_variable_length_triggers_recompaction() {
        let mut block = Block::new(&schema(), 4096);
        block.insert_record(&[Value::Int(1), Value::Str("short".into())]).unwrap();
        block.update(0, 1, &Value::Str("much longer value".into())).unwrap();
        assert_eq!(block.get_row(0)[1], Value::Str("much longer value".into()));
    }
}
