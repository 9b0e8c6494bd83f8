//! In-place-mutable per-column storage backing a [`crate::block::Block`].
//!
//! Arrow's array types are immutable once built, which does not fit a
//! format whose invariants call for in-place update and append (spec §3
//! "updates rewrite in place"); the buffers here are grown and rewritten
//! directly, and handed to `arrow` only at materialization time, where the
//! projection step builds a `RecordBatch` for the caller (see
//! `hustle-query`'s `Project` operator).

use hustle_core::{ColumnType, Value};

use crate::error::{Result, StorageError};

/// A single column's live storage for one block.
#[derive(Debug, Clone)]
pub enum ColumnBuffer {
    Int64(Vec<i64>),
    /// Packed fixed-width byte strings; row `i` occupies
    /// `data[i*width..(i+1)*width]`, zero-padded on the right if shorter.
    FixedBytes { width: usize, data: Vec<u8> },
    /// Variable-length UTF-8; `offsets` has `row_count + 1` entries.
    Utf8 { offsets: Vec<u32>, data: Vec<u8> },
}

/// The byte width one row of `value` would add to a column of type `ty`,
/// without needing a live [`ColumnBuffer`] to ask.
pub fn row_byte_width_for(ty: &ColumnType, value: &Value) -> Result<usize> {
    match (ty, value) {
        (ColumnType::Int64, Value::Int(_)) | (ColumnType::Int64, Value::Null) => Ok(8),
        (ColumnType::FixedBytes(width), Value::Bytes(_) | Value::Null) => Ok(*width as usize),
        (ColumnType::Utf8, Value::Str(s)) => Ok(s.len() + 4),
        (ColumnType::Utf8, Value::Null) => Ok(4),
        _ => Err(StorageError::schema_mismatch(format!(
            "value {value:?} does not match column type {ty:?}"
        ))),
    }
}

impl ColumnBuffer {
    pub fn new(ty: &ColumnType) -> Self {
        match ty {
            ColumnType::Int64 => Self::Int64(Vec::new()),
            ColumnType::FixedBytes(width) => Self::FixedBytes {
                width: *width as usize,
                data: Vec::new(),
            },
            ColumnType::Utf8 => Self::Utf8 {
                offsets: vec![0],
                data: Vec::new(),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::FixedBytes { width, data } => {
                if *width == 0 {
                    0
                } else {
                    data.len() / width
                }
            }
            Self::Utf8 { offsets, .. } => offsets.len().saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live byte footprint, used for the block admission decision (spec
    /// §4.2 "block admission").
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len() * 8,
            Self::FixedBytes { data, .. } => data.len(),
            Self::Utf8 { offsets, data } => data.len() + offsets.len() * 4,
        }
    }

    /// Byte width one more row of `value` would add, or an error if the
    /// value's logical type does not match this column.
    pub fn row_byte_width(&self, value: &Value) -> Result<usize> {
        match (self, value) {
            (Self::Int64(_), Value::Int(_)) | (Self::Int64(_), Value::Null) => Ok(8),
            (Self::FixedBytes { width, .. }, Value::Bytes(_) | Value::Null) => Ok(*width),
            (Self::Utf8 { .. }, Value::Str(s)) => Ok(s.len() + 4),
            (Self::Utf8 { .. }, Value::Null) => Ok(4),
            _ => Err(StorageError::schema_mismatch(format!(
                "value {value:?} does not match column type"
            ))),
        }
    }

    pub fn push_value(&mut self, value: &Value) -> Result<()> {
        match self {
            Self::Int64(v) => {
                v.push(match value {
                    Value::Int(i) => *i,
                    Value::Null => 0,
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected int64, got {other:?}"
                        )))
                    }
                });
                Ok(())
            }
            Self::FixedBytes { width, data } => {
                let bytes: &[u8] = match value {
                    Value::Bytes(b) => b,
                    Value::Null => &[],
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected fixed bytes, got {other:?}"
                        )))
                    }
                };
                if bytes.len() > *width {
                    return Err(StorageError::schema_mismatch(format!(
                        "value of {} bytes exceeds column width {width}",
                        bytes.len()
                    )));
                }
                data.extend_from_slice(bytes);
                data.resize(data.len() + (*width - bytes.len()), 0);
                Ok(())
            }
            Self::Utf8 { offsets, data } => {
                let s: &str = match value {
                    Value::Str(s) => s,
                    Value::Null => "",
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected utf8, got {other:?}"
                        )))
                    }
                };
                data.extend_from_slice(s.as_bytes());
                offsets.push(data.len() as u32);
                Ok(())
            }
        }
    }

    pub fn get(&self, row: usize) -> Value {
        match self {
            Self::Int64(v) => Value::Int(v[row]),
            Self::FixedBytes { width, data } => {
                Value::Bytes(data[row * width..(row + 1) * width].to_vec())
            }
            Self::Utf8 { offsets, data } => {
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                Value::Str(String::from_utf8_lossy(&data[start..end]).into_owned())
            }
        }
    }

    /// Rewrites a row in place. Fixed-width columns always succeed;
    /// variable-length columns return `Ok(false)` when the new value's
    /// length differs and the column must be recompacted by the caller
    /// (spec §4.2 "the block recompacts the column").
    pub fn set_in_place(&mut self, row: usize, value: &Value) -> Result<bool> {
        match self {
            Self::Int64(v) => {
                v[row] = match value {
                    Value::Int(i) => *i,
                    Value::Null => 0,
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected int64, got {other:?}"
                        )))
                    }
                };
                Ok(true)
            }
            Self::FixedBytes { width, data } => {
                let bytes: &[u8] = match value {
                    Value::Bytes(b) => b,
                    Value::Null => &[],
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected fixed bytes, got {other:?}"
                        )))
                    }
                };
                if bytes.len() > *width {
                    return Err(StorageError::schema_mismatch(format!(
                        "value of {} bytes exceeds column width {width}",
                        bytes.len()
                    )));
                }
                let start = row * *width;
                data[start..start + bytes.len()].copy_from_slice(bytes);
                for b in &mut data[start + bytes.len()..start + *width] {
                    *b = 0;
                }
                Ok(true)
            }
            Self::Utf8 { offsets, .. } => {
                let new_len = match value {
                    Value::Str(s) => s.len(),
                    Value::Null => 0,
                    other => {
                        return Err(StorageError::schema_mismatch(format!(
                            "expected utf8, got {other:?}"
                        )))
                    }
                };
                let old_len = (offsets[row + 1] - offsets[row]) as usize;
                Ok(new_len == old_len)
            }
        }
    }

    /// Rewrites the raw bytes of a UTF-8 row whose new length equals the
    /// old one (the in-place fast path `set_in_place` already checked).
    pub fn set_utf8_same_width(&mut self, row: usize, s: &str) {
        if let Self::Utf8 { offsets, data } = self {
            let start = offsets[row] as usize;
            let end = offsets[row + 1] as usize;
            data[start..end].copy_from_slice(s.as_bytes());
        }
    }

    /// Rebuilds the whole column after a variable-length update whose new
    /// value differs in length from the old one, by replaying every row
    /// through fresh buffers.
    pub fn recompact_utf8(&self, row: usize, new_value: &str) -> ColumnBuffer {
        let mut rebuilt = ColumnBuffer::Utf8 {
            offsets: vec![0],
            data: Vec::new(),
        };
        for r in 0..self.len() {
            if r == row {
                let _ = rebuilt.push_value(&Value::Str(new_value.to_string()));
            } else {
                let v = self.get(r);
                let _ = rebuilt.push_value(&v);
            }
        }
        rebuilt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int64_round_trips() {
        let mut col = ColumnBuffer::new(&ColumnType::Int64);
        col.push_value(&Value::Int(42)).unwrap();
        col.push_value(&Value::Int(-7)).unwrap();
        assert_eq!(col.get(0), Value::Int(42));
        assert_eq!(col.get(1), Value::Int(-7));
        assert_eq!(col.byte_len(), 16);
    }

    #[test]
    fn fixed_bytes_pads_short_values() {
        let mut col = ColumnBuffer::new(&ColumnType::FixedBytes(4));
        col.push_value(&Value::Bytes(vec![1, 2])).unwrap();
        assert_eq!(col.get(0), Value::Bytes(vec![1, 2, 0, 0]));
    }

    #[test]
    fn fixed_bytes_rejects_oversized_values() {
        let mut col = ColumnBuffer::new(&ColumnType::FixedBytes(2));
        assert!(col.push_value(&Value::Bytes(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn utf8_in_place_update_same_length_succeeds() {
        let mut col = ColumnBuffer::new(&ColumnType::Utf8);
        col.push_value(&Value::Str("abc".into())).unwrap();
        assert!(col.set_in_place(0, &Value::Str("xyz".into())).unwrap());
        col.set_utf8_same_width(0, "xyz");
        assert_eq!(col.get(0), Value::Str("xyz".into()));
    }

    #[test]
    fn utf8_update_different_length_requires_recompaction() {
        let mut col = ColumnBuffer::new(&ColumnType::Utf8);
        col.push_value(&Value::Str("abc".into())).unwrap();
        col.push_value(&Value::Str("de".into())).unwrap();
        assert!(!col.set_in_place(0, &Value::Str("longer".into())).unwrap());
        let rebuilt = col.recompact_utf8(0, "longer");
        assert_eq!(rebuilt.get(0), Value::Str("longer".into()));
        assert_eq!(rebuilt.get(1), Value::Str("de".into()));
    }
}
