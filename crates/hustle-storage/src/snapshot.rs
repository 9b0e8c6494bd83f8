//! The block-file snapshot format (spec §6 "Block file format"):
//! little-endian, magic `HSLB\0\0\0\0`, one section per block, trailer of
//! block start offsets, footer `u64 block_count | u64 footer_offset`.

use std::io::{self, Read, Write};

use hustle_core::{ColumnType, Schema, Value};

use crate::block::Block;
use crate::column::ColumnBuffer;
use crate::error::{Result, StorageError};
use crate::table::Table;

const MAGIC: &[u8; 8] = b"HSLB\0\0\0\0";

pub fn write_table<W: Write>(mut out: W, table: &Table) -> Result<()> {
    out.write_all(MAGIC)?;

    let mut block_offsets = Vec::new();
    let mut offset = MAGIC.len() as u64;

    table.for_each_block(|_, block| {
        block_offsets.push(offset);
        let mut buf = Vec::new();
        let _ = write_block(&mut buf, block);
        offset += buf.len() as u64;
        let _ = out.write_all(&buf);
    });

    let footer_offset = offset;
    for start in &block_offsets {
        out.write_all(&start.to_le_bytes())?;
    }
    out.write_all(&(block_offsets.len() as u64).to_le_bytes())?;
    out.write_all(&footer_offset.to_le_bytes())?;
    Ok(())
}

fn write_block<W: Write>(out: &mut W, block: &Block) -> Result<()> {
    out.write_all(&(block.row_count() as u32).to_le_bytes())?;
    out.write_all(&(block.byte_count() as u32).to_le_bytes())?;
    out.write_all(block.validity().as_bytes())?;
    for column in block.columns() {
        write_column(out, column)?;
    }
    Ok(())
}

fn write_column<W: Write>(out: &mut W, column: &ColumnBuffer) -> Result<()> {
    match column {
        ColumnBuffer::Int64(values) => {
            for v in values {
                out.write_all(&v.to_le_bytes())?;
            }
        }
        ColumnBuffer::FixedBytes { data, .. } => {
            out.write_all(data)?;
        }
        ColumnBuffer::Utf8 { offsets, data } => {
            for o in offsets {
                out.write_all(&o.to_le_bytes())?;
            }
            out.write_all(data)?;
        }
    }
    Ok(())
}

/// Reads a full snapshot back into a fresh [`Table`] sharing `schema`.
/// `capacity_bytes` governs the *reconstructed* table's admission policy
/// for any further inserts; it need not match the capacity used when the
/// snapshot was written.
pub fn read_table<R: Read>(mut input: R, schema: Schema, capacity_bytes: usize) -> Result<Table> {
    let mut all = Vec::new();
    input.read_to_end(&mut all)?;

    if all.len() < MAGIC.len() + 16 {
        return Err(StorageError::CorruptSnapshot("file too short".to_string()));
    }
    if &all[..MAGIC.len()] != MAGIC {
        return Err(StorageError::CorruptSnapshot("bad magic".to_string()));
    }

    let footer_start = all.len() - 16;
    let block_count = u64::from_le_bytes(all[footer_start..footer_start + 8].try_into().unwrap());
    let footer_offset = u64::from_le_bytes(all[footer_start + 8..footer_start + 16].try_into().unwrap());

    let trailer_start = footer_offset as usize;
    if trailer_start > footer_start {
        return Err(StorageError::CorruptSnapshot("footer offset out of range".to_string()));
    }
    let mut block_offsets = Vec::with_capacity(block_count as usize);
    let mut cursor = trailer_start;
    for _ in 0..block_count {
        let start = u64::from_le_bytes(all[cursor..cursor + 8].try_into().unwrap());
        block_offsets.push(start as usize);
        cursor += 8;
    }

    let table = Table::new(schema.clone(), capacity_bytes);
    for (i, &start) in block_offsets.iter().enumerate() {
        let end = if i + 1 < block_offsets.len() {
            block_offsets[i + 1]
        } else {
            trailer_start
        };
        let block = read_block(&all[start..end], &schema, capacity_bytes)?;
        table.adopt_block(block);
    }
    Ok(table)
}

fn read_block(bytes: &[u8], schema: &Schema, capacity_bytes: usize) -> Result<Block> {
    if bytes.len() < 8 {
        return Err(StorageError::CorruptSnapshot("block header truncated".to_string()));
    }
    let row_count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let _byte_count = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;

    let bitmap_bytes = row_count.div_ceil(8);
    let mut cursor = 8;
    let validity_raw = bytes[cursor..cursor + bitmap_bytes].to_vec();
    cursor += bitmap_bytes;

    let mut block = Block::new(schema, capacity_bytes);
    let mut columns = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        let (buf, consumed) = read_column(&bytes[cursor..], &column.ty, row_count)?;
        columns.push(buf);
        cursor += consumed;
    }

    block.adopt_raw(columns, crate::bitmap::Bitmap::from_raw(validity_raw, row_count));
    Ok(block)
}

fn read_column(bytes: &[u8], ty: &ColumnType, row_count: usize) -> Result<(ColumnBuffer, usize)> {
    match ty {
        ColumnType::Int64 => {
            let mut values = Vec::with_capacity(row_count);
            for i in 0..row_count {
                let start = i * 8;
                values.push(i64::from_le_bytes(bytes[start..start + 8].try_into().unwrap()));
            }
            Ok((ColumnBuffer::Int64(values), row_count * 8))
        }
        ColumnType::FixedBytes(width) => {
            let width = *width as usize;
            let len = row_count * width;
            Ok((
                ColumnBuffer::FixedBytes {
                    width,
                    data: bytes[..len].to_vec(),
                },
                len,
            ))
        }
        ColumnType::Utf8 => {
            let mut offsets = Vec::with_capacity(row_count + 1);
            for i in 0..=row_count {
                let start = i * 4;
                offsets.push(u32::from_le_bytes(bytes[start..start + 4].try_into().unwrap()));
            }
            let offsets_len = (row_count + 1) * 4;
            let data_len = *offsets.last().unwrap() as usize;
            let data = bytes[offsets_len..offsets_len + data_len].to_vec();
            Ok((ColumnBuffer::Utf8 { offsets, data }, offsets_len + data_len))
        }
    }
}

pub fn write_to_path(path: impl AsRef<std::path::Path>, table: &Table) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_table(io::BufWriter::new(file), table)
}

pub fn read_from_path(
    path: impl AsRef<std::path::Path>,
    schema: Schema,
    capacity_bytes: usize,
) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    read_table(io::BufReader::new(file), schema, capacity_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::Column;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int64),
            Column::new("name", ColumnType::Utf8),
            Column::new("code", ColumnType::FixedBytes(3)),
        ])
    }

    #[test]
    fn round_trips_through_a_buffer() {
        let table = Table::new(schema(), 64);
        for i in 0..20i64 {
            table
                .insert_record(&[
                    Value::Int(i),
                    Value::Str(format!("row-{i}")),
                    Value::Bytes(vec![1, 2, 3]),
                ])
                .unwrap();
        }
        table.delete_by_rowid(hustle_core::RowId(3)).unwrap();

        let mut buf = Vec::new();
        write_table(&mut buf, &table).unwrap();

        let restored = read_table(&buf[..], schema(), 64).unwrap();
        assert_eq!(restored.num_rows(), table.num_rows());
        assert_eq!(restored.num_blocks(), table.num_blocks());

        let (block_id, row_in_block) = restored.locate(hustle_core::RowId(3)).unwrap();
        let still_dead = restored
            .with_block(block_id, |b| !b.validity().get(row_in_block.0 as usize))
            .unwrap();
        assert!(still_dead, "tombstone must survive the round trip");

        let (block_id, row_in_block) = restored.locate(hustle_core::RowId(10)).unwrap();
        let row = restored
            .with_block(block_id, |b| b.get_row(row_in_block.0 as usize))
            .unwrap();
        assert_eq!(row[0], Value::Int(10));
        assert_eq!(row[1], Value::Str("row-10".to_string()));
    }
}
