//! Identifier newtypes.
//!
//! Cross-references between the catalog, storage, and query layers are
//! modeled as plain value types rather than raw pointers (spec §9: "model as
//! value types containing ids").

use std::fmt;

/// A row's position within a [`Table`](crate::schema), as a global,
/// monotonically-increasing sequence number independent of which block the
/// row physically lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A block's position within its table's block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row's position within a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowInBlock(pub u32);

/// The `(block_id, row_in_block)` pair a hash table entry resolves to.
///
/// Packed into `(u32, u32)` rather than a 64-bit integer (spec §3
/// "HashTable": "values are `(chunk_id, row_in_chunk)` pairs packed into
/// 32+32 bits") -- kept unpacked here since Rust gives us a real struct for
/// free; [`ChunkRowId::pack`]/[`ChunkRowId::unpack`] are provided for call
/// sites (e.g. the block-file snapshot codec) that need the packed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRowId {
    pub block_id: BlockId,
    pub row_in_block: RowInBlock,
}

impl ChunkRowId {
    pub fn new(block_id: BlockId, row_in_block: RowInBlock) -> Self {
        Self {
            block_id,
            row_in_block,
        }
    }

    pub fn pack(self) -> u64 {
        (u64::from(self.block_id.0) << 32) | u64::from(self.row_in_block.0)
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            block_id: BlockId((packed >> 32) as u32),
            row_in_block: RowInBlock(packed as u32),
        }
    }
}

/// A table's name, used as its identity throughout the catalog and query
/// layers -- the original source keys tables by name, not by a synthetic
/// integer id, and we follow that (spec §6 catalog file: "a JSON document
/// listing table schemas (name, column list, primary key)").
pub type TableName = String;
