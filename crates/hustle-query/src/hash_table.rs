//! Join hash tables (spec §3 "HashTable"): keyed by the integer-cast join
//! key, values are `(chunk_id, row_in_chunk)` pairs. Each table is built
//! serially by one task; concurrency across right-hand tables comes from
//! the scheduler running multiple build tasks in parallel, not from any
//! locking inside a single `HashTable`.

use std::collections::HashMap;
use std::hash::Hasher;

use hustle_core::{ChunkRowId, Value};

/// Casts a join key value to the `i64` a [`HashTable`] is keyed on.
/// Integers pass through unchanged; strings and byte strings hash to a
/// stable 64-bit integer. Distinct from the Bloom filter's splitmix mix --
/// this one needs no particular bit-spread property, just determinism and
/// a low collision rate for hash map keys.
pub fn cast_join_key(value: &Value) -> Option<i64> {
    match value {
        Value::Int(v) => Some(*v),
        Value::Str(s) => Some(stable_hash(s.as_bytes()) as i64),
        Value::Bytes(b) => Some(stable_hash(b) as i64),
        Value::Float(_) | Value::Null => None,
    }
}

/// Shared with [`crate::operators::hash_aggregate`] for group-key hashing:
/// same determinism requirement, no reason to duplicate the mixer.
pub(crate) fn stable_hash(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Keyed by the integer-cast join key (spec §3 "HashTable"). At most one
/// entry per key survives when `unique` is set; otherwise entries chain
/// within the same slot (spec: "otherwise entries chain").
#[derive(Debug, Default)]
pub struct HashTable {
    unique: bool,
    map: HashMap<i64, Vec<ChunkRowId>>,
}

impl HashTable {
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            map: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: i64, row: ChunkRowId) {
        let unique = self.unique;
        let slot = self.map.entry(key).or_default();
        if unique {
            if slot.is_empty() {
                slot.push(row);
            }
        } else {
            slot.push(row);
        }
    }

    pub fn probe(&self, key: i64) -> &[ChunkRowId] {
        self.map.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{BlockId, RowInBlock};

    fn row(block: u32, row: u32) -> ChunkRowId {
        ChunkRowId::new(BlockId(block), RowInBlock(row))
    }

    #[test]
    fn unique_table_keeps_first_entry_only() {
        let mut ht = HashTable::new(true);
        ht.insert(1, row(0, 0));
        ht.insert(1, row(0, 1));
        assert_eq!(ht.probe(1), &[row(0, 0)]);
    }

    #[test]
    fn non_unique_table_chains_entries() {
        let mut ht = HashTable::new(false);
        ht.insert(1, row(0, 0));
        ht.insert(1, row(0, 1));
        assert_eq!(ht.probe(1), &[row(0, 0), row(0, 1)]);
    }

    #[test]
    fn cast_join_key_passes_through_integers() {
        assert_eq!(cast_join_key(&Value::Int(42)), Some(42));
        assert_eq!(cast_join_key(&Value::Null), None);
    }

    #[test]
    fn cast_join_key_is_deterministic_for_strings() {
        let a = cast_join_key(&Value::Str("abc".into()));
        let b = cast_join_key(&Value::Str("abc".into()));
        assert_eq!(a, b);
    }
}
