//! SelectBuildHash (spec §4.6, fused): runs Select, then immediately
//! builds the join-key hash table on the surviving rows, avoiding a
//! second pass over the table when a build-side input is already known
//! to feed a join.

use std::sync::Arc;

use hustle_core::{BlockId, RowInBlock};
use hustle_scheduler::TaskContext;
use hustle_storage::Bitmap;

use crate::block_parallel::fan_out;
use crate::hash_table::{cast_join_key, HashTable};
use crate::lazy_table::{LazyTable, OperatorResult};
use crate::plan::Operator;
use crate::predicate::PredicateTree;
use crate::reference::ColumnReference;

pub struct SelectBuildHash {
    predicate: PredicateTree,
    key_column: ColumnReference,
    unique: bool,
}

impl SelectBuildHash {
    pub fn new(predicate: PredicateTree, key_column: ColumnReference, unique: bool) -> Self {
        Self {
            predicate,
            key_column,
            unique,
        }
    }
}

impl Operator for SelectBuildHash {
    fn name(&self) -> &'static str {
        "select_build_hash"
    }

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        let input = &inputs[0].tables[0];
        let num_blocks = input.table.num_blocks();
        let predicate = self.predicate.clone();
        let table = input.table.clone();
        let prior_filter = input.filter.clone();

        let filters: Vec<Bitmap> = fan_out(ctx, "select_build_hash:block", num_blocks, move |block_idx| {
            let block_id = BlockId(block_idx as u32);
            table
                .with_block(block_id, |block| {
                    let bitmap = predicate.eval_block(block);
                    match &prior_filter {
                        Some(prior) => bitmap.and(&prior[block_idx]),
                        None => bitmap,
                    }
                })
                .unwrap_or_else(|_| Bitmap::all_false(0))
        });

        // Build is serial per table (spec §4.7 "Concurrency": "Build is
        // serial per right table but concurrent across tables" -- the
        // concurrency across tables comes from the scheduler running
        // multiple SelectBuildHash operators' tasks in parallel, not from
        // locking inside this one).
        let mut hash_table = HashTable::new(self.unique);
        input.table.for_each_block(|block_id, block| {
            let Ok(key_column) = block.column(self.key_column.index) else {
                return;
            };
            let bitmap = &filters[block_id.0 as usize];
            for row in bitmap.iter_ones() {
                // Null keys never match (spec §4.7 "Edge cases").
                if let Some(key) = cast_join_key(&key_column.get(row)) {
                    hash_table.insert(key, hustle_core::ChunkRowId::new(block_id, RowInBlock(row as u32)));
                }
            }
        });

        Arc::new(OperatorResult::new(vec![LazyTable {
            table: input.table.clone(),
            filter: Some(filters),
            indices: None,
            hash_table: Some(Arc::new(hash_table)),
        }]))
    }
}
