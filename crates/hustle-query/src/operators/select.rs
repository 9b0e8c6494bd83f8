//! The Select operator (spec §4.5): evaluates a [`PredicateTree`] over one
//! table's blocks in parallel, producing a filter-only [`LazyTable`].

use std::sync::Arc;

use hustle_scheduler::TaskContext;
use hustle_storage::Bitmap;

use crate::block_parallel::fan_out;
use crate::lazy_table::{LazyTable, OperatorResult};
use crate::plan::Operator;
use crate::predicate::PredicateTree;

pub struct Select {
    predicate: PredicateTree,
}

impl Select {
    pub fn new(predicate: PredicateTree) -> Self {
        Self { predicate }
    }
}

impl Operator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        let input = &inputs[0].tables[0];
        let num_blocks = input.table.num_blocks();
        let predicate = self.predicate.clone();
        let table = input.table.clone();
        let prior_filter = input.filter.clone();

        let filters = fan_out(ctx, "select:block", num_blocks, move |block_idx| {
            let block_id = hustle_core::BlockId(block_idx as u32);
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

        Arc::new(OperatorResult::new(vec![LazyTable::with_filter(
            input.table.clone(),
            filters,
        )]))
    }
}
