//! The plain two-way hash join (spec §4.7 "Plain hash join"). Takes two
//! producers: the left side (possibly itself the output of an earlier
//! join, carrying several already-aligned `LazyTable`s) and the right
//! side (a single build-side table, ideally produced by
//! [`crate::operators::select_build_hash::SelectBuildHash`] so its hash
//! table is already built).
//!
//! A single `JoinPredicate` drives the hash probe; any further predicates
//! (a composite key, e.g. `NATURAL JOIN` matching on several shared
//! columns at once) are verified row-by-row against each hash hit rather
//! than folded into the hash key, since [`HashTable`] only ever keys on
//! one `i64` (spec §8 scenario (1)). When `outer` is set, a left row with
//! no surviving hit still produces one output row, with the right side's
//! row id set to a sentinel that reads back as NULL in every column (spec
//! §8 scenario (2) "LEFT JOIN ... NULL-padding"; see
//! [`crate::lazy_table::LazyTable`] and `Table::cell_at`'s out-of-range
//! handling).

use std::sync::Arc;

use hustle_core::{BlockId, RowId, RowInBlock, Value};
use hustle_scheduler::TaskContext;
use hustle_storage::Table;

use crate::block_parallel::fan_out_batched;
use crate::hash_table::{cast_join_key, HashTable};
use crate::lazy_table::{LazyTable, OperatorResult};
use crate::plan::Operator;
use crate::reference::{ColumnReference, JoinPredicate};

/// A right-hand row id that is always out of every table's range, used to
/// NULL-pad an unmatched left row under a LEFT JOIN.
const UNMATCHED: RowId = RowId(u64::MAX);

pub struct Join {
    /// `predicates[0]` drives the hash build/probe; any further entries are
    /// verified by direct value comparison against each hash hit.
    predicates: Vec<JoinPredicate>,
    /// Index into the left producer's `tables` naming the table that
    /// carries `predicates[0].left` -- the one probed row-by-row.
    left_driving: usize,
    /// LEFT JOIN semantics: an unmatched left row survives, NULL-padded.
    outer: bool,
}

impl Join {
    pub fn new(predicate: JoinPredicate, left_driving: usize) -> Self {
        Self { predicates: vec![predicate], left_driving, outer: false }
    }

    pub fn new_multi(predicates: Vec<JoinPredicate>, left_driving: usize, outer: bool) -> Self {
        assert!(!predicates.is_empty(), "a join needs at least one predicate");
        Self { predicates, left_driving, outer }
    }

    fn primary(&self) -> &JoinPredicate {
        &self.predicates[0]
    }
}

impl Operator for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        let left = &inputs[0];
        let right = &inputs[1];
        let left_driving = &left.tables[self.left_driving];
        let right_table = &right.tables[0];

        let left_row_ids = left_driving.surviving_row_ids();

        // Empty left input produces an empty result immediately, skipping
        // build (spec §4.7 "Edge cases and tie-breaks").
        if left_row_ids.is_empty() {
            let mut tables: Vec<LazyTable> = left.tables.iter().map(|t| empty_clone(t)).collect();
            tables.push(empty_clone(right_table));
            return Arc::new(OperatorResult::new(tables));
        }

        let hash_table = match &right_table.hash_table {
            Some(existing) => existing.clone(),
            None => Arc::new(build_hash_table(right_table, &self.primary().right)),
        };

        let left_column = self.primary().left.clone();
        let extra: Vec<JoinPredicate> = self.predicates[1..].to_vec();
        let left_table_ref = left_driving.table.clone();
        let right_table_ref = right_table.table.clone();
        let left_ids = left_row_ids.clone();
        let hash_table_ref = hash_table.clone();
        let outer = self.outer;

        // Probe from L, chunk-parallel (spec §4.7 step (2)); thread-local
        // pairs are modeled as one `Vec` per batch, merged afterward. A
        // `None` hit is an unmatched left row kept alive by `outer`.
        let pairs: Vec<(usize, Option<(BlockId, RowInBlock)>)> = fan_out_batched(
            ctx,
            "join:probe",
            left_ids.len(),
            move |start, end| {
                let mut local = Vec::new();
                for left_pos in start..end {
                    let row_id = left_ids[left_pos];
                    let Ok((block_id, row_in_block)) = left_table_ref.locate(row_id) else {
                        if outer {
                            local.push((left_pos, None));
                        }
                        continue;
                    };
                    let key_value = cell_value(&left_table_ref, block_id, row_in_block, left_column.index);
                    let mut matched = false;
                    if let Some(key) = cast_join_key(&key_value) {
                        for hit in hash_table_ref.probe(key) {
                            if extra_matches(&left_table_ref, block_id, row_in_block, &right_table_ref, hit.block_id, hit.row_in_block, &extra) {
                                local.push((left_pos, Some((hit.block_id, hit.row_in_block))));
                                matched = true;
                            }
                        }
                    }
                    if !matched && outer {
                        local.push((left_pos, None));
                    }
                }
                local
            },
        );

        // Merge thread-local pairs into global left positions and right
        // row ids (spec §4.7 step (3)); an unmatched outer row gets the
        // `UNMATCHED` sentinel, which reads back as NULL everywhere.
        let mut left_positions = Vec::with_capacity(pairs.len());
        let mut right_row_ids = Vec::with_capacity(pairs.len());
        for (left_pos, hit) in pairs {
            left_positions.push(left_pos);
            right_row_ids.push(match hit {
                Some((block_id, row_in_block)) => right_table.table.global_row_id(block_id, row_in_block),
                None => UNMATCHED,
            });
        }

        // Back-propagate (spec §4.7 step (4)): every table already bound
        // on the left side is re-indexed through the same positions so
        // the i-th output row stays aligned across all bound tables.
        let mut tables = Vec::with_capacity(left.tables.len() + 1);
        for lazy in &left.tables {
            let existing = lazy.surviving_row_ids();
            let new_indices: Vec<RowId> = left_positions.iter().map(|&pos| existing[pos]).collect();
            tables.push(LazyTable {
                table: lazy.table.clone(),
                filter: lazy.filter.clone(),
                indices: Some(new_indices),
                hash_table: lazy.hash_table.clone(),
            });
        }
        tables.push(LazyTable {
            table: right_table.table.clone(),
            filter: right_table.filter.clone(),
            indices: Some(right_row_ids),
            hash_table: Some(hash_table),
        });

        Arc::new(OperatorResult::new(tables))
    }
}

fn cell_value(table: &Table, block_id: BlockId, row_in_block: RowInBlock, column: usize) -> Value {
    table
        .with_block(block_id, |b| b.column(column).map(|c| c.get(row_in_block.0 as usize)).unwrap_or(Value::Null))
        .unwrap_or(Value::Null)
}

/// Verifies every predicate beyond the hash-driving one against a single
/// hash hit (spec §8 scenario (1): `NATURAL JOIN` on two shared columns
/// hashes on one and checks the other directly, rather than building a
/// composite key).
fn extra_matches(
    left_table: &Table,
    left_block: BlockId,
    left_row: RowInBlock,
    right_table: &Table,
    right_block: BlockId,
    right_row: RowInBlock,
    extra: &[JoinPredicate],
) -> bool {
    extra.iter().all(|p| {
        let lv = cell_value(left_table, left_block, left_row, p.left.index);
        let rv = cell_value(right_table, right_block, right_row, p.right.index);
        !lv.is_null() && !rv.is_null() && lv == rv
    })
}

fn empty_clone(lazy: &LazyTable) -> LazyTable {
    LazyTable {
        table: lazy.table.clone(),
        filter: lazy.filter.clone(),
        indices: Some(Vec::new()),
        hash_table: lazy.hash_table.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType, Schema};
    use parking_lot::Mutex;

    fn table(schema: Schema, rows: &[&[Value]]) -> Arc<Table> {
        let table = Table::new(schema, 4096);
        for row in rows {
            table.insert_record(row.to_vec().as_slice()).unwrap();
        }
        Arc::new(table)
    }

    fn run(join: Join, left: Arc<Table>, right: Arc<Table>) -> Arc<OperatorResult> {
        use hustle_scheduler::{FnTask, Latch, Scheduler, TaskContext, TaskDescription};

        let mut scheduler = Scheduler::new(Some(2), false);
        let handle = scheduler.start().unwrap();
        let left_input = Arc::new(OperatorResult::new(vec![LazyTable::new(left)]));
        let right_input = Arc::new(OperatorResult::new(vec![LazyTable::new(right)]));
        let latch = Latch::new();
        let output: Arc<Mutex<Option<Arc<OperatorResult>>>> = Arc::new(Mutex::new(None));
        {
            let output = output.clone();
            let latch_done = latch.clone();
            let join = Arc::new(join);
            let task = FnTask::new(move |ctx: &TaskContext| {
                let result = join.execute(ctx, &[left_input.clone(), right_input.clone()]);
                *output.lock() = Some(result);
                latch_done.count_down();
            });
            handle.add_task(task, TaskDescription::general("test"));
        }
        latch.wait();
        let result = output.lock().take().unwrap();
        scheduler.join().unwrap();
        result
    }

    fn tt2_tables() -> (Arc<Table>, Arc<Table>) {
        let t_schema = Schema::new(vec![
            Column::new("a", ColumnType::Int64),
            Column::new("b", ColumnType::Int64),
            Column::new("c", ColumnType::Int64),
        ]);
        let t2_schema = Schema::new(vec![
            Column::new("b", ColumnType::Int64),
            Column::new("c", ColumnType::Int64),
            Column::new("d", ColumnType::Int64),
        ]);
        // t(a,b,c) and t2(b,c,d) are seeded with the same literal rows under
        // their own schemas (spec §8 scenarios (1)/(2)): only t's first two
        // rows find a (b,c) match in t2, since t2.b never takes the value 4.
        let t = table(t_schema, &[&[Value::Int(1), Value::Int(2), Value::Int(3)], &[Value::Int(2), Value::Int(3), Value::Int(4)], &[Value::Int(3), Value::Int(4), Value::Int(5)]]);
        let t2 = table(t2_schema, &[&[Value::Int(1), Value::Int(2), Value::Int(3)], &[Value::Int(2), Value::Int(3), Value::Int(4)], &[Value::Int(3), Value::Int(4), Value::Int(5)]]);
        (t, t2)
    }

    #[test]
    fn composite_predicate_matches_both_shared_columns() {
        let (t, t2) = tt2_tables();
        let predicates = vec![
            JoinPredicate::new(ColumnReference::new("t", 1), ColumnReference::new("t2", 0)),
            JoinPredicate::new(ColumnReference::new("t", 2), ColumnReference::new("t2", 1)),
        ];
        let join = Join::new_multi(predicates, 0, false);
        let result = run(join, t, t2);

        assert_eq!(result.tables[0].surviving_row_ids().len(), 2, "t rows (1,2,3) and (2,3,4) each match one t2 row on (b,c)");
    }

    #[test]
    fn outer_join_null_pads_unmatched_left_rows() {
        let (t, t2) = tt2_tables();
        let predicate = JoinPredicate::new(ColumnReference::new("t", 0), ColumnReference::new("t2", 2));
        let join = Join::new_multi(vec![predicate], 0, true);
        let result = run(join, t, t2);

        // t.a = t2.d, t2.d in {3,4,5}: only t.a=3 matches (t2 row b=1,c=2,d=3);
        // a=1 and a=2 survive NULL-padded (spec §8 scenario (2)).
        let left_ids = result.tables[0].surviving_row_ids();
        let right_ids = result.tables[1].surviving_row_ids();
        assert_eq!(left_ids.len(), 3);
        assert_eq!(right_ids.iter().filter(|id| **id == UNMATCHED).count(), 2);
    }
}

fn build_hash_table(lazy: &LazyTable, key_column: &ColumnReference) -> HashTable {
    let mut hash_table = HashTable::new(false);
    lazy.table.for_each_block(|block_id, block| {
        let Ok(col) = block.column(key_column.index) else {
            return;
        };
        for row in 0..block.row_count() {
            let survives = match &lazy.filter {
                Some(filters) => filters[block_id.0 as usize].get(row),
                None => block.validity().get(row),
            };
            if !survives {
                continue;
            }
            if let Some(key) = cast_join_key(&col.get(row)) {
                hash_table.insert(key, hustle_core::ChunkRowId::new(block_id, RowInBlock(row as u32)));
            }
        }
    });
    hash_table
}
