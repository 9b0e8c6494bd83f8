//! FilterJoin / Lookahead Information Passing (spec §4.7, multi-way): a
//! star-schema join of one fact table against N dimension tables, using a
//! Bloom filter per dimension to reject fact rows before paying for a
//! hash probe.

use std::sync::Arc;

use hustle_core::{BlockId, ChunkRowId, RowId, RowInBlock};
use hustle_scheduler::TaskContext;
use hustle_storage::BloomFilter;

use crate::block_parallel::fan_out;
use crate::hash_table::{cast_join_key, HashTable};
use crate::lazy_table::{LazyTable, OperatorResult};
use crate::plan::Operator;
use crate::reference::JoinPredicate;

/// One dimension table's join predicate, `fact.x = dimension.y`.
pub struct FilterJoin {
    /// `predicates[i]` describes the fact/dimension equality for producer
    /// `inputs[i + 1]`.
    predicates: Vec<JoinPredicate>,
    bloom_fp_rate: f64,
}

impl FilterJoin {
    pub fn new(predicates: Vec<JoinPredicate>, bloom_fp_rate: f64) -> Self {
        Self {
            predicates,
            bloom_fp_rate,
        }
    }
}

impl Operator for FilterJoin {
    fn name(&self) -> &'static str {
        "filter_join"
    }

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        let fact = &inputs[0].tables[0];
        let dimensions: Vec<&LazyTable> = inputs[1..].iter().map(|r| &r.tables[0]).collect();
        assert_eq!(dimensions.len(), self.predicates.len());

        // (1) Build (or reuse) a Bloom filter and hash table per
        // dimension, on the dimension's join key, respecting its filter.
        let built: Vec<(Arc<BloomFilter>, Arc<HashTable>)> = dimensions
            .iter()
            .zip(&self.predicates)
            .map(|(dim, predicate)| build_dimension(dim, &predicate.right, self.bloom_fp_rate))
            .collect();

        // (2) Order filters by current selectivity (memory weight,
        // descending: the filters that have historically rejected fastest
        // are applied first).
        let mut order: Vec<usize> = (0..built.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(built[i].0.memory_weight()));

        let fact_table = fact.table.clone();
        let fact_filter = fact.filter.clone();
        let fact_column_indices: Vec<usize> = self.predicates.iter().map(|p| p.left.index).collect();
        let num_blocks = fact_table.num_blocks();
        let built_shared: Vec<(Arc<BloomFilter>, Arc<HashTable>)> = built;
        let order_shared = order;

        type Combo = (RowId, Vec<ChunkRowId>);

        let per_block: Vec<Vec<Combo>> = fan_out(ctx, "filter_join:block", num_blocks, {
            let built_shared = built_shared.clone();
            let order_shared = order_shared.clone();
            let fact_column_indices = fact_column_indices.clone();
            move |block_idx| {
                let block_id = BlockId(block_idx as u32);
                fact_table
                    .with_block(block_id, |block| {
                        let mut combos = Vec::new();
                        for row in 0..block.row_count() {
                            let survives = match &fact_filter {
                                Some(filters) => filters[block_idx].get(row),
                                None => block.validity().get(row),
                            };
                            if !survives {
                                continue;
                            }

                            // (3) Iterate ordered filters; reject
                            // immediately on the first miss.
                            let mut keys = vec![None; built_shared.len()];
                            let mut rejected = false;
                            for &dim_idx in &order_shared {
                                let Ok(value) = block.column(fact_column_indices[dim_idx]) else {
                                    rejected = true;
                                    break;
                                };
                                let cell = value.get(row);
                                let Some(key) = cast_join_key(&cell) else {
                                    rejected = true; // null keys never match
                                    break;
                                };
                                if !built_shared[dim_idx].0.probe(key) {
                                    rejected = true;
                                    break;
                                }
                                keys[dim_idx] = Some(key);
                            }
                            if rejected {
                                continue;
                            }

                            // (4) Hash-probe surviving rows against each
                            // dimension's hash table to recover its row.
                            let mut dim_hits: Vec<Vec<ChunkRowId>> = Vec::with_capacity(built_shared.len());
                            let mut any_empty = false;
                            for (dim_idx, key) in keys.into_iter().enumerate() {
                                let key = key.expect("every dimension key was resolved in the filter pass");
                                let hits = built_shared[dim_idx].1.probe(key);
                                if hits.is_empty() {
                                    any_empty = true;
                                    break;
                                }
                                dim_hits.push(hits.to_vec());
                            }
                            if any_empty {
                                continue;
                            }

                            let fact_row_id = fact_table.global_row_id(block_id, RowInBlock(row as u32));
                            for combo in cartesian(&dim_hits) {
                                combos.push((fact_row_id, combo));
                            }
                        }
                        combos
                    })
                    .unwrap_or_default()
            }
        });

        let flat: Vec<Combo> = per_block.into_iter().flatten().collect();
        let mut fact_indices = Vec::with_capacity(flat.len());
        let mut dim_indices: Vec<Vec<RowId>> = vec![Vec::with_capacity(flat.len()); dimensions.len()];
        for (fact_row, dim_rows) in flat {
            fact_indices.push(fact_row);
            for (i, chunk_row) in dim_rows.into_iter().enumerate() {
                dim_indices[i].push(dimensions[i].table.global_row_id(chunk_row.block_id, chunk_row.row_in_block));
            }
        }

        let mut tables = Vec::with_capacity(1 + dimensions.len());
        tables.push(LazyTable {
            table: fact.table.clone(),
            filter: fact.filter.clone(),
            indices: Some(fact_indices),
            hash_table: None,
        });
        for (i, dim) in dimensions.into_iter().enumerate() {
            tables.push(LazyTable {
                table: dim.table.clone(),
                filter: dim.filter.clone(),
                indices: Some(std::mem::take(&mut dim_indices[i])),
                hash_table: Some(built_shared[i].1.clone()),
            });
        }

        Arc::new(OperatorResult::new(tables))
    }
}

fn build_dimension(
    dim: &LazyTable,
    key_column: &crate::reference::ColumnReference,
    bloom_fp_rate: f64,
) -> (Arc<BloomFilter>, Arc<HashTable>) {
    if let Some(existing) = &dim.hash_table {
        let count = existing.len().max(1);
        let filter = BloomFilter::new(count, bloom_fp_rate);
        dim.table.for_each_block(|block_id, block| {
            let Ok(col) = block.column(key_column.index) else {
                return;
            };
            for row in 0..block.row_count() {
                let survives = match &dim.filter {
                    Some(filters) => filters[block_id.0 as usize].get(row),
                    None => block.validity().get(row),
                };
                if !survives {
                    continue;
                }
                if let Some(key) = cast_join_key(&col.get(row)) {
                    filter.insert(key);
                }
            }
        });
        return (Arc::new(filter), existing.clone());
    }

    let mut hash_table = HashTable::new(true);
    let filter = BloomFilter::new(dim.table.num_rows().max(1) as usize, bloom_fp_rate);
    dim.table.for_each_block(|block_id, block| {
        let Ok(col) = block.column(key_column.index) else {
            return;
        };
        for row in 0..block.row_count() {
            let survives = match &dim.filter {
                Some(filters) => filters[block_id.0 as usize].get(row),
                None => block.validity().get(row),
            };
            if !survives {
                continue;
            }
            if let Some(key) = cast_join_key(&col.get(row)) {
                hash_table.insert(key, ChunkRowId::new(block_id, RowInBlock(row as u32)));
                filter.insert(key);
            }
        }
    });

    (Arc::new(filter), Arc::new(hash_table))
}

/// The Cartesian product of each dimension's hit list, e.g. `[[a], [b, c]]`
/// → `[[a, b], [a, c]]`. In the common star-schema case every dimension's
/// join key is unique, so each inner vector has exactly one element and
/// this degenerates to a single combination.
fn cartesian(hits: &[Vec<ChunkRowId>]) -> Vec<Vec<ChunkRowId>> {
    let mut combos = vec![Vec::new()];
    for dim_hits in hits {
        let mut next = Vec::with_capacity(combos.len() * dim_hits.len());
        for combo in &combos {
            for hit in dim_hits {
                let mut extended = combo.clone();
                extended.push(*hit);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
