//! HashAggregate (spec §4.8): hash-based group-by with SUM/COUNT/MEAN
//! kernels, sharded by group-key hash to bound contention, followed by an
//! optional stable order-by sort.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use hustle_core::{RowId, Value};
use hustle_scheduler::TaskContext;
use hustle_storage::Table;
use parking_lot::Mutex;

use crate::block_parallel::fan_out_batched;
use crate::hash_table::stable_hash;
use crate::lazy_table::{OperatorResult, VirtualColumn, VirtualRows};
use crate::plan::Operator;
use crate::reference::{AggExpr, AggKernel, AggregateRef, ArithOp, ColumnReference, GroupKey, OrderByReference};

pub struct HashAggregate {
    group_by: Vec<GroupKey>,
    aggregates: Vec<AggregateRef>,
    order_by: Vec<OrderByReference>,
    /// `table_order[i]` names the table bound at `inputs[0].tables[i]`;
    /// group-by and aggregate column refs may name any table already
    /// joined into the incoming result, so resolving one means finding its
    /// position here.
    table_order: Vec<String>,
    shard_count: usize,
}

impl HashAggregate {
    pub fn new(
        group_by: Vec<GroupKey>,
        aggregates: Vec<AggregateRef>,
        order_by: Vec<OrderByReference>,
        table_order: Vec<String>,
        worker_count: usize,
    ) -> Self {
        Self {
            group_by,
            aggregates,
            order_by,
            table_order,
            // spec §5 "Aggregation shards each hold a mutex; the number of
            // shards is at least 2x worker count".
            shard_count: (2 * worker_count.max(1)).max(1),
        }
    }

    fn table_index(&self, column: &ColumnReference) -> usize {
        self.table_order
            .iter()
            .position(|name| name == &column.table)
            .expect("group-by/aggregate column names a table bound in the incoming result")
    }
}

/// Reduces a group-by value by its modulus, when one is present (spec §8
/// scenario (5): `GROUP BY x % 7` groups by remainder, not by `x` itself).
fn apply_modulo(value: Value, modulo: Option<i64>) -> Value {
    match (value, modulo) {
        (Value::Int(v), Some(m)) if m != 0 => Value::Int(v % m),
        (v, _) => v,
    }
}

/// Running aggregate state for one group. `sums`/`counts`/`errored` are
/// parallel to the aggregate list.
struct GroupState {
    group_values: Vec<Value>,
    sums: Vec<f64>,
    counts: Vec<u64>,
    /// Set once a division by zero has occurred for that aggregate within
    /// this group; the final value becomes null regardless of later rows
    /// (spec §4.8 "Failure semantics").
    errored: Vec<bool>,
}

impl GroupState {
    fn new(group_values: Vec<Value>, num_aggregates: usize) -> Self {
        Self {
            group_values,
            sums: vec![0.0; num_aggregates],
            counts: vec![0; num_aggregates],
            errored: vec![false; num_aggregates],
        }
    }
}

impl Operator for HashAggregate {
    fn name(&self) -> &'static str {
        "hash_aggregate"
    }

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        let input = &inputs[0];
        let tables: Vec<Arc<Table>> = input.tables.iter().map(|t| t.table.clone()).collect();
        let row_ids: Vec<Vec<RowId>> = input.tables.iter().map(|t| t.surviving_row_ids()).collect();
        let num_rows = row_ids.first().map(Vec::len).unwrap_or(0);

        let group_by = self.group_by.clone();
        let aggregates = self.aggregates.clone();
        let table_indices_group: Vec<usize> = group_by.iter().map(|gk| self.table_index(&gk.column)).collect();
        let table_indices_agg: Vec<(usize, Option<usize>)> = aggregates
            .iter()
            .map(|a| match &a.expr {
                AggExpr::Column(c) => (self.table_index(c), None),
                AggExpr::Arithmetic { left, right, .. } => (self.table_index(left), Some(self.table_index(right))),
            })
            .collect();

        let shards: Arc<Vec<Mutex<HashMap<u64, GroupState>>>> =
            Arc::new((0..self.shard_count).map(|_| Mutex::new(HashMap::new())).collect());
        let tables = Arc::new(tables);
        let row_ids = Arc::new(row_ids);

        fan_out_batched(ctx, "hash_aggregate:batch", num_rows, {
            let shards = shards.clone();
            let tables = tables.clone();
            let row_ids = row_ids.clone();
            let group_by = group_by.clone();
            let aggregates = aggregates.clone();
            let table_indices_group = table_indices_group.clone();
            let table_indices_agg = table_indices_agg.clone();
            move |start, end| {
                for pos in start..end {
                    let group_values: Vec<Value> = group_by
                        .iter()
                        .zip(&table_indices_group)
                        .map(|(gk, &t)| apply_modulo(tables[t].cell_at(row_ids[t][pos], gk.column.index), gk.modulo))
                        .collect();
                    let key = hash_group_key(&group_values);
                    let shard_idx = (key as usize) % shards.len();
                    let mut shard = shards[shard_idx].lock();
                    let state = shard
                        .entry(key)
                        .or_insert_with(|| GroupState::new(group_values.clone(), aggregates.len()));

                    for (i, agg) in aggregates.iter().enumerate() {
                        if state.errored[i] {
                            continue;
                        }
                        let value = match &agg.expr {
                            AggExpr::Column(col) => {
                                let (t, _) = table_indices_agg[i];
                                tables[t].cell_at(row_ids[t][pos], col.index)
                            }
                            AggExpr::Arithmetic { op, left, right } => {
                                let (tl, tr) = table_indices_agg[i];
                                let tr = tr.expect("arithmetic aggregate resolves both operand tables");
                                let lv = tables[tl].cell_at(row_ids[tl][pos], left.index);
                                let rv = tables[tr].cell_at(row_ids[tr][pos], right.index);
                                match apply_arith(*op, &lv, &rv) {
                                    Some(v) => v,
                                    None => {
                                        state.errored[i] = true;
                                        continue;
                                    }
                                }
                            }
                        };
                        match agg.kernel {
                            AggKernel::Count => {
                                if !value.is_null() {
                                    state.counts[i] += 1;
                                }
                            }
                            AggKernel::Sum | AggKernel::Mean => {
                                if let Some(n) = numeric(&value) {
                                    state.sums[i] += n;
                                    state.counts[i] += 1;
                                }
                            }
                        }
                    }
                }
                Vec::<()>::new()
            }
        });

        let mut rows: Vec<Vec<Value>> = Vec::new();
        for shard in shards.iter() {
            let shard = shard.lock();
            for state in shard.values() {
                let mut row = state.group_values.clone();
                for (i, agg) in aggregates.iter().enumerate() {
                    row.push(if state.errored[i] {
                        Value::Null
                    } else {
                        match agg.kernel {
                            AggKernel::Count => Value::Int(state.counts[i] as i64),
                            AggKernel::Sum => Value::Float(state.sums[i]),
                            AggKernel::Mean => {
                                if state.counts[i] == 0 {
                                    Value::Null
                                } else {
                                    Value::Float(state.sums[i] / state.counts[i] as f64)
                                }
                            }
                        }
                    });
                }
                rows.push(row);
            }
        }

        if !self.order_by.is_empty() {
            let group_len = group_by.len();
            let order_positions: Vec<(usize, bool)> = self
                .order_by
                .iter()
                .map(|ob| {
                    let pos = group_by
                        .iter()
                        .position(|gk| gk.column == ob.column && gk.modulo == ob.modulo)
                        .or_else(|| {
                            aggregates
                                .iter()
                                .position(|a| matches!(&a.expr, AggExpr::Column(c) if c == &ob.column))
                                .map(|i| group_len + i)
                        })
                        .expect("order-by column names a group-by or aggregate column");
                    (pos, ob.descending)
                })
                .collect();
            rows.sort_by(|a, b| {
                for &(pos, descending) in &order_positions {
                    let ordering = compare_for_order(&a[pos], &b[pos], descending);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let mut column_names: Vec<String> = Vec::with_capacity(group_by.len() + aggregates.len());
        for (gk, &t) in group_by.iter().zip(&table_indices_group) {
            let base = &tables[t].schema().columns[gk.column.index].name;
            column_names.push(match gk.modulo {
                Some(m) => format!("{base} % {m}"),
                None => base.clone(),
            });
        }
        for agg in &aggregates {
            let default_name = match agg.kernel {
                AggKernel::Sum => "sum",
                AggKernel::Count => "count",
                AggKernel::Mean => "mean",
            };
            column_names.push(agg.alias.clone().unwrap_or_else(|| default_name.to_string()));
        }

        let num_cols = column_names.len();
        let mut columns: Vec<Vec<Value>> = (0..num_cols).map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            for (i, value) in row.into_iter().enumerate() {
                columns[i].push(value);
            }
        }

        Arc::new(OperatorResult::virtual_rows(VirtualRows {
            columns: column_names
                .into_iter()
                .zip(columns)
                .map(|(name, values)| VirtualColumn { name, values })
                .collect(),
        }))
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

/// Evaluates a two-column arithmetic aggregate expression. Returns
/// `Some(Value::Null)` when an operand is null or non-numeric (that row
/// simply doesn't contribute); returns `None` on division by zero, which
/// the caller turns into a sticky per-group error (spec §4.8).
fn apply_arith(op: ArithOp, left: &Value, right: &Value) -> Option<Value> {
    if left.is_null() || right.is_null() {
        return Some(Value::Null);
    }
    let (Some(l), Some(r)) = (numeric(left), numeric(right)) else {
        return Some(Value::Null);
    };
    Some(match op {
        ArithOp::Add => Value::Float(l + r),
        ArithOp::Sub => Value::Float(l - r),
        ArithOp::Mul => Value::Float(l * r),
        ArithOp::Div => {
            if r == 0.0 {
                return None;
            }
            Value::Float(l / r)
        }
    })
}

/// The group key for one row: a tagged-byte concatenation of its group-by
/// column values, reduced to a 64-bit hash (spec §4.8 step (1)).
fn hash_group_key(values: &[Value]) -> u64 {
    let mut bytes = Vec::new();
    for value in values {
        match value {
            Value::Null => bytes.push(0u8),
            Value::Int(v) => {
                bytes.push(1);
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            Value::Float(v) => {
                bytes.push(2);
                bytes.extend_from_slice(&v.to_bits().to_le_bytes());
            }
            Value::Str(s) => {
                bytes.push(3);
                bytes.extend_from_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                bytes.push(4);
                bytes.extend_from_slice(b);
            }
        }
    }
    stable_hash(&bytes)
}

/// Order-by comparison honoring spec §4.8 "Tie-breaks": NULLs sort last
/// ascending, first descending.
fn compare_for_order(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if descending {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if descending {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let cmp = a.compare(b).unwrap_or(Ordering::Equal);
            if descending {
                cmp.reverse()
            } else {
                cmp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType, Schema};
    use crate::lazy_table::LazyTable;

    fn sales_table() -> Arc<Table> {
        let schema = Schema::new(vec![
            Column::new("region", ColumnType::Utf8),
            Column::new("amount", ColumnType::Int64),
        ]);
        let table = Table::new(schema, 4096);
        for (region, amount) in [("east", 10), ("west", 5), ("east", 20), ("west", 0)] {
            table.insert_record(&[Value::Str(region.to_string()), Value::Int(amount)]).unwrap();
        }
        Arc::new(table)
    }

    fn run(agg: HashAggregate, table: Arc<Table>) -> Arc<OperatorResult> {
        use hustle_scheduler::{FnTask, Latch, Scheduler, TaskContext, TaskDescription};

        let mut scheduler = Scheduler::new(Some(2), false);
        let handle = scheduler.start().unwrap();
        let input = Arc::new(OperatorResult::new(vec![LazyTable::new(table)]));
        let latch = Latch::new();
        let output: Arc<Mutex<Option<Arc<OperatorResult>>>> = Arc::new(Mutex::new(None));
        {
            let output = output.clone();
            let latch_done = latch.clone();
            let agg = Arc::new(agg);
            let task = FnTask::new(move |ctx: &TaskContext| {
                let result = agg.execute(ctx, &[input.clone()]);
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

    #[test]
    fn sums_and_counts_per_group() {
        let table = sales_table();
        let region = ColumnReference::new("sales", 0);
        let amount = ColumnReference::new("sales", 1);
        let agg = HashAggregate::new(
            vec![GroupKey::plain(region)],
            vec![
                AggregateRef::column(AggKernel::Sum, amount.clone()).aliased("total"),
                AggregateRef::column(AggKernel::Count, amount).aliased("n"),
            ],
            vec![OrderByReference::asc(ColumnReference::new("sales", 0))],
            vec!["sales".to_string()],
            2,
        );
        let result = run(agg, table);
        let rows = result.virtual_rows.as_ref().unwrap();
        let region_col = &rows.columns[0];
        let total_col = &rows.columns[1];
        assert_eq!(region_col.values, vec![Value::Str("east".into()), Value::Str("west".into())]);
        assert_eq!(total_col.values, vec![Value::Float(30.0), Value::Float(5.0)]);
    }

    #[test]
    fn groups_by_modulo_of_a_column() {
        let schema = Schema::new(vec![Column::new("x", ColumnType::Int64)]);
        let table = Table::new(schema, 4096);
        for x in 0..14i64 {
            table.insert_record(&[Value::Int(x)]).unwrap();
        }
        let table = Arc::new(table);
        let x = ColumnReference::new("t", 0);
        let agg = HashAggregate::new(
            vec![GroupKey::modulo(x.clone(), 7)],
            vec![AggregateRef::column(AggKernel::Sum, x).aliased("total")],
            vec![OrderByReference::asc_modulo(ColumnReference::new("t", 0), 7)],
            vec!["t".to_string()],
            2,
        );
        let result = run(agg, table);
        let rows = result.virtual_rows.as_ref().unwrap();
        assert_eq!(rows.columns[0].name, "x % 7");
        assert_eq!(rows.columns[0].values.len(), 7, "x in 0..14 has exactly 7 distinct remainders");
        let totals: Vec<Value> = (0..7).map(|r: i64| Value::Float((2 * r + 7) as f64)).collect();
        assert_eq!(rows.columns[1].values, totals);
    }

    #[test]
    fn mean_is_null_when_group_is_empty() {
        assert_eq!(apply_arith(ArithOp::Div, &Value::Int(4), &Value::Int(0)), None);
        assert_eq!(
            apply_arith(ArithOp::Div, &Value::Int(4), &Value::Int(2)),
            Some(Value::Float(2.0))
        );
    }

    #[test]
    fn order_places_nulls_last_ascending_first_descending() {
        assert_eq!(compare_for_order(&Value::Null, &Value::Int(1), false), Ordering::Greater);
        assert_eq!(compare_for_order(&Value::Null, &Value::Int(1), true), Ordering::Less);
    }
}
