//! Projection and materialization (spec §4.2 "materialize(column_refs)",
//! spec §2 component (9) "Projection + materialization"): resolves the
//! output column list against the final `OperatorResult` and builds the
//! user-facing `arrow::RecordBatch`. Unlike the other operators this one
//! is not a DAG node -- the driver calls it directly once
//! `PlanHandle::wait()` returns (spec §2 "Control flow": "...blocks on a
//! synchronization primitive released when the terminal operator
//! finishes," after which projection runs).

use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;

use hustle_core::{ColumnType, Value};

use crate::error::{QueryError, Result};
use crate::lazy_table::{OperatorResult, VirtualRows};
use crate::reference::ProjectedReference;

/// Resolves `column_refs` against `result` and builds a `RecordBatch`. If
/// `result` already carries [`VirtualRows`] (the output of
/// [`crate::operators::hash_aggregate::HashAggregate`]), those columns are
/// taken as-is -- aggregation has already fixed the final column list and
/// names. Otherwise `table_order[i]` names the table bound at
/// `result.tables[i]`, and each projected column is read through its
/// bound table's surviving row ids (spec §4.2: "take(LazyTable.indices)
/// from each LazyTable's columns").
pub fn materialize(
    result: &OperatorResult,
    column_refs: &[ProjectedReference],
    table_order: &[String],
) -> Result<RecordBatch> {
    if let Some(virtual_rows) = &result.virtual_rows {
        return materialize_virtual(virtual_rows);
    }

    let mut fields = Vec::with_capacity(column_refs.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(column_refs.len());
    for projected in column_refs {
        let table_idx = table_order
            .iter()
            .position(|name| name == &projected.column.table)
            .ok_or_else(|| QueryError::plan(format!("unresolved projected table `{}`", projected.column.table)))?;
        let lazy = &result.tables[table_idx];
        let column = lazy.table.schema().columns.get(projected.column.index).ok_or_else(|| {
            QueryError::plan(format!("projected column index {} out of range", projected.column.index))
        })?;
        let name = projected.alias.clone().unwrap_or_else(|| column.name.clone());
        let values: Vec<Value> = lazy
            .surviving_row_ids()
            .into_iter()
            .map(|row_id| lazy.table.cell_at(row_id, projected.column.index))
            .collect();

        let (array, data_type) = build_array(CellKind::from_column_type(column.ty), &values);
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(ArrowSchema::new(fields));
    RecordBatch::try_new(schema, arrays).map_err(|e| QueryError::execution(e.to_string()))
}

fn materialize_virtual(rows: &VirtualRows) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(rows.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(rows.columns.len());
    for column in &rows.columns {
        let kind = CellKind::infer(&column.values);
        let (array, data_type) = build_array(kind, &column.values);
        fields.push(Field::new(column.name.clone(), data_type, true));
        arrays.push(array);
    }
    let schema = Arc::new(ArrowSchema::new(fields));
    RecordBatch::try_new(schema, arrays).map_err(|e| QueryError::execution(e.to_string()))
}

/// The Arrow-array shape a column of [`Value`]s should build into.
/// Distinct from [`ColumnType`] because a `MEAN`/`SUM` result column has
/// no storage-backed type of its own (spec §3: "the result of a MEAN
/// aggregate, which is not necessarily integral").
#[derive(Clone, Copy)]
enum CellKind {
    Int64,
    Float64,
    Utf8,
    Binary,
}

impl CellKind {
    fn from_column_type(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Int64 => CellKind::Int64,
            ColumnType::Utf8 => CellKind::Utf8,
            ColumnType::FixedBytes(_) => CellKind::Binary,
        }
    }

    /// Used for virtual (aggregated) columns, which carry no declared
    /// schema type: picks the first non-null value's shape, defaulting to
    /// `Int64` for an all-null column.
    fn infer(values: &[Value]) -> Self {
        for value in values {
            match value {
                Value::Int(_) => return CellKind::Int64,
                Value::Float(_) => return CellKind::Float64,
                Value::Str(_) => return CellKind::Utf8,
                Value::Bytes(_) => return CellKind::Binary,
                Value::Null => continue,
            }
        }
        CellKind::Int64
    }
}

fn build_array(kind: CellKind, values: &[Value]) -> (ArrayRef, DataType) {
    match kind {
        CellKind::Int64 => {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Int(n) => Some(*n),
                    Value::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            (Arc::new(Int64Array::from(data)) as ArrayRef, DataType::Int64)
        }
        CellKind::Float64 => {
            let data: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    Value::Int(n) => Some(*n as f64),
                    _ => None,
                })
                .collect();
            (Arc::new(Float64Array::from(data)) as ArrayRef, DataType::Float64)
        }
        CellKind::Utf8 => {
            let owned: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Value::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            let refs: Vec<Option<&str>> = owned.iter().map(|s| s.as_deref()).collect();
            (Arc::new(StringArray::from(refs)) as ArrayRef, DataType::Utf8)
        }
        CellKind::Binary => {
            let owned: Vec<Option<Vec<u8>>> = values
                .iter()
                .map(|v| match v {
                    Value::Bytes(b) => Some(b.clone()),
                    _ => None,
                })
                .collect();
            let refs: Vec<Option<&[u8]>> = owned.iter().map(|b| b.as_deref()).collect();
            (Arc::new(BinaryArray::from(refs)) as ArrayRef, DataType::Binary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy_table::{LazyTable, VirtualColumn};
    use crate::reference::ColumnReference;
    use hustle_core::{Column, Schema};
    use hustle_storage::Table;

    #[test]
    fn projects_bound_table_columns_by_index() {
        let schema = Schema::new(vec![Column::new("id", ColumnType::Int64), Column::new("name", ColumnType::Utf8)]);
        let table = Arc::new(Table::new(schema, 4096));
        table.insert_record(&[Value::Int(1), Value::Str("a".into())]).unwrap();
        table.insert_record(&[Value::Int(2), Value::Str("b".into())]).unwrap();

        let result = OperatorResult::new(vec![LazyTable::new(table)]);
        let refs = vec![ProjectedReference::aliased(ColumnReference::new("t", 1), "label")];
        let batch = materialize(&result, &refs, &["t".to_string()]).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "label");
    }

    #[test]
    fn virtual_rows_pass_through_aggregated_columns() {
        let rows = VirtualRows {
            columns: vec![
                VirtualColumn {
                    name: "region".to_string(),
                    values: vec![Value::Str("east".into())],
                },
                VirtualColumn {
                    name: "total".to_string(),
                    values: vec![Value::Float(30.0)],
                },
            ],
        };
        let result = OperatorResult::virtual_rows(rows);
        let batch = materialize(&result, &[], &[]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 2);
    }
}
