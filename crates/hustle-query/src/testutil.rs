//! Small SSB-shaped in-memory tables for operator tests (test-only).
//!
//! Column layout and names are lifted from the `lineorder`/`ddate` schemas
//! built by the real SSB workload generator
//! (`original_source/src/benchmark/ssb_queries.cc`'s `CreateTable`), trimmed
//! to the columns spec §8 scenario (3) actually reads. Row data is hand
//! chosen, not generated, so a consuming test can assert an exact literal
//! result instead of recomputing an aggregate to compare against.

use std::sync::Arc;

use hustle_core::{Column, ColumnType, Schema, Value};
use hustle_storage::Table;

/// `lo_orderkey, lo_orderdate, lo_quantity, lo_extendedprice, lo_discount`.
///
/// Five rows, one of which is the sole contributor to
/// `sum(lo_extendedprice*lo_discount)` under the scenario (3) predicate
/// (`d_year = 1993 and lo_discount between 0 and 3 and lo_quantity < 25`);
/// the rest each violate exactly one filter leg so a broken predicate
/// shows up as a wrong sum rather than an accidental match:
///
/// | orderkey | orderdate | quantity | extendedprice | discount | qualifies |
/// |---|---|---|---|---|---|
/// | 1 | 19930315 | 20 | 1624598 | 2 | yes, contributes 3249196 |
/// | 2 | 19930315 | 10 | 999999  | 5 | no: discount out of range |
/// | 3 | 19930315 | 30 | 500000  | 1 | no: quantity not < 25 |
/// | 4 | 19940201 | 10 | 800000  | 2 | no: wrong year |
/// | 5 | 19930315 | 24 | 0       | 0 | yes, contributes 0 |
pub fn lineorder() -> Arc<Table> {
    let schema = Schema::new(vec![
        Column::new("lo_orderkey", ColumnType::Int64),
        Column::new("lo_orderdate", ColumnType::Int64),
        Column::new("lo_quantity", ColumnType::Int64),
        Column::new("lo_extendedprice", ColumnType::Int64),
        Column::new("lo_discount", ColumnType::Int64),
    ]);
    let table = Arc::new(Table::new(schema, 1 << 20));
    let rows: [[i64; 5]; 5] = [
        [1, 19930315, 20, 1624598, 2],
        [2, 19930315, 10, 999999, 5],
        [3, 19930315, 30, 500000, 1],
        [4, 19940201, 10, 800000, 2],
        [5, 19930315, 24, 0, 0],
    ];
    for row in rows {
        let values: Vec<Value> = row.iter().map(|n| Value::Int(*n)).collect();
        table.insert_record(&values).expect("fixed test data fits the schema");
    }
    table
}

/// `d_datekey, d_year`. One 1993 date and one 1994 date, matching the two
/// `lo_orderdate` values [`lineorder`] uses.
pub fn ddate() -> Arc<Table> {
    let schema = Schema::new(vec![Column::new("d_datekey", ColumnType::Int64), Column::new("d_year", ColumnType::Int64)]);
    let table = Arc::new(Table::new(schema, 1 << 16));
    for row in [[19930315i64, 1993], [19940201, 1994]] {
        let values: Vec<Value> = row.iter().map(|n| Value::Int(*n)).collect();
        table.insert_record(&values).expect("fixed test data fits the schema");
    }
    table
}

/// `t(a,b,c)`, grounded on `sql_join_test.cc`'s minimal join fixture:
/// three rows sharing literal values with [`tt2`] so a NATURAL/LEFT JOIN
/// against it has both matching and unmatched rows (spec §8 scenarios
/// (1)/(2)).
pub fn tt() -> Arc<Table> {
    let schema =
        Schema::new(vec![Column::new("a", ColumnType::Int64), Column::new("b", ColumnType::Int64), Column::new("c", ColumnType::Int64)]);
    let table = Arc::new(Table::new(schema, 1 << 16));
    for row in [[1i64, 2, 3], [2, 3, 4], [3, 4, 5]] {
        let values: Vec<Value> = row.iter().map(|n| Value::Int(*n)).collect();
        table.insert_record(&values).expect("fixed test data fits the schema");
    }
    table
}

/// `t2(b,c,d)`, seeded with the same literal rows as [`tt`] under t2's own
/// schema: `t2.b` never takes `tt`'s `c=4`/`c=5` rows' `a` value (4), so
/// `tt`'s last row has no NATURAL JOIN match and (read as `t2.d`) no LEFT
/// JOIN match for `tt.a=2` either -- only `tt.a=3` finds `t2.d=3`.
pub fn tt2() -> Arc<Table> {
    let schema =
        Schema::new(vec![Column::new("b", ColumnType::Int64), Column::new("c", ColumnType::Int64), Column::new("d", ColumnType::Int64)]);
    let table = Arc::new(Table::new(schema, 1 << 16));
    for row in [[1i64, 2, 3], [2, 3, 4], [3, 4, 5]] {
        let values: Vec<Value> = row.iter().map(|n| Value::Int(*n)).collect();
        table.insert_record(&values).expect("fixed test data fits the schema");
    }
    table
}

/// `Subscriber`, TATP's primary transactional table
/// (`tatp_hustle_loader.cc`'s `createTable` call): `s_id, sub_nbr` plus ten
/// each of `bit_`/`hex_`/`byte2_` flag columns and two location columns --
/// 34 columns total. `sub_nbr` is the zero-padded 15-digit subscriber
/// number the loader builds with `leading_zero_pad(15, s_id)`; the
/// bit/hex/byte2 fields are filled from a small fixed-seed xorshift
/// generator standing in for the loader's `std::mt19937`, since a test
/// fixture needs the same rows on every run rather than the original's
/// per-process randomness (`rg.random_bool()`/`rg.random_int(...)`).
pub fn subscriber(n_rows: i64) -> Arc<Table> {
    let mut columns = vec![Column::new("s_id", ColumnType::Int64), Column::new("sub_nbr", ColumnType::Utf8)];
    for i in 1..=10 {
        columns.push(Column::new(format!("bit_{i}"), ColumnType::Int64));
    }
    for i in 1..=10 {
        columns.push(Column::new(format!("hex_{i}"), ColumnType::Int64));
    }
    for i in 1..=10 {
        columns.push(Column::new(format!("byte2_{i}"), ColumnType::Int64));
    }
    columns.push(Column::new("msc_location", ColumnType::Int64));
    columns.push(Column::new("vlr_location", ColumnType::Int64));
    let schema = Schema::new(columns);
    let table = Arc::new(Table::new(schema, 1 << 20));

    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_bounded = |bound: u64| -> u64 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state % bound
    };

    for s_id in 1..=n_rows {
        let mut values = vec![Value::Int(s_id), Value::Str(format!("{s_id:015}"))];
        for _ in 0..10 {
            values.push(Value::Int(next_bounded(2) as i64));
        }
        for _ in 0..10 {
            values.push(Value::Int(next_bounded(16) as i64));
        }
        for _ in 0..10 {
            values.push(Value::Int(next_bounded(256) as i64));
        }
        values.push(Value::Int(next_bounded(1 << 31) as i64));
        values.push(Value::Int(next_bounded(1 << 31) as i64));
        table.insert_record(&values).expect("fixed test data fits the schema");
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineorder_has_five_seeded_rows() {
        let table = lineorder();
        assert_eq!(table.num_rows(), 5);
    }

    #[test]
    fn ddate_has_two_seeded_rows() {
        let table = ddate();
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn tt_and_tt2_have_three_seeded_rows_each() {
        assert_eq!(tt().num_rows(), 3);
        assert_eq!(tt2().num_rows(), 3);
    }

    #[test]
    fn subscriber_has_34_columns_and_zero_padded_sub_nbr() {
        let table = subscriber(10);
        assert_eq!(table.num_rows(), 10);
        assert_eq!(table.schema().columns.len(), 34);
        let sub_nbr = table.cell_at(hustle_core::RowId(9), 1);
        assert_eq!(sub_nbr, Value::Str("000000000000010".to_string()));
    }
}
