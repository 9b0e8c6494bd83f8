//! End-to-end tests for the `hustle` driver: CLI subprocess tests via
//! `assert_cmd` for the four-command surface (spec §6), plus direct
//! `Engine` tests (through the `hustle_cli` library crate) for scenarios
//! the CLI itself has no argument surface for -- a bulk-loaded table ahead
//! of a query, per spec §6's literal `create_table(schema, table)`.

use std::path::Path;

use arrow::array::{Float64Array, Int64Array, StringArray};
use assert_cmd::Command;
use tempfile::TempDir;

use hustle_catalog::EngineConfig;
use hustle_cli::engine::{Engine, QueryOutcome};
use hustle_core::{RowId, Value};
use hustle_query::testutil;

fn hustle() -> Command {
    Command::cargo_bin("hustle").unwrap()
}

fn catalog_arg(tmp: &TempDir) -> String {
    tmp.path().join("catalog.json").to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// CLI subprocess tests
// ---------------------------------------------------------------------------

#[test]
fn cli_create_table_then_query_empty_result() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle()
        .args(["--catalog", &catalog, "create-table", "widgets", "--column", "id:int:pk", "--column", "name:text"])
        .assert()
        .success();

    let output = hustle().args(["--catalog", &catalog, "query", "SELECT id FROM widgets"]).output().unwrap();
    assert!(output.status.success(), "query failed: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().next(), Some("id"), "header line should name the projected column");
    assert_eq!(stdout.lines().count(), 1, "a freshly created table has no rows to print");
}

#[test]
fn cli_create_table_duplicate_name_errors() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle().args(["--catalog", &catalog, "create-table", "t", "--column", "a:int"]).assert().success();
    hustle().args(["--catalog", &catalog, "create-table", "t", "--column", "a:int"]).assert().failure();
}

#[test]
fn cli_drop_table_missing_errors() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle().args(["--catalog", &catalog, "drop-table", "ghost"]).assert().failure();
}

#[test]
fn cli_drop_table_then_query_fails() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle().args(["--catalog", &catalog, "create-table", "t", "--column", "a:int"]).assert().success();
    hustle().args(["--catalog", &catalog, "drop-table", "t"]).assert().success();
    hustle().args(["--catalog", &catalog, "query", "SELECT a FROM t"]).assert().failure();
}

#[test]
fn cli_explain_returns_nonempty_plan_text() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle().args(["--catalog", &catalog, "create-table", "t", "--column", "a:int"]).assert().success();
    let output = hustle().args(["--catalog", &catalog, "explain", "SELECT a FROM t"]).output().unwrap();
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}

#[test]
fn cli_catalog_persists_across_process_restarts() {
    let tmp = TempDir::new().unwrap();
    let catalog = catalog_arg(&tmp);

    hustle().args(["--catalog", &catalog, "create-table", "t", "--column", "a:int"]).assert().success();
    assert!(Path::new(&catalog).exists(), "create-table should have written the catalog document");

    // A second process opening the same catalog should see the table already
    // registered, rather than erroring with "unknown table".
    hustle().args(["--catalog", &catalog, "query", "SELECT a FROM t"]).assert().success();
}

// ---------------------------------------------------------------------------
// Engine-level tests (spec §8 end-to-end scenarios)
// ---------------------------------------------------------------------------

/// Scenario (3): a star-schema join followed by a filtered aggregate,
/// matching the literal SSB query `sum(lo_extendedprice*lo_discount)
/// where d_year = 1993 and lo_discount between 1 and 3 and lo_quantity <
/// 25` -- against [`testutil::lineorder`]/[`testutil::ddate`]'s fixed rows,
/// exactly one row qualifies and contributes `1624598 * 2 = 3249196`.
#[test]
fn engine_ssb_star_join_aggregate_matches_expected_revenue() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let lineorder = testutil::lineorder();
    let ddate = testutil::ddate();
    assert!(engine.create_table_with_data("lineorder", lineorder.schema().clone(), lineorder).unwrap());
    assert!(engine.create_table_with_data("ddate", ddate.schema().clone(), ddate).unwrap());

    let sql = "SELECT sum(lo_extendedprice * lo_discount) AS revenue FROM lineorder, ddate \
               WHERE lo_orderdate = d_datekey AND d_year = 1993 \
               AND lo_discount BETWEEN 1 AND 3 AND lo_quantity < 25";
    let outcome = engine.execute_query(sql).unwrap();
    let batch = match outcome {
        QueryOutcome::Rows(batch) => batch,
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    };

    assert_eq!(batch.num_rows(), 1);
    let revenue = batch.column(0).as_any().downcast_ref::<Float64Array>().expect("sum() materializes as Float64");
    assert_eq!(revenue.value(0), 3249196.0);
}

/// Querying a single table with a predicate and a projection exercises the
/// plain scan+select path (no join, no aggregate).
#[test]
fn engine_single_table_scan_and_filter() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let lineorder = testutil::lineorder();
    engine.create_table_with_data("lineorder", lineorder.schema().clone(), lineorder).unwrap();

    let outcome = engine.execute_query("SELECT lo_orderkey FROM lineorder WHERE lo_quantity < 25").unwrap();
    let batch = match outcome {
        QueryOutcome::Rows(batch) => batch,
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    };

    let keys = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let mut values: Vec<i64> = (0..keys.len()).map(|i| keys.value(i)).collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 4, 5], "orderkey 3 has quantity 30, excluded by the filter");
}

/// Scenario (1): `NATURAL JOIN` resolves same-name columns (`b`, `c`) into
/// the inner-join path and runs in-core rather than falling back, yielding
/// exactly the two rows of `t`/`t2` that agree on both shared columns.
#[test]
fn engine_natural_join_matches_shared_columns() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let t = testutil::tt();
    let t2 = testutil::tt2();
    engine.create_table_with_data("t", t.schema().clone(), t).unwrap();
    engine.create_table_with_data("t2", t2.schema().clone(), t2).unwrap();

    let outcome = engine.execute_query("SELECT * FROM t NATURAL JOIN t2").unwrap();
    let batch = match outcome {
        QueryOutcome::Rows(batch) => batch,
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    };

    assert_eq!(batch.num_columns(), 4, "a,b,c,d -- NATURAL JOIN dedups the shared b,c columns");
    assert_eq!(batch.num_rows(), 2);
    let a = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let d = batch.column(3).as_any().downcast_ref::<Int64Array>().unwrap();
    let mut rows: Vec<(i64, i64)> = (0..batch.num_rows()).map(|i| (a.value(i), d.value(i))).collect();
    rows.sort_unstable();
    assert_eq!(rows, vec![(1, 4), (2, 5)], "t.a=1 row matches t2's (b=2,c=3,d=4) row; t.a=2 matches (b=3,c=4,d=5)");
}

/// Scenario (2): `LEFT JOIN` is resolved rather than rejected, and an
/// unmatched left row survives with its right-hand columns NULL-padded
/// instead of being dropped.
#[test]
fn engine_left_join_null_pads_unmatched_rows() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let t = testutil::tt();
    let t2 = testutil::tt2();
    engine.create_table_with_data("t", t.schema().clone(), t).unwrap();
    engine.create_table_with_data("t2", t2.schema().clone(), t2).unwrap();

    let outcome = engine.execute_query("SELECT * FROM t LEFT JOIN t2 ON t.a = t2.d WHERE t.a > 1").unwrap();
    let batch = match outcome {
        QueryOutcome::Rows(batch) => batch,
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    };

    assert_eq!(batch.num_rows(), 2);
    let a = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let d = batch.column(5).as_any().downcast_ref::<Int64Array>().unwrap();
    let mut by_a: Vec<(i64, bool)> = (0..batch.num_rows()).map(|i| (a.value(i), d.is_null(i))).collect();
    by_a.sort_unstable();
    assert_eq!(by_a, vec![(2, true), (3, false)], "t.a=2 has no t2.d match and is NULL-padded; t.a=3 matches t2.d=3");
}

/// Scenario (4): TATP's `GET_SUBSCRIBER_DATA` transaction, a single-row
/// point lookup by primary key on the `Subscriber` table.
#[test]
fn engine_tatp_get_subscriber_data_by_s_id() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let subscriber = testutil::subscriber(20);
    engine.create_table_with_data("subscriber", subscriber.schema().clone(), subscriber).unwrap();

    let outcome = engine.execute_query("SELECT s_id, sub_nbr FROM subscriber WHERE s_id = 10").unwrap();
    let batch = match outcome {
        QueryOutcome::Rows(batch) => batch,
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    };

    assert_eq!(batch.num_rows(), 1);
    let s_id = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let sub_nbr = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(s_id.value(0), 10);
    assert_eq!(sub_nbr.value(0), "000000000000010");
}

/// Scenario (6): deleting a row by rowid removes it from subsequent query
/// results, and a fresh row can be re-inserted under the same `s_id`
/// afterward (exercising `Table::delete_by_rowid` end-to-end, not just at
/// the storage-block level).
#[test]
fn engine_delete_by_rowid_then_reinsert() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let subscriber = testutil::subscriber(20);
    engine.create_table_with_data("subscriber", subscriber.schema().clone(), subscriber).unwrap();
    let table = engine.table("subscriber").unwrap();

    table.delete_by_rowid(RowId(9)).unwrap();
    let after_delete = engine.execute_query("SELECT s_id FROM subscriber WHERE s_id = 10").unwrap();
    match after_delete {
        QueryOutcome::Rows(batch) => assert_eq!(batch.num_rows(), 0, "row 10 was deleted"),
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    }

    let mut values = vec![Value::Int(10), Value::Str("000000000000010".to_string())];
    values.extend(std::iter::repeat(Value::Int(1)).take(10)); // bit_1..bit_10
    values.extend(std::iter::repeat(Value::Int(0)).take(10)); // hex_1..hex_10
    values.extend(std::iter::repeat(Value::Int(0)).take(10)); // byte2_1..byte2_10
    values.push(Value::Int(0)); // msc_location
    values.push(Value::Int(0)); // vlr_location
    table.insert_record(&values).unwrap();

    let after_reinsert = engine.execute_query("SELECT s_id FROM subscriber WHERE s_id = 10").unwrap();
    match after_reinsert {
        QueryOutcome::Rows(batch) => assert_eq!(batch.num_rows(), 1, "the re-inserted row is visible"),
        QueryOutcome::Fallback(text) => panic!("expected a planned result, got a fallback: {text}"),
    }
}

/// Dropping a table removes it from both the catalog and the oracle, so a
/// query against it fails at resolution rather than panicking.
#[test]
fn engine_drop_table_then_query_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&tmp.path().join("catalog.json"), EngineConfig::default()).unwrap();

    let lineorder = testutil::lineorder();
    engine.create_table_with_data("lineorder", lineorder.schema().clone(), lineorder).unwrap();
    assert!(engine.drop_table("lineorder").unwrap());
    assert!(engine.execute_query("SELECT lo_orderkey FROM lineorder").is_err());
}
