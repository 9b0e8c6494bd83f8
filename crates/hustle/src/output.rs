//! Renders a query result `RecordBatch` as a plain text table (no
//! `arrow` prettyprint feature enabled anywhere in the workspace, so this
//! writes one column type at a time by hand).

use std::io::{self, Write};

use arrow::array::{Array, BinaryArray, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;

pub fn print_batch(batch: &RecordBatch) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let headers: Vec<&str> = batch.schema().fields().iter().map(|f| f.name().as_str()).collect();
    writeln!(out, "{}", headers.join("\t"))?;

    for row in 0..batch.num_rows() {
        let mut cells = Vec::with_capacity(batch.num_columns());
        for col in batch.columns() {
            cells.push(format_cell(col.as_ref(), row));
        }
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

fn format_cell(array: &dyn Array, row: usize) -> String {
    if array.is_null(row) {
        return "NULL".to_string();
    }
    if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        return a.value(row).to_string();
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        return a.value(row).to_string();
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return a.value(row).to_string();
    }
    if let Some(a) = array.as_any().downcast_ref::<BinaryArray>() {
        return format!("{:?}", a.value(row));
    }
    "?".to_string()
}
