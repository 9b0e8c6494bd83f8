//! The plan's leaf operator: binds a raw table with no filter and no
//! indices, giving every downstream operator a [`LazyTable`] to start
//! from.

use std::sync::Arc;

use hustle_scheduler::TaskContext;
use hustle_storage::Table;

use crate::lazy_table::{LazyTable, OperatorResult};
use crate::plan::Operator;

pub struct TableScan {
    table: Arc<Table>,
}

impl TableScan {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }
}

impl Operator for TableScan {
    fn name(&self) -> &'static str {
        "table_scan"
    }

    fn execute(&self, _ctx: &TaskContext, _inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
        Arc::new(OperatorResult::new(vec![LazyTable::new(self.table.clone())]))
    }
}
