//! Operator framework and execution plan for the Hustle analytical query
//! engine (spec §2 component (5) "Operator framework", (6)-(9) "Select /
//! filter" through "Projection + materialization").
//!
//! An [`ExecutionPlan`] wires [`Operator`]s (leaves first) into a DAG,
//! each consuming and producing an [`OperatorResult`] -- an ordered set of
//! [`LazyTable`]s or, after aggregation, [`VirtualRows`]. Firing the plan
//! at a [`hustle_scheduler::SchedulerHandle`] returns a [`PlanHandle`]
//! the driver blocks on; once it resolves, [`operators::project::materialize`]
//! turns the terminal result into an `arrow::RecordBatch`.

mod block_parallel;
mod error;
mod hash_table;
mod lazy_table;
pub mod operators;
mod plan;
mod predicate;
mod reference;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use error::{QueryError, Result};
pub use hash_table::{cast_join_key, HashTable};
pub use lazy_table::{LazyTable, OperatorResult, VirtualColumn, VirtualRows};
pub use plan::{ExecutionPlan, Operator, OperatorId, PlanHandle};
pub use predicate::PredicateTree;
pub use reference::{
    AggExpr, AggKernel, AggregateRef, ArithOp, ColumnReference, GroupKey, JoinKind, JoinPredicate, OrderByReference,
    ProjectedReference,
};
