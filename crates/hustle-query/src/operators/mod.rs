//! Relational operators (spec §4.5 - §4.9): each implements [`crate::plan::Operator`]
//! and is scheduled as a DAG node by [`crate::plan::ExecutionPlan`], except
//! [`project`], which the driver calls directly once the plan's terminal
//! task has released [`crate::plan::PlanHandle::wait`].

pub mod filter_join;
pub mod hash_aggregate;
pub mod join;
pub mod project;
pub mod scan;
pub mod select;
pub mod select_build_hash;

pub use filter_join::FilterJoin;
pub use hash_aggregate::HashAggregate;
pub use join::Join;
pub use scan::TableScan;
pub use select::Select;
pub use select_build_hash::SelectBuildHash;
