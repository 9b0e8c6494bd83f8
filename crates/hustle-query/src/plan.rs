//! `ExecutionPlan` (spec §4.9): a DAG of operators fired at the scheduler.
//! Producer/consumer edges are expressed twice, deliberately: once as
//! scheduler dependency edges (driving *when* a consumer's task starts)
//! and once as plan-level producer ids threaded through a results map
//! (driving *what data* the consumer reads). The scheduler is kept
//! data-oblivious per spec §4.1 ("the scheduler owns the task map and the
//! dependency graph; workers own only the task they currently execute").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use hustle_scheduler::{FnTask, Latch, SchedulerHandle, TaskContext, TaskDescription, TaskType};

use crate::lazy_table::OperatorResult;
use crate::reference::ProjectedReference;

pub type OperatorId = usize;

/// One node of an [`ExecutionPlan`]: runs to completion given its
/// producers' outputs and returns its own [`OperatorResult`].
pub trait Operator: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult>;
}

struct PlanNode {
    operator: Box<dyn Operator>,
    producers: Vec<OperatorId>,
}

/// A handle returned by firing a plan: the caller blocks on [`PlanHandle::wait`]
/// until the terminal operator has run (spec §5 "the caller of
/// `execute_query` suspends on a one-shot synchronization primitive
/// released by the terminal task").
pub struct PlanHandle {
    latch: Latch,
    output: Arc<Mutex<Option<Arc<OperatorResult>>>>,
}

impl PlanHandle {
    pub fn wait(&self) -> Arc<OperatorResult> {
        self.latch.wait();
        self.output
            .lock()
            .clone()
            .expect("terminal task sets the output slot before counting down the latch")
    }
}

/// A DAG of operators with explicit producer → consumer edges (spec
/// §4.9). Operators must be added in an order where every producer is
/// added before any of its consumers -- the natural order of building a
/// plan bottom-up with [`ExecutionPlan::add_operator`] returning each new
/// operator's id for later [`ExecutionPlan::create_link`] calls.
pub struct ExecutionPlan {
    nodes: Vec<PlanNode>,
    terminal: Option<OperatorId>,
    projected_refs: Vec<ProjectedReference>,
    major_id: u32,
}

impl ExecutionPlan {
    pub fn new(major_id: u32) -> Self {
        Self {
            nodes: Vec::new(),
            terminal: None,
            projected_refs: Vec::new(),
            major_id,
        }
    }

    pub fn add_operator(&mut self, operator: impl Operator + 'static) -> OperatorId {
        self.nodes.push(PlanNode {
            operator: Box::new(operator),
            producers: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Adds a producer → consumer edge. Panics if `producer` was added
    /// after `consumer` -- plans are built bottom-up.
    pub fn create_link(&mut self, producer: OperatorId, consumer: OperatorId) {
        assert!(
            producer < consumer,
            "producer operator must be added to the plan before its consumer"
        );
        self.nodes[consumer].producers.push(producer);
    }

    pub fn set_terminal(&mut self, id: OperatorId) {
        self.terminal = Some(id);
    }

    pub fn set_projected_refs(&mut self, refs: Vec<ProjectedReference>) {
        self.projected_refs = refs;
    }

    pub fn projected_refs(&self) -> &[ProjectedReference] {
        &self.projected_refs
    }

    /// Fires every operator at `scheduler`. Operators with no producers
    /// are dispatched immediately; every other operator becomes a
    /// scheduler dependent of each of its producers' tasks, so it starts
    /// only once all of them have completed (spec §4.1 ordering
    /// guarantee).
    pub fn fire(self, scheduler: &SchedulerHandle) -> PlanHandle {
        let terminal = self.terminal.expect("plan must have a terminal operator set before firing");
        let major_id = self.major_id;
        let results: Arc<Mutex<HashMap<OperatorId, Arc<OperatorResult>>>> = Arc::new(Mutex::new(HashMap::new()));
        let latch = Latch::new();
        let output: Arc<Mutex<Option<Arc<OperatorResult>>>> = Arc::new(Mutex::new(None));

        let mut scheduler_ids = Vec::with_capacity(self.nodes.len());

        for (idx, node) in self.nodes.into_iter().enumerate() {
            let PlanNode { operator, producers } = node;
            let is_terminal = idx == terminal;
            let results_handle = results.clone();
            let output_handle = output.clone();
            let latch_handle = latch.clone();
            let description = TaskDescription::new(TaskType::RelationalOperator, major_id, operator.name());

            let task = FnTask::new(move |ctx: &TaskContext| {
                let inputs: Vec<Arc<OperatorResult>> = producers
                    .iter()
                    .map(|pid| {
                        results_handle
                            .lock()
                            .get(pid)
                            .cloned()
                            .expect("producer operator must have already recorded its result")
                    })
                    .collect();
                let out = operator.execute(ctx, &inputs);
                results_handle.lock().insert(idx, out.clone());
                if is_terminal {
                    *output_handle.lock() = Some(out);
                    latch_handle.count_down();
                }
            });

            let producer_sched_ids: Vec<_> = node_producers_sched_ids(&producers, &scheduler_ids);
            let sched_id = match producer_sched_ids.split_first() {
                None => scheduler.add_task(task, description),
                Some((&first, rest)) => {
                    let id = scheduler.add_task_with_dependency(task, description, first);
                    for &dep in rest {
                        scheduler.add_link(dep, id);
                    }
                    id
                }
            };
            scheduler_ids.push(sched_id);
        }

        PlanHandle { latch, output }
    }
}

fn node_producers_sched_ids(
    producers: &[OperatorId],
    scheduler_ids: &[hustle_scheduler::NodeId],
) -> Vec<hustle_scheduler::NodeId> {
    producers.iter().map(|&pid| scheduler_ids[pid]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType, Schema, Value};
    use hustle_scheduler::Scheduler;
    use hustle_storage::Table;

    struct SourceOp(Arc<Table>);

    impl Operator for SourceOp {
        fn name(&self) -> &'static str {
            "source"
        }
        fn execute(&self, _ctx: &TaskContext, _inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
            Arc::new(OperatorResult::new(vec![crate::lazy_table::LazyTable::new(self.0.clone())]))
        }
    }

    struct CountOp;

    impl Operator for CountOp {
        fn name(&self) -> &'static str {
            "count"
        }
        fn execute(&self, _ctx: &TaskContext, inputs: &[Arc<OperatorResult>]) -> Arc<OperatorResult> {
            let total: usize = inputs[0].tables[0].surviving_row_ids().len();
            let schema = Schema::new(vec![Column::new("count", ColumnType::Int64)]);
            let out_table = Table::new(schema, 4096);
            out_table.insert_record(&[Value::Int(total as i64)]).unwrap();
            Arc::new(OperatorResult::new(vec![crate::lazy_table::LazyTable::new(Arc::new(out_table))]))
        }
    }

    #[test]
    fn plan_with_two_chained_operators_fires_in_order() {
        let schema = Schema::new(vec![Column::new("id", ColumnType::Int64)]);
        let table = Arc::new(Table::new(schema, 4096));
        for v in [1, 2, 3] {
            table.insert_record(&[Value::Int(v)]).unwrap();
        }

        let mut plan = ExecutionPlan::new(1);
        let source = plan.add_operator(SourceOp(table));
        let count = plan.add_operator(CountOp);
        plan.create_link(source, count);
        plan.set_terminal(count);

        let mut scheduler = Scheduler::new(Some(2), false);
        let handle = scheduler.start().unwrap();
        let plan_handle = plan.fire(&handle);
        let result = plan_handle.wait();
        let rows = result.tables[0].surviving_row_ids();
        let value = result.tables[0]
            .table
            .with_block(hustle_core::BlockId(0), |b| b.get_row(0)[0].clone())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(value, Value::Int(3));
        scheduler.join().unwrap();
    }
}
