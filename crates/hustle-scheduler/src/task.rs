//! The unit of work the scheduler executes.

use crate::node::NodeId;
use crate::scheduler::SchedulerHandle;

/// Context handed to a running task: its own node id (for logging) and a
/// handle back into the scheduler so the task can spawn subtasks into its
/// own subgraph (spec §4.1: "a task may itself spawn subtasks into its own
/// subgraph").
pub struct TaskContext {
    pub task_id: NodeId,
    pub worker_id: usize,
    scheduler: SchedulerHandle,
}

impl TaskContext {
    pub(crate) fn new(task_id: NodeId, worker_id: usize, scheduler: SchedulerHandle) -> Self {
        Self {
            task_id,
            worker_id,
            scheduler,
        }
    }

    /// The scheduler handle, for spawning subtasks from within a task body.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}

/// A unit of schedulable work. Task bodies run to completion without
/// yielding (spec §5: "task bodies run to completion"); there is no
/// cooperative suspension point inside `run`.
pub trait Task: Send {
    fn run(self: Box<Self>, ctx: &TaskContext);
}

/// Adapts a plain closure into a [`Task`], for the common case of
/// `scheduler.add_task(FnTask::new(|ctx| { ... }))`.
pub struct FnTask<F>
where
    F: FnOnce(&TaskContext) + Send + 'static,
{
    f: F,
}

impl<F> FnTask<F>
where
    F: FnOnce(&TaskContext) + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Task for FnTask<F>
where
    F: FnOnce(&TaskContext) + Send + 'static,
{
    fn run(self: Box<Self>, ctx: &TaskContext) {
        (self.f)(ctx)
    }
}
