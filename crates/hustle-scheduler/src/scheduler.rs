//! The scheduler thread, the worker pool, and the public handle.
//!
//! Mirrors the original scheduler's split between a single thread that
//! owns the dependency graph and a pool of worker threads that only ever
//! run task bodies and report back (spec §4.1). All graph mutation happens
//! on the scheduler thread; workers communicate with it exclusively
//! through [`ControlMsg`] sent over a crossbeam channel, so the graph
//! itself never needs a lock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, SchedulerError};
use crate::node::{Graph, NodeId, ReadyTask};
use crate::profiling::{ProfileEvent, TaskDescription};
use crate::task::{Task, TaskContext};

enum ControlMsg {
    AddTask {
        id: NodeId,
        task: Box<dyn Task>,
        description: TaskDescription,
        dependency: Option<NodeId>,
        dependent: Option<NodeId>,
    },
    AddContinuation {
        id: NodeId,
    },
    AddLink {
        dependency: NodeId,
        dependent: NodeId,
    },
    Halt,
}

struct WorkerSlot {
    sender: Sender<(NodeId, Box<dyn Task>)>,
}

pub(crate) struct Shared {
    control_tx: Sender<ControlMsg>,
    next_id: AtomicU64,
    num_workers: usize,
    profile: Mutex<Vec<ProfileEvent>>,
    profiling_enabled: bool,
}

/// A cloneable, thread-safe reference to a running scheduler. Tasks hold
/// one via [`TaskContext::scheduler`] so they can spawn subtasks.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    fn send(&self, msg: ControlMsg) {
        // The scheduler thread outlives every handle reachable from a
        // running task; a closed channel here means shutdown is already
        // in progress and the message can be safely dropped.
        let _ = self.shared.control_tx.send(msg);
    }

    pub fn add_task(&self, task: impl Task + 'static, description: TaskDescription) -> NodeId {
        self.add_task_inner(task, description, None, None)
    }

    pub fn add_task_with_dependency(
        &self,
        task: impl Task + 'static,
        description: TaskDescription,
        dependency: NodeId,
    ) -> NodeId {
        self.add_task_inner(task, description, Some(dependency), None)
    }

    pub fn add_task_with_dependent(
        &self,
        task: impl Task + 'static,
        description: TaskDescription,
        dependent: NodeId,
    ) -> NodeId {
        self.add_task_inner(task, description, None, Some(dependent))
    }

    fn add_task_inner(
        &self,
        task: impl Task + 'static,
        description: TaskDescription,
        dependency: Option<NodeId>,
        dependent: Option<NodeId>,
    ) -> NodeId {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(ControlMsg::AddTask {
            id,
            task: Box::new(task),
            description,
            dependency,
            dependent,
        });
        id
    }

    /// Reserves a node that completes only once every task naming it as a
    /// dependent has completed (spec §4.1 "allocate_continuation"). The
    /// returned id carries no work of its own.
    pub fn allocate_continuation(&self) -> NodeId {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(ControlMsg::AddContinuation { id });
        id
    }

    /// Adds an extra dependency edge after both nodes already exist.
    pub fn add_link(&self, dependency: NodeId, dependent: NodeId) {
        self.send(ControlMsg::AddLink {
            dependency,
            dependent,
        });
    }

    /// Chains a sequence of tasks so each depends on the completion of the
    /// previous one, returning their ids in order.
    pub fn add_task_chain(
        &self,
        tasks: Vec<(Box<dyn Task>, TaskDescription)>,
    ) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(tasks.len());
        let mut previous: Option<NodeId> = None;
        for (task, description) in tasks {
            let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
            self.send(ControlMsg::AddTask {
                id,
                task,
                description,
                dependency: previous,
                dependent: None,
            });
            ids.push(id);
            previous = Some(id);
        }
        ids
    }

    pub fn get_num_workers(&self) -> usize {
        self.shared.num_workers
    }

    pub fn profile_events(&self) -> Vec<ProfileEvent> {
        self.shared.profile.lock().clone()
    }
}

/// Owns the scheduler thread and the worker pool. Dropping a started
/// scheduler without calling [`Scheduler::join`] leaks the background
/// threads; callers are expected to join explicitly.
pub struct Scheduler {
    shared: Option<Arc<Shared>>,
    scheduler_thread: Option<JoinHandle<()>>,
    worker_threads: Vec<JoinHandle<()>>,
    num_workers: usize,
    profiling_enabled: bool,
}

impl Scheduler {
    /// Builds an unstarted scheduler with `num_workers` worker threads.
    /// `None` defaults to the number of logical CPUs (spec §5 "default
    /// worker count equals hardware concurrency").
    pub fn new(num_workers: Option<usize>, profiling_enabled: bool) -> Self {
        let num_workers = num_workers.unwrap_or_else(num_cpus::get).max(1);
        Self {
            shared: None,
            scheduler_thread: None,
            worker_threads: Vec::new(),
            num_workers,
            profiling_enabled,
        }
    }

    pub fn start(&mut self) -> Result<SchedulerHandle> {
        if self.shared.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let (control_tx, control_rx) = unbounded::<ControlMsg>();
        let (done_tx, done_rx) = unbounded::<(NodeId, TaskDescription, usize, std::time::Instant, std::time::Instant)>();

        let shared = Arc::new(Shared {
            control_tx: control_tx.clone(),
            next_id: AtomicU64::new(1),
            num_workers: self.num_workers,
            profile: Mutex::new(Vec::new()),
            profiling_enabled: self.profiling_enabled,
        });

        let handle = SchedulerHandle {
            shared: shared.clone(),
        };

        let mut worker_slots = Vec::with_capacity(self.num_workers);
        let mut worker_threads = Vec::with_capacity(self.num_workers);
        for worker_id in 0..self.num_workers {
            let (work_tx, work_rx) = unbounded::<(NodeId, Box<dyn Task>)>();
            worker_slots.push(WorkerSlot { sender: work_tx });
            let done_tx = done_tx.clone();
            let worker_handle = handle.clone();
            let builder = std::thread::Builder::new().name(format!("hustle-worker-{worker_id}"));
            let join = builder
                .spawn(move || worker_loop(worker_id, work_rx, done_tx, worker_handle))
                .map_err(|e| SchedulerError::SpawnFailed(e.to_string()))?;
            worker_threads.push(join);
        }

        let scheduler_shared = shared.clone();
        let scheduler_thread = std::thread::Builder::new()
            .name("hustle-scheduler".to_string())
            .spawn(move || scheduler_loop(control_rx, done_rx, worker_slots, scheduler_shared))
            .map_err(|e| SchedulerError::SpawnFailed(e.to_string()))?;

        self.shared = Some(shared);
        self.scheduler_thread = Some(scheduler_thread);
        self.worker_threads = worker_threads;

        Ok(handle)
    }

    /// Sends the halt signal and blocks until the scheduler thread and
    /// every worker thread have exited. No task in flight is cancelled
    /// mid-body (spec §4.1 "no mid-task cancellation"); halting only stops
    /// new work from being dispatched once the current batch drains.
    pub fn join(&mut self) -> Result<()> {
        let shared = self.shared.take().ok_or(SchedulerError::NotStarted)?;
        let _ = shared.control_tx.send(ControlMsg::Halt);
        if let Some(t) = self.scheduler_thread.take() {
            let _ = t.join();
        }
        for t in self.worker_threads.drain(..) {
            let _ = t.join();
        }
        Ok(())
    }

    pub fn get_num_workers(&self) -> usize {
        self.num_workers
    }
}

fn worker_loop(
    worker_id: usize,
    work_rx: Receiver<(NodeId, Box<dyn Task>)>,
    done_tx: Sender<(NodeId, TaskDescription, usize, std::time::Instant, std::time::Instant)>,
    handle: SchedulerHandle,
) {
    while let Ok((id, task)) = work_rx.recv() {
        let start = std::time::Instant::now();
        let ctx = TaskContext::new(id, worker_id, handle.clone());
        task.run(&ctx);
        let end = std::time::Instant::now();
        tracing::trace!(node_id = id, worker_id, "task finished");
        if done_tx
            .send((id, TaskDescription::default(), worker_id, start, end))
            .is_err()
        {
            break;
        }
    }
}

fn scheduler_loop(
    control_rx: Receiver<ControlMsg>,
    done_rx: Receiver<(NodeId, TaskDescription, usize, std::time::Instant, std::time::Instant)>,
    worker_slots: Vec<WorkerSlot>,
    shared: Arc<Shared>,
) {
    let mut graph = Graph::default();
    let next_worker = AtomicUsize::new(0);
    let mut running: std::collections::HashMap<NodeId, TaskDescription> =
        std::collections::HashMap::new();

    let dispatch = |ready: Vec<ReadyTask>,
                    worker_slots: &[WorkerSlot],
                    next_worker: &AtomicUsize,
                    running: &mut std::collections::HashMap<NodeId, TaskDescription>| {
        for r in ready {
            let idx = next_worker.fetch_add(1, Ordering::Relaxed) % worker_slots.len();
            running.insert(r.id, r.description.clone());
            let _ = worker_slots[idx].sender.send((r.id, r.task));
        }
    };

    loop {
        crossbeam::select! {
            recv(control_rx) -> msg => {
                let Ok(msg) = msg else { break };
                match msg {
                    ControlMsg::AddTask { id, task, description, dependency, dependent } => {
                        let mut ready = Vec::new();
                        graph.insert_task(id, task, description, dependency, dependent, &mut ready);
                        dispatch(ready, &worker_slots, &next_worker, &mut running);
                    }
                    ControlMsg::AddContinuation { id } => {
                        graph.insert_continuation(id);
                    }
                    ControlMsg::AddLink { dependency, dependent } => {
                        let mut ready = Vec::new();
                        graph.link(dependency, dependent, &mut ready);
                        dispatch(ready, &worker_slots, &next_worker, &mut running);
                    }
                    ControlMsg::Halt => break,
                }
            }
            recv(done_rx) -> msg => {
                let Ok((id, _desc, worker_id, start, end)) = msg else { continue };
                if shared.profiling_enabled {
                    if let Some(description) = running.remove(&id) {
                        shared.profile.lock().push(ProfileEvent {
                            description,
                            worker_id,
                            start,
                            end,
                        });
                    }
                } else {
                    running.remove(&id);
                }
                let mut ready = Vec::new();
                graph.complete_task(id, &mut ready);
                dispatch(ready, &worker_slots, &next_worker, &mut running);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;
    use std::sync::atomic::AtomicI64;
    use std::time::Duration;

    #[test]
    fn single_worker_runs_chain_in_topological_order() {
        let mut scheduler = Scheduler::new(Some(1), false);
        let handle = scheduler.start().expect("scheduler starts");

        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        let o3 = order.clone();

        let first = handle.add_task(
            FnTask::new(move |_| o1.lock().push(1)),
            TaskDescription::general("first"),
        );
        let second = handle.add_task_with_dependency(
            FnTask::new(move |_| o2.lock().push(2)),
            TaskDescription::general("second"),
            first,
        );
        let _third = handle.add_task_with_dependency(
            FnTask::new(move |_| o3.lock().push(3)),
            TaskDescription::general("third"),
            second,
        );

        std::thread::sleep(Duration::from_millis(100));
        scheduler.join().expect("joins cleanly");

        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn multiple_workers_complete_independent_tasks() {
        let mut scheduler = Scheduler::new(Some(4), false);
        let handle = scheduler.start().expect("scheduler starts");

        let total = Arc::new(AtomicI64::new(0));
        for _ in 0..20 {
            let t = total.clone();
            handle.add_task(
                FnTask::new(move |_| {
                    t.fetch_add(1, Ordering::SeqCst);
                }),
                TaskDescription::general("independent"),
            );
        }

        std::thread::sleep(Duration::from_millis(150));
        scheduler.join().expect("joins cleanly");

        assert_eq!(total.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn add_link_after_the_fact_delays_dispatch() {
        let mut scheduler = Scheduler::new(Some(1), false);
        let handle = scheduler.start().expect("scheduler starts");

        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();

        let dependency = handle.add_task(
            FnTask::new(move |_| {
                std::thread::sleep(Duration::from_millis(30));
                o1.lock().push("dependency");
            }),
            TaskDescription::general("dependency"),
        );
        let dependent = handle.add_task(
            FnTask::new(move |_| o2.lock().push("dependent")),
            TaskDescription::general("dependent"),
        );
        handle.add_link(dependency, dependent);

        std::thread::sleep(Duration::from_millis(120));
        scheduler.join().expect("joins cleanly");

        assert_eq!(*order.lock(), vec!["dependency", "dependent"]);
    }
}
