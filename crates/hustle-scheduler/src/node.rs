//! The dependency graph: nodes, dependency counts, and completion
//! propagation.
//!
//! Ported structurally from the original `scheduler/node.h`: each node
//! tracks how many unmet dependencies it has (`dependency_count`) and the
//! set of nodes that depend on it (`dependents`). A node only transitions
//! to "ready" or "completed" when a decrement brings its count to zero --
//! never proactively at creation time, so a freshly [`allocate_continuation`]
//! can have dependents wired onto it after the fact without racing a
//! premature completion (spec §4.1).

use std::collections::{HashMap, HashSet};

use crate::profiling::TaskDescription;
use crate::task::Task;

pub type NodeId = u64;
pub type TaskId = NodeId;

pub(crate) enum NodeKind {
    Task {
        task: Option<Box<dyn Task>>,
        description: TaskDescription,
    },
    Continuation,
}

pub(crate) struct NodeEntry {
    pub kind: NodeKind,
    pub dependents: HashSet<NodeId>,
    pub dependency_count: usize,
}

impl NodeEntry {
    fn new_task(task: Box<dyn Task>, description: TaskDescription) -> Self {
        Self {
            kind: NodeKind::Task {
                task: Some(task),
                description,
            },
            dependents: HashSet::new(),
            dependency_count: 0,
        }
    }

    fn new_continuation() -> Self {
        Self {
            kind: NodeKind::Continuation,
            dependents: HashSet::new(),
            dependency_count: 0,
        }
    }
}

/// Work that became ready to run as a result of a graph mutation: a task
/// node whose dependency count just reached zero.
pub(crate) struct ReadyTask {
    pub id: NodeId,
    pub task: Box<dyn Task>,
    pub description: TaskDescription,
}

/// The scheduler's private dependency graph. Single-threaded owner: only
/// the scheduler thread ever touches this (spec §4.1: "the scheduler owns
/// the task map and the dependency graph").
#[derive(Default)]
pub(crate) struct Graph {
    nodes: HashMap<NodeId, NodeEntry>,
    completed: HashSet<NodeId>,
}

impl Graph {
    pub fn insert_task(
        &mut self,
        id: NodeId,
        task: Box<dyn Task>,
        description: TaskDescription,
        dependency: Option<NodeId>,
        dependent: Option<NodeId>,
        ready: &mut Vec<ReadyTask>,
    ) {
        self.nodes
            .insert(id, NodeEntry::new_task(task, description));
        if let Some(dependent) = dependent {
            self.link(id, dependent, ready);
        }
        if let Some(dependency) = dependency {
            self.link(dependency, id, ready);
        } else {
            self.try_dispatch(id, ready);
        }
    }

    pub fn insert_continuation(&mut self, id: NodeId) {
        self.nodes.insert(id, NodeEntry::new_continuation());
    }

    /// Wires `dependent` to wait for `dependency`. If `dependency` has
    /// already completed, `dependent`'s count is decremented immediately
    /// instead of being incremented-then-never-decremented.
    pub fn link(&mut self, dependency: NodeId, dependent: NodeId, ready: &mut Vec<ReadyTask>) {
        if self.completed.contains(&dependency) {
            self.decrement(dependent, ready);
            return;
        }
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.dependents.insert(dependent);
        } else {
            // Unknown dependency: treat as already satisfied rather than
            // deadlocking the dependent forever.
            self.decrement(dependent, ready);
            return;
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.dependency_count += 1;
        }
    }

    /// Call when a task's body has returned. Marks it completed and
    /// cascades to its dependents.
    pub fn complete_task(&mut self, id: NodeId, ready: &mut Vec<ReadyTask>) {
        self.finish(id, ready);
    }

    fn finish(&mut self, id: NodeId, ready: &mut Vec<ReadyTask>) {
        self.completed.insert(id);
        let dependents = self
            .nodes
            .get(&id)
            .map(|n| n.dependents.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        for dependent in dependents {
            self.decrement(dependent, ready);
        }
    }

    fn decrement(&mut self, id: NodeId, ready: &mut Vec<ReadyTask>) {
        let reached_zero = match self.nodes.get_mut(&id) {
            Some(n) => {
                n.dependency_count = n.dependency_count.saturating_sub(1);
                n.dependency_count == 0
            }
            None => false,
        };
        if reached_zero {
            self.try_dispatch(id, ready);
        }
    }

    /// If `id` is a task with zero pending dependencies, hand its work to
    /// the `ready` batch. If it's a continuation, it has no work of its own
    /// -- complete it immediately and cascade.
    fn try_dispatch(&mut self, id: NodeId, ready: &mut Vec<ReadyTask>) {
        let is_continuation = matches!(
            self.nodes.get(&id).map(|n| &n.kind),
            Some(NodeKind::Continuation)
        );
        if is_continuation {
            self.finish(id, ready);
            return;
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            if let NodeKind::Task { task, description } = &mut node.kind {
                if let Some(task) = task.take() {
                    ready.push(ReadyTask {
                        id,
                        task,
                        description: description.clone(),
                    });
                }
            }
        }
    }

    pub fn is_completed(&self, id: NodeId) -> bool {
        self.completed.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn noop_task() -> Box<dyn Task> {
        Box::new(FnTask::new(|_ctx| {}))
    }

    #[test]
    fn task_with_no_dependency_is_ready_immediately() {
        let mut g = Graph::default();
        let mut ready = Vec::new();
        g.insert_task(1, noop_task(), TaskDescription::default(), None, None, &mut ready);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, 1);
    }

    #[test]
    fn chained_dependency_releases_in_order() {
        let mut g = Graph::default();
        let mut ready = Vec::new();
        g.insert_task(1, noop_task(), TaskDescription::default(), None, None, &mut ready);
        g.insert_task(2, noop_task(), TaskDescription::default(), Some(1), None, &mut ready);
        // 2 should not be ready yet: it depends on 1.
        assert_eq!(ready.len(), 1);
        ready.clear();
        g.complete_task(1, &mut ready);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, 2);
    }

    #[test]
    fn continuation_fires_after_all_dependents_complete() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut g = Graph::default();
        let mut ready = Vec::new();

        g.insert_continuation(100);
        g.insert_task(1, noop_task(), TaskDescription::default(), None, Some(100), &mut ready);
        g.insert_task(2, noop_task(), TaskDescription::default(), None, Some(100), &mut ready);
        ready.clear();

        let c2 = counter.clone();
        g.insert_task(
            3,
            Box::new(FnTask::new(move |_| {
                c2.fetch_add(1, Ordering::SeqCst);
            })),
            TaskDescription::default(),
            Some(100),
            None,
            &mut ready,
        );
        assert!(ready.is_empty(), "task 3 must wait for the continuation");

        g.complete_task(1, &mut ready);
        assert!(ready.is_empty(), "continuation still waits on task 2");

        g.complete_task(2, &mut ready);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, 3);
        assert!(g.is_completed(100));
    }

    #[test]
    fn link_to_already_completed_dependency_dispatches_immediately() {
        let mut g = Graph::default();
        let mut ready = Vec::new();
        g.insert_task(1, noop_task(), TaskDescription::default(), None, None, &mut ready);
        ready.clear();
        g.complete_task(1, &mut ready);
        ready.clear();

        g.insert_task(2, noop_task(), TaskDescription::default(), Some(1), None, &mut ready);
        assert_eq!(ready.len(), 1, "dependency already done, so 2 is ready immediately");
    }
}
