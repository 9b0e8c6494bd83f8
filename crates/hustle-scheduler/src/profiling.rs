//! Task descriptions and the profiling event log (spec §4.1 "Profiling").

use std::time::Instant;

/// The kind of work a task performs, carried as a tag on [`TaskDescription`]
/// (ported from the original `scheduler/task_description.h`'s `TaskType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    General,
    Preprocessing,
    RelationalOperator,
}

/// Identifies a task for profiling purposes: a type tag, a "major id"
/// (typically a query id or relational-operator id), and a free-form name.
#[derive(Debug, Clone)]
pub struct TaskDescription {
    pub task_type: TaskType,
    pub major_id: u32,
    pub name: String,
}

impl TaskDescription {
    pub fn new(task_type: TaskType, major_id: u32, name: impl Into<String>) -> Self {
        Self {
            task_type,
            major_id,
            name: name.into(),
        }
    }

    pub fn general(name: impl Into<String>) -> Self {
        Self::new(TaskType::General, 0, name)
    }
}

impl Default for TaskDescription {
    fn default() -> Self {
        Self::general("unnamed")
    }
}

/// One recorded `(TaskDescription, WorkerId, start_ts, end_ts)` event, per
/// spec §4.1. Only collected when the scheduler is built with profiling
/// enabled.
#[derive(Debug, Clone)]
pub struct ProfileEvent {
    pub description: TaskDescription,
    pub worker_id: usize,
    pub start: Instant,
    pub end: Instant,
}

impl ProfileEvent {
    pub fn duration(&self) -> std::time::Duration {
        self.end.duration_since(self.start)
    }
}
