//! Work-stealing task scheduler driving the Hustle execution plan DAG.
//!
//! A single scheduler thread owns the dependency graph ([`node::Graph`])
//! and a pool of worker threads run task bodies. Tasks, continuations, and
//! dependency links are submitted through a [`scheduler::SchedulerHandle`],
//! which is cheap to clone and safe to hand to a running task so it can
//! spawn subtasks of its own (spec §4.1).

mod error;
mod latch;
mod node;
mod profiling;
mod scheduler;
mod task;

pub use error::{Result, SchedulerError};
pub use latch::Latch;
pub use node::{NodeId, TaskId};
pub use profiling::{ProfileEvent, TaskDescription, TaskType};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use task::{FnTask, Task, TaskContext};
