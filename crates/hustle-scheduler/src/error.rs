//! Scheduler-local errors.
//!
//! The scheduler itself is failure-oblivious about *task* failures (spec
//! §4.1 "Failure semantics": a task reports failure by writing to shared
//! state it was given, not by returning an error to the scheduler). These
//! variants cover only scheduler lifecycle misuse.

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("scheduler has not been started")]
    NotStarted,

    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
