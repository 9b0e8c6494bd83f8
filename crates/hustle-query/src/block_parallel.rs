//! Fans block-level work out onto the scheduler as subtasks of the
//! currently-running operator task, and rendezvouses before returning
//! (spec §4.1: "a task may itself spawn subtasks into its own subgraph";
//! spec §4.5: "Blocks are processed in parallel by spawning one subtask
//! per block"). The scheduler's own primitives (continuations, `Latch`)
//! are built for DAG-wide and whole-query completion; fanning out and
//! immediately rejoining from inside one task calls for a smaller,
//! purely-local countdown, which lives here instead of in
//! `hustle-scheduler`.

use std::sync::{Arc, Condvar, Mutex};

use hustle_scheduler::{FnTask, TaskContext, TaskDescription};

struct Countdown {
    remaining: Mutex<usize>,
    condvar: Condvar,
}

impl Countdown {
    fn new(n: usize) -> Self {
        Self {
            remaining: Mutex::new(n),
            condvar: Condvar::new(),
        }
    }

    fn decrement(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining -= 1;
        if *remaining == 0 {
            self.condvar.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.condvar.wait(remaining).unwrap();
        }
    }
}

/// Runs `f(index)` once per `index` in `[0, count)`, each as its own
/// scheduler subtask, and blocks the calling task until every one has
/// completed. Results are returned in index order regardless of
/// completion order.
pub fn fan_out<T, F>(ctx: &TaskContext, description: &'static str, count: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    if count == 0 {
        return Vec::new();
    }
    let f = Arc::new(f);
    let results: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new((0..count).map(|_| None).collect()));
    let countdown = Arc::new(Countdown::new(count));
    let scheduler = ctx.scheduler().clone();

    for idx in 0..count {
        let f = f.clone();
        let results = results.clone();
        let countdown = countdown.clone();
        let task = FnTask::new(move |_ctx: &TaskContext| {
            let value = f(idx);
            results.lock().unwrap()[idx] = Some(value);
            countdown.decrement();
        });
        scheduler.add_task(task, TaskDescription::general(description));
    }

    countdown.wait();
    Arc::try_unwrap(results)
        .ok()
        .expect("countdown.wait() only returns once every subtask has dropped its results handle")
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|v| v.expect("every fanned-out index produced a result before the countdown reached zero"))
        .collect()
}

/// Same contract as [`fan_out`], but each subtask handles a contiguous
/// batch of `[0, count)` rather than a single index, sized so there are
/// roughly `2 * worker_count` batches (spec §4.7 "Concurrency": "batch
/// size ≈ num_chunks / (2·worker_count)"). `f` receives the batch's
/// `(start, end)` range (end exclusive) and returns one `T` per item in
/// the batch, which are flattened back into index order.
pub fn fan_out_batched<T, F>(ctx: &TaskContext, description: &'static str, count: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize, usize) -> Vec<T> + Send + Sync + 'static,
{
    if count == 0 {
        return Vec::new();
    }
    let workers = ctx.scheduler().get_num_workers().max(1);
    let target_batches = (2 * workers).max(1);
    let batch_size = count.div_ceil(target_batches).max(1);

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < count {
        let end = (start + batch_size).min(count);
        ranges.push((start, end));
        start = end;
    }

    let batches = fan_out(ctx, description, ranges.len(), {
        let ranges = ranges.clone();
        let f = Arc::new(f);
        move |batch_idx| {
            let (start, end) = ranges[batch_idx];
            f(start, end)
        }
    });

    batches.into_iter().flatten().collect()
}
