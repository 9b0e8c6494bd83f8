//! A one-shot completion signal for a single query, independent of
//! [`crate::scheduler::Scheduler::join`] (which tears down the whole
//! pool). A caller drives a plan to completion by creating a `Latch`,
//! handing its [`Latch::counter`] clone into the terminal continuation's
//! task body, and blocking on [`Latch::wait`].

use std::sync::{Arc, Condvar, Mutex};

struct Inner {
    done: Mutex<bool>,
    condvar: Condvar,
}

/// Cloneable handle to the shared completion flag. `count_down` is called
/// from within the task that represents "this query's plan has finished".
#[derive(Clone)]
pub struct Latch {
    inner: Arc<Inner>,
}

impl Latch {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                done: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn count_down(&self) {
        let mut done = self.inner.done.lock().unwrap();
        *done = true;
        self.inner.condvar.notify_all();
    }

    /// Blocks the calling thread until [`Latch::count_down`] has been
    /// called at least once.
    pub fn wait(&self) {
        let mut done = self.inner.done.lock().unwrap();
        while !*done {
            done = self.inner.condvar.wait(done).unwrap();
        }
    }

    pub fn is_done(&self) -> bool {
        *self.inner.done.lock().unwrap()
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wait_returns_after_count_down() {
        let latch = Latch::new();
        let waiter = latch.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waiter.count_down();
        });
        latch.wait();
        assert!(latch.is_done());
        handle.join().unwrap();
    }

    #[test]
    fn wait_on_already_done_latch_returns_immediately() {
        let latch = Latch::new();
        latch.count_down();
        latch.wait();
    }
}
