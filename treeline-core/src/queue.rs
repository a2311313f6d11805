//! Blocking task queue shared by the worker pool and the pipeline stages.
//!
//! [`TaskQueue`] pairs a mutex-guarded deque with a condition variable and a
//! stop flag. `push` wakes exactly one waiter, `close` raises the stop flag
//! and wakes every waiter, and `pop` keeps handing out queued items after
//! `close` so executors drain outstanding work before their workers exit.
//! Pushing after `close` is accepted: pipeline stages post continuations
//! while the preceding stage is draining, and those must still run.

use std::{
    any::Any,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use tracing::error;

/// A unit of executor work: one whole client workflow on the worker pool,
/// one stage continuation on the pipeline.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

struct QueueState<T> {
    items: VecDeque<T>,
    stopping: bool,
}

pub(crate) struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

impl<T> TaskQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                stopping: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Appends an item and wakes exactly one waiting worker.
    ///
    /// Returns the queue depth after the append, for caller diagnostics.
    pub(crate) fn push(&self, item: T) -> usize {
        let depth = {
            let mut state = self.lock_state();
            state.items.push_back(item);
            state.items.len()
        };
        self.ready.notify_one();
        depth
    }

    /// Raises the stop flag and wakes every waiting worker.
    pub(crate) fn close(&self) {
        {
            let mut state = self.lock_state();
            state.stopping = true;
        }
        self.ready.notify_all();
    }

    /// Blocks until an item is available or the queue is stopping.
    ///
    /// Returns `None` only once the queue is stopping *and* empty; queued
    /// items are always handed out first, which gives executors their
    /// drain-before-exit discipline.
    pub(crate) fn pop(&self) -> Option<T> {
        let mut state = self.lock_state();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.stopping {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    // The critical sections above never panic while holding the lock, so a
    // poisoned mutex still guards consistent state; recover the guard rather
    // than wedging every executor thread behind it.
    fn lock_state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a task, containing any panic to this call.
///
/// Worker threads are long-lived and shared across clients; a panicking
/// task must never take the thread down with it.
pub(crate) fn run_contained(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || task())) {
        error!(panic = panic_detail(payload.as_ref()), "task panicked");
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::{TaskQueue, run_contained};

    #[test]
    fn pop_returns_items_in_push_order() {
        let queue = TaskQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        queue.close();
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_reports_queue_depth() {
        let queue = TaskQueue::new();
        assert_eq!(queue.push('a'), 1);
        assert_eq!(queue.push('b'), 2);
    }

    #[test]
    fn pop_blocks_until_an_item_arrives() {
        let queue = Arc::new(TaskQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(7);
        assert_eq!(waiter.join().expect("waiter must not panic"), Some(7));
    }

    #[test]
    fn close_wakes_every_blocked_waiter() {
        let queue: Arc<TaskQueue<u8>> = Arc::new(TaskQueue::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.close();
        for waiter in waiters {
            assert_eq!(waiter.join().expect("waiter must not panic"), None);
        }
    }

    #[test]
    fn items_queued_before_close_still_drain() {
        let queue = TaskQueue::new();
        queue.push("kept");
        queue.close();
        assert_eq!(queue.pop(), Some("kept"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_after_close_is_still_drained() {
        let queue = TaskQueue::new();
        queue.close();
        queue.push("late");
        assert_eq!(queue.pop(), Some("late"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn run_contained_swallows_panics() {
        let ran_after = Arc::new(AtomicUsize::new(0));
        run_contained(Box::new(|| panic!("boom")));
        let counter = Arc::clone(&ran_after);
        run_contained(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran_after.load(Ordering::SeqCst), 1);
    }
}
