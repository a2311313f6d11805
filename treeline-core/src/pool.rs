//! Leader-Follower worker pool.
//!
//! A fixed set of worker threads competes for tasks on one shared
//! [`TaskQueue`]. Each dequeued task is one client's entire three-stage
//! workflow, executed to completion without yielding to other tasks; two
//! clients never interleave within one worker, while distinct workers serve
//! distinct clients fully in parallel up to the pool size.

use std::{io, num::NonZeroUsize, sync::Arc, thread::JoinHandle};

use thiserror::Error;
use tracing::{debug, error};

use crate::queue::{Task, TaskQueue, run_contained};

/// Errors raised while standing up a [`WorkerPool`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PoolError {
    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread `{name}`: {source}")]
    Spawn {
        /// Name of the thread that could not be spawned.
        name: String,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
}

/// A bounded pool of worker threads draining one shared task queue.
///
/// Workers block while the queue is empty, execute exactly one task at a
/// time, and exit once the queue is closed and drained. Panicking tasks are
/// contained at the task boundary, so a single misbehaving client can never
/// take a shared worker thread down.
pub struct WorkerPool {
    size: NonZeroUsize,
    queue: Arc<TaskQueue<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` named worker threads, all idle until work arrives.
    ///
    /// # Errors
    /// Returns [`PoolError::Spawn`] when the operating system cannot create
    /// a worker thread; any workers spawned before the failure are shut down
    /// again before returning.
    pub fn new(size: NonZeroUsize) -> Result<Self, PoolError> {
        let queue = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(size.get());
        for index in 0..size.get() {
            let name = format!("treeline-worker-{index}");
            let worker_queue = Arc::clone(&queue);
            let spawned = std::thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&worker_queue));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    queue.close();
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(PoolError::Spawn { name, source });
                }
            }
        }
        debug!(pool_size = size.get(), "worker pool started");
        Ok(Self {
            size,
            queue,
            workers,
        })
    }

    /// Returns the number of worker threads fixed at construction.
    #[must_use]
    #[rustfmt::skip]
    pub fn size(&self) -> NonZeroUsize { self.size }

    /// Enqueues a task and wakes one idle worker.
    ///
    /// Safe to call concurrently from multiple producers. Tasks submitted
    /// after [`WorkerPool::shutdown`] began are still drained before the
    /// workers exit.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        let depth = self.queue.push(Box::new(task));
        debug!(queue_depth = depth, "task queued on worker pool");
    }

    /// Closes the queue, drains remaining tasks, and joins every worker.
    ///
    /// Dropping the pool performs the same teardown; the explicit form
    /// exists so callers can sequence it against other teardown steps.
    pub fn shutdown(mut self) {
        self.shutdown_workers();
    }

    fn shutdown_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.close();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                // run_contained should make this unreachable; a worker that
                // still died panicked outside any task.
                error!("worker thread terminated by panic");
            }
        }
        debug!("worker pool drained and joined");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_workers();
    }
}

fn worker_loop(queue: &TaskQueue<Task>) {
    debug!("worker waiting for tasks");
    while let Some(task) = queue.pop() {
        run_contained(task);
    }
    debug!("worker exiting");
}
