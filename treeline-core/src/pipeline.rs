//! Staged pipeline: three single-worker active objects plus the per-client
//! completion barrier.
//!
//! Each [`StageExecutor`] owns one queue and one dedicated worker thread, so
//! tasks within a stage are strictly serialized while the three stages run in
//! parallel with each other across clients. A client's workflow is threaded
//! through the stages as chained continuations; the [`StageBarrier`] lets the
//! connection orchestrator observe, in stage order, that every stage finished
//! (or where the workflow aborted).

use std::{
    io,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::JoinHandle,
};

use thiserror::Error;
use tracing::{debug, info};

use crate::queue::{Task, TaskQueue, run_contained};

/// Errors raised while standing up a [`Pipeline`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The operating system refused to spawn a stage worker thread.
    #[error("failed to spawn stage thread `{name}`: {source}")]
    Spawn {
        /// Name of the thread that could not be spawned.
        name: String,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
}

/// The three ordered stages of a client workflow.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WorkflowStage {
    /// Build the graph from transport input.
    Graph,
    /// Build the spanning engine from the finished graph.
    Mst,
    /// Compute and emit the analytics report.
    Analyze,
}

impl WorkflowStage {
    /// All stages in workflow order.
    pub const ALL: [Self; 3] = [Self::Graph, Self::Mst, Self::Analyze];

    /// Returns the stage label used on logging surfaces and thread names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Mst => "mst",
            Self::Analyze => "analyze",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Graph => 0,
            Self::Mst => 1,
            Self::Analyze => 2,
        }
    }
}

/// A single-worker executor: one queue, one dedicated thread.
///
/// The worker blocks while the queue is empty, executes tasks one at a time
/// in post order, and exits once the queue is closed and drained. Task panics
/// are contained at the task boundary.
struct StageExecutor {
    stage: WorkflowStage,
    queue: Arc<TaskQueue<Task>>,
    worker: Option<JoinHandle<()>>,
}

impl StageExecutor {
    fn new(stage: WorkflowStage) -> Result<Self, PipelineError> {
        let queue = Arc::new(TaskQueue::new());
        let name = format!("treeline-stage-{}", stage.as_str());
        let worker_queue = Arc::clone(&queue);
        let worker = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(stage = stage.as_str(), "stage worker started");
                while let Some(task) = worker_queue.pop() {
                    run_contained(task);
                }
                debug!(stage = stage.as_str(), "stage worker exiting");
            })
            .map_err(|source| PipelineError::Spawn { name, source })?;
        Ok(Self {
            stage,
            queue,
            worker: Some(worker),
        })
    }

    fn handle(&self) -> StageHandle {
        StageHandle {
            stage: self.stage,
            queue: Arc::clone(&self.queue),
        }
    }

    /// Closes the queue, drains it, and joins the worker. Idempotent.
    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.queue.close();
        if worker.join().is_err() {
            tracing::error!(stage = self.stage.as_str(), "stage worker terminated by panic");
        }
    }
}

impl Drop for StageExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clonable posting surface for one stage.
///
/// Continuation closures own a handle to the stage they chain into, so a
/// posted task needs no reference back into the posting stack frame.
#[derive(Clone)]
pub struct StageHandle {
    stage: WorkflowStage,
    queue: Arc<TaskQueue<Task>>,
}

impl StageHandle {
    /// Returns the stage this handle posts into.
    #[must_use]
    #[rustfmt::skip]
    pub fn stage(&self) -> WorkflowStage { self.stage }

    /// Enqueues a task on the stage and wakes its worker.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        let depth = self.queue.push(Box::new(task));
        debug!(
            stage = self.stage.as_str(),
            queue_depth = depth,
            "stage task queued"
        );
    }
}

/// The set of stage handles a connection workflow posts through.
#[derive(Clone)]
pub struct PipelineHandles {
    graph: StageHandle,
    mst: StageHandle,
    analyze: StageHandle,
}

impl PipelineHandles {
    /// Handle for the graph-build stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn graph(&self) -> &StageHandle { &self.graph }

    /// Handle for the MST-build stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn mst(&self) -> &StageHandle { &self.mst }

    /// Handle for the analytics stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn analyze(&self) -> &StageHandle { &self.analyze }
}

/// The three stage executors serving every connection for the server's
/// lifetime.
///
/// Within one stage, tasks for different connections are strictly
/// serialized; across stages, different clients' work proceeds in parallel.
pub struct Pipeline {
    // Field order is teardown order: stopping the stages in workflow order
    // lets continuations posted during a drain still reach the next stage.
    graph: StageExecutor,
    mst: StageExecutor,
    analyze: StageExecutor,
}

impl Pipeline {
    /// Spawns the three stage workers, all idle until work arrives.
    ///
    /// # Errors
    /// Returns [`PipelineError::Spawn`] when the operating system cannot
    /// create a stage thread; stages spawned before the failure are shut
    /// down again before returning.
    pub fn new() -> Result<Self, PipelineError> {
        let pipeline = Self {
            graph: StageExecutor::new(WorkflowStage::Graph)?,
            mst: StageExecutor::new(WorkflowStage::Mst)?,
            analyze: StageExecutor::new(WorkflowStage::Analyze)?,
        };
        debug!("pipeline stages started");
        Ok(pipeline)
    }

    /// Returns a clonable set of posting handles for the three stages.
    #[must_use]
    pub fn handles(&self) -> PipelineHandles {
        PipelineHandles {
            graph: self.graph.handle(),
            mst: self.mst.handle(),
            analyze: self.analyze.handle(),
        }
    }

    /// Stops the stages in workflow order and joins their workers.
    ///
    /// The graph stage is stopped and joined first, so any stage-2
    /// continuation it posts while draining is queued before the MST stage
    /// closes, and likewise for stage 3. Dropping the pipeline performs the
    /// same ordered teardown.
    pub fn shutdown(mut self) {
        self.graph.shutdown();
        self.mst.shutdown();
        self.analyze.shutdown();
        info!("pipeline stages drained and joined");
    }
}

/// Outcome of one stage of a client workflow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StageOutcome {
    /// The stage ran to completion.
    Completed,
    /// The stage aborted the workflow.
    Failed,
}

/// Per-connection completion barrier over the three workflow stages.
///
/// Stage closures record their outcome here; the connection orchestrator
/// blocks on each stage in workflow order. One mutex guards all three slots
/// and one condition variable signals every update.
pub struct StageBarrier {
    slots: Mutex<[Option<StageOutcome>; 3]>,
    done: Condvar,
}

impl Default for StageBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl StageBarrier {
    /// Creates a barrier with all three stages pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new([None; 3]),
            done: Condvar::new(),
        }
    }

    /// Records that `stage` ran to completion and wakes the waiter.
    pub fn complete(&self, stage: WorkflowStage) {
        self.mark(stage, StageOutcome::Completed);
    }

    /// Records that `stage` aborted the workflow and wakes the waiter.
    pub fn fail(&self, stage: WorkflowStage) {
        self.mark(stage, StageOutcome::Failed);
    }

    /// Blocks until `stage` has recorded an outcome, and returns it.
    pub fn wait(&self, stage: WorkflowStage) -> StageOutcome {
        let mut slots = self.lock_slots();
        loop {
            if let Some(outcome) = slots[stage.index()] {
                return outcome;
            }
            slots = self
                .done
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn mark(&self, stage: WorkflowStage, outcome: StageOutcome) {
        {
            let mut slots = self.lock_slots();
            slots[stage.index()] = Some(outcome);
        }
        self.done.notify_all();
    }

    fn lock_slots(&self) -> MutexGuard<'_, [Option<StageOutcome>; 3]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a stage failed on drop unless it was explicitly completed.
///
/// Stage closures arm one of these before doing any work, so the barrier
/// resolves even when the closure panics and the executor contains the
/// panic; the orchestrator must never wait forever on a dead workflow.
pub struct StageGuard {
    barrier: Arc<StageBarrier>,
    stage: WorkflowStage,
    armed: bool,
}

impl StageGuard {
    /// Arms a guard for `stage` against `barrier`.
    #[must_use]
    pub fn new(barrier: Arc<StageBarrier>, stage: WorkflowStage) -> Self {
        Self {
            barrier,
            stage,
            armed: true,
        }
    }

    /// Records completion and disarms the guard.
    pub fn complete(mut self) {
        self.armed = false;
        self.barrier.complete(self.stage);
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        if self.armed {
            self.barrier.fail(self.stage);
        }
    }
}
