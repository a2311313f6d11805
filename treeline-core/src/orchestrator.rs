//! Hands accepted connections to a serving architecture.
//!
//! [`run_pooled`] submits a client's whole workflow as one Leader-Follower
//! pool task; [`run_pipelined`] threads it through the staged pipeline as
//! chained continuations and blocks on the completion barrier. Both contain
//! every per-client failure: the abort is logged with its stable code, the
//! connection drops, and the serving threads live on.

use std::{
    io::{BufRead, Write},
    net::SocketAddr,
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    graph::Graph,
    mst::MstEngine,
    pipeline::{
        PipelineHandles, StageBarrier, StageGuard, StageHandle, StageOutcome, WorkflowStage,
    },
    pool::WorkerPool,
    session::{Connection, SessionError, analyze, build_graph, build_mst},
};

/// Terminal outcome of one client workflow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkflowOutcome {
    /// All three phases ran to completion and the report was flushed.
    Completed,
    /// The workflow aborted and the connection was dropped.
    Aborted {
        /// The phase that raised the abort.
        stage: WorkflowStage,
    },
}

/// Runs a client workflow on the Leader-Follower pool.
///
/// The connection is handed to one worker, which owns it for the entire
/// three-phase workflow; the call returns as soon as the task is queued, so
/// the accept loop never blocks on a slow client. Aborts are logged inside
/// the worker and end only that client's session.
pub fn run_pooled<R, W>(pool: &WorkerPool, mut connection: Connection<R, W>)
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    pool.submit(move || {
        let peer = connection.peer();
        match run_staged(&mut connection) {
            Ok(()) => info!(peer = ?peer, "client workflow completed"),
            Err((stage, err)) => log_stage_abort(peer, stage, &err),
        }
    });
}

/// Runs a client workflow across the staged pipeline and waits for it.
///
/// The connection is moved into the graph stage; each phase that succeeds
/// posts the next one as a continuation owning everything it needs, and the
/// connection is finally dropped inside the analyze stage once the report
/// has been flushed. The calling thread blocks on the completion barrier,
/// collecting stage outcomes in workflow order, and returns as soon as a
/// stage reports failure; an aborted stage posts no continuation, so later
/// stages never resolve.
pub fn run_pipelined<R, W>(
    handles: &PipelineHandles,
    connection: Connection<R, W>,
) -> WorkflowOutcome
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let peer = connection.peer();
    let barrier = Arc::new(StageBarrier::new());
    post_graph_stage(handles, Arc::clone(&barrier), connection);

    for stage in WorkflowStage::ALL {
        if barrier.wait(stage) == StageOutcome::Failed {
            return WorkflowOutcome::Aborted { stage };
        }
    }
    info!(peer = ?peer, "client workflow completed");
    WorkflowOutcome::Completed
}

fn post_graph_stage<R, W>(
    handles: &PipelineHandles,
    barrier: Arc<StageBarrier>,
    mut connection: Connection<R, W>,
) where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let mst_handle = handles.mst().clone();
    let analyze_handle = handles.analyze().clone();
    handles.graph().post(move || {
        let guard = StageGuard::new(Arc::clone(&barrier), WorkflowStage::Graph);
        match build_graph(&mut connection) {
            Ok(graph) => {
                post_mst_stage(&mst_handle, analyze_handle, barrier, connection, graph);
                guard.complete();
            }
            Err(err) => log_stage_abort(connection.peer(), WorkflowStage::Graph, &err),
        }
    });
}

fn post_mst_stage<R, W>(
    handle: &StageHandle,
    analyze_handle: StageHandle,
    barrier: Arc<StageBarrier>,
    mut connection: Connection<R, W>,
    graph: Graph,
) where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    handle.post(move || {
        let guard = StageGuard::new(Arc::clone(&barrier), WorkflowStage::Mst);
        match build_mst(&mut connection, &graph) {
            Ok(engine) => {
                post_analyze_stage(&analyze_handle, barrier, connection, engine);
                guard.complete();
            }
            Err(err) => log_stage_abort(connection.peer(), WorkflowStage::Mst, &err),
        }
    });
}

fn post_analyze_stage<R, W>(
    handle: &StageHandle,
    barrier: Arc<StageBarrier>,
    mut connection: Connection<R, W>,
    engine: MstEngine,
) where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    handle.post(move || {
        let guard = StageGuard::new(Arc::clone(&barrier), WorkflowStage::Analyze);
        match analyze(&mut connection, &engine) {
            Ok(()) => guard.complete(),
            Err(err) => log_stage_abort(connection.peer(), WorkflowStage::Analyze, &err),
        }
    });
}

fn run_staged<R: BufRead, W: Write>(
    connection: &mut Connection<R, W>,
) -> Result<(), (WorkflowStage, SessionError)> {
    let graph = build_graph(connection).map_err(|err| (WorkflowStage::Graph, err))?;
    let engine = build_mst(connection, &graph).map_err(|err| (WorkflowStage::Mst, err))?;
    analyze(connection, &engine).map_err(|err| (WorkflowStage::Analyze, err))
}

fn log_stage_abort(peer: Option<SocketAddr>, stage: WorkflowStage, err: &SessionError) {
    match err.graph_code() {
        Some(graph_code) => warn!(
            peer = ?peer,
            stage = stage.as_str(),
            code = err.code().as_str(),
            graph_code = graph_code.as_str(),
            error = %err,
            "client workflow aborted"
        ),
        None => warn!(
            peer = ?peer,
            stage = stage.as_str(),
            code = err.code().as_str(),
            error = %err,
            "client workflow aborted"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Cursor, Write},
        num::NonZeroUsize,
        sync::{Arc, Mutex},
        thread,
    };

    use rstest::rstest;

    use crate::{
        pipeline::{Pipeline, WorkflowStage},
        pool::WorkerPool,
        session::Connection,
    };

    use super::{WorkflowOutcome, run_pipelined, run_pooled};

    const HAPPY_SCRIPT: &str = "4\n4\n0 1 1\n1 2 2\n2 3 3\n0 3 10\nprim\n";

    /// Writer half the test can still read after the connection consumed it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            let bytes = self.0.lock().expect("buffer lock must not poison").clone();
            String::from_utf8(bytes).expect("transcript must be valid UTF-8")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("buffer lock must not poison")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer that starts refusing bytes once the trigger text has been
    /// written, standing in for a peer that vanished mid-report.
    struct FailAfter {
        buffer: SharedBuffer,
        trigger: &'static str,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.buffer.contents().contains(self.trigger) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
            }
            self.buffer.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn scripted(script: &str, buffer: &SharedBuffer) -> Connection<Cursor<Vec<u8>>, SharedBuffer> {
        Connection::new(Cursor::new(script.as_bytes().to_vec()), buffer.clone())
    }

    fn assert_full_report(transcript: &str) {
        assert!(transcript.contains("Total Weight: 6\n"), "{transcript}");
        assert!(transcript.contains("Longest Distance (e.g. 0->1): 1\n"));
        assert!(transcript.contains("Shortest Distance (e.g. 0->1): 1\n"));
        assert!(transcript.contains("Average Edge Count: 3.33\n"));
    }

    #[test]
    fn pooled_workflow_writes_the_full_report() {
        let pool = WorkerPool::new(NonZeroUsize::new(2).expect("non-zero"))
            .expect("worker pool must spawn");
        let buffer = SharedBuffer::default();
        run_pooled(&pool, scripted(HAPPY_SCRIPT, &buffer));
        pool.shutdown();
        assert_full_report(&buffer.contents());
    }

    #[test]
    fn pooled_abort_leaves_the_pool_serving_other_clients() {
        let pool = WorkerPool::new(NonZeroUsize::new(1).expect("non-zero"))
            .expect("worker pool must spawn");
        let poisoned = SharedBuffer::default();
        let healthy = SharedBuffer::default();
        run_pooled(&pool, scripted("nonsense\n", &poisoned));
        run_pooled(&pool, scripted(HAPPY_SCRIPT, &healthy));
        pool.shutdown();

        assert!(!poisoned.contents().contains("New graph created!"));
        assert_full_report(&healthy.contents());
    }

    #[test]
    fn pipelined_workflow_completes_and_writes_the_full_report() {
        let pipeline = Pipeline::new().expect("pipeline must spawn");
        let handles = pipeline.handles();
        let buffer = SharedBuffer::default();

        let outcome = run_pipelined(&handles, scripted(HAPPY_SCRIPT, &buffer));

        assert_eq!(outcome, WorkflowOutcome::Completed);
        assert_full_report(&buffer.contents());
        pipeline.shutdown();
    }

    #[rstest]
    #[case::graph_stage("nonsense\n", WorkflowStage::Graph)]
    #[case::mst_stage("2\n1\n0 1 5\n", WorkflowStage::Mst)]
    fn pipelined_abort_names_the_failing_stage(
        #[case] script: &str,
        #[case] expected: WorkflowStage,
    ) {
        let pipeline = Pipeline::new().expect("pipeline must spawn");
        let handles = pipeline.handles();
        let buffer = SharedBuffer::default();

        let outcome = run_pipelined(&handles, scripted(script, &buffer));

        assert_eq!(outcome, WorkflowOutcome::Aborted { stage: expected });
        pipeline.shutdown();
    }

    #[test]
    fn pipelined_abort_in_the_analyze_stage_is_contained() {
        let pipeline = Pipeline::new().expect("pipeline must spawn");
        let handles = pipeline.handles();
        let buffer = SharedBuffer::default();
        let writer = FailAfter {
            buffer: buffer.clone(),
            trigger: "----------Analysis----------",
        };
        let connection = Connection::new(Cursor::new(HAPPY_SCRIPT.as_bytes().to_vec()), writer);

        let outcome = run_pipelined(&handles, connection);

        assert_eq!(
            outcome,
            WorkflowOutcome::Aborted {
                stage: WorkflowStage::Analyze
            }
        );
        // The report broke off after its header.
        let transcript = buffer.contents();
        assert!(transcript.contains("----------Analysis----------\n"));
        assert!(!transcript.contains("Total Weight:"));
        pipeline.shutdown();
    }

    #[test]
    fn pipelined_abort_leaves_the_stages_serving_other_clients() {
        let pipeline = Pipeline::new().expect("pipeline must spawn");
        let handles = pipeline.handles();
        let poisoned = SharedBuffer::default();
        let healthy = SharedBuffer::default();

        let aborted = run_pipelined(&handles, scripted("2\nbroken\n", &poisoned));
        assert!(matches!(aborted, WorkflowOutcome::Aborted { .. }));

        let completed = run_pipelined(&handles, scripted(HAPPY_SCRIPT, &healthy));
        assert_eq!(completed, WorkflowOutcome::Completed);
        assert_full_report(&healthy.contents());
        pipeline.shutdown();
    }

    #[test]
    fn pipelined_clients_complete_concurrently() {
        let pipeline = Pipeline::new().expect("pipeline must spawn");
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let handles = pipeline.handles();
                let buffer = SharedBuffer::default();
                thread::spawn(move || {
                    let outcome = run_pipelined(&handles, scripted(HAPPY_SCRIPT, &buffer));
                    (outcome, buffer.contents())
                })
            })
            .collect();

        for waiter in waiters {
            let (outcome, transcript) = waiter.join().expect("waiter must not panic");
            assert_eq!(outcome, WorkflowOutcome::Completed);
            assert_full_report(&transcript);
        }
        pipeline.shutdown();
    }
}
