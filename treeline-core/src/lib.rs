//! Treeline core library.
//!
//! Interactive graph-building sessions, spanning-forest construction, and
//! the two serving architectures (Leader-Follower worker pool and staged
//! pipeline) that execute them.

mod graph;
mod mst;
mod orchestrator;
mod pipeline;
mod pool;
mod queue;
mod session;

pub use crate::{
    graph::{Graph, GraphEdge, GraphError, GraphErrorCode},
    mst::{MstAlgorithm, MstEngine, boruvka, prim},
    orchestrator::{WorkflowOutcome, run_pipelined, run_pooled},
    pipeline::{
        Pipeline, PipelineError, PipelineHandles, StageBarrier, StageGuard, StageHandle,
        StageOutcome, WorkflowStage,
    },
    pool::{PoolError, WorkerPool},
    session::{
        Connection, MAX_VERTICES, SessionError, SessionErrorCode, analyze, build_graph, build_mst,
        run_workflow,
    },
};
