//! Benchmark setup error type.
//!
//! Aggregates the failures that may arise while preparing benchmark input
//! so that setup functions can propagate them with `?` instead of using
//! `.expect()`.

use treeline_core::GraphError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic graph construction produced an invalid edge.
    #[error("graph construction failed: {0}")]
    Graph(#[from] GraphError),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// A description of the parameter that was unexpectedly zero.
        context: &'static str,
    },
    /// More chord edges were requested than distinct vertex pairs remain.
    #[error("requested {requested} extra edges but only {available} pairs remain")]
    EdgeBudgetExceeded {
        /// Extra edges the configuration asked for.
        requested: usize,
        /// Vertex pairs still unused after the spanning tree.
        available: usize,
    },
}
