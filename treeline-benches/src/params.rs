//! Benchmark parameter types.
//!
//! Groups related benchmark parameters into structs so the Criterion
//! benchmark identifiers stay readable across runs.

use std::fmt;

/// Parameters for a spanning-strategy or analytics benchmark run.
#[derive(Clone, Debug)]
pub struct StrategyBenchParams {
    /// Number of vertices in the graph.
    pub vertex_count: usize,
    /// Chord edges added on top of the spanning tree.
    pub extra_edges: usize,
}

impl fmt::Display for StrategyBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},extra={}", self.vertex_count, self.extra_edges)
    }
}
