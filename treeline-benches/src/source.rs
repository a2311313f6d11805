//! Seeded synthetic graphs for benchmark input.
//!
//! Every graph is connected by construction: a random spanning tree first,
//! then random chord edges on top. The same seed always yields the same
//! graph, so benchmark runs stay comparable.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use treeline_core::Graph;

use crate::error::BenchSetupError;

const MAX_WEIGHT: i64 = 1_000;

/// Configuration for synthetic graph generation.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of vertices in the graph.
    pub vertex_count: usize,
    /// Chord edges added on top of the spanning tree.
    pub extra_edges: usize,
    /// Seed for the generator.
    pub seed: u64,
}

/// Generates a connected weighted graph from `config`.
///
/// # Errors
/// Returns [`BenchSetupError`] when the vertex count is zero or the chord
/// budget exceeds the number of distinct vertex pairs left after the
/// spanning tree.
pub fn synthetic_graph(config: &SyntheticConfig) -> Result<Graph, BenchSetupError> {
    let SyntheticConfig {
        vertex_count,
        extra_edges,
        seed,
    } = *config;
    if vertex_count == 0 {
        return Err(BenchSetupError::ZeroValue {
            context: "vertex_count",
        });
    }
    let tree_edges = vertex_count - 1;
    let available = vertex_count * tree_edges / 2 - tree_edges;
    if extra_edges > available {
        return Err(BenchSetupError::EdgeBudgetExceeded {
            requested: extra_edges,
            available,
        });
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut graph = Graph::new(vertex_count);

    // Spanning tree: attach each vertex to a random earlier one.
    for vertex in 1..vertex_count {
        let anchor = rng.gen_range(0..vertex);
        graph.add_edge(anchor, vertex, rng.gen_range(1..=MAX_WEIGHT))?;
    }

    let mut placed = 0;
    while placed < extra_edges {
        let a = rng.gen_range(0..vertex_count);
        let b = rng.gen_range(0..vertex_count);
        if a == b || graph.edge(a, b).is_some() {
            continue;
        }
        graph.add_edge(a, b, rng.gen_range(1..=MAX_WEIGHT))?;
        placed += 1;
    }
    Ok(graph)
}
