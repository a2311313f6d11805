//! Spanning-forest construction and graph analytics.
//!
//! [`MstEngine::build`] snapshots a [`Graph`], runs the selected spanning
//! strategy over its canonical edge list, and serves the figures the report
//! surface prints: total spanning weight, shortest and longest breadth-first
//! distances, and the mean pairwise distance. All distance analytics read
//! the original adjacency matrix, not the spanning edges.

mod boruvka;
mod prim;
mod union_find;

#[cfg(test)]
mod property;

pub use self::boruvka::boruvka;
pub use self::prim::prim;

use std::{collections::VecDeque, fmt};

use tracing::debug;

use crate::graph::{Graph, GraphEdge};

/// Spanning strategy selector.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MstAlgorithm {
    /// Grow a frontier from each unvisited root over a binary heap.
    #[default]
    Prim,
    /// Merge components along their cheapest outgoing edges in rounds.
    Boruvka,
}

impl MstAlgorithm {
    /// Parses a client-supplied strategy token.
    ///
    /// Matching trims surrounding whitespace and ignores case; the accented
    /// spelling `borúvka` is accepted. Returns `None` for every other token
    /// so the caller owns the fallback policy.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "prim" => Some(Self::Prim),
            "boruvka" | "borúvka" => Some(Self::Boruvka),
            _ => None,
        }
    }

    /// Returns the lowercase strategy name used on protocol and logging
    /// surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prim => "prim",
            Self::Boruvka => "boruvka",
        }
    }
}

impl fmt::Display for MstAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed spanning forest plus the analytics over its source graph.
///
/// The engine copies the graph's weight matrix at construction, so later
/// mutation of the graph can never shift an already-computed report.
/// Analytics are pure queries and may be repeated.
///
/// # Examples
/// ```
/// use treeline_core::{Graph, MstAlgorithm, MstEngine};
///
/// let mut graph = Graph::new(3);
/// graph.add_edge(0, 1, 1).expect("edge is valid");
/// graph.add_edge(1, 2, 2).expect("edge is valid");
/// graph.add_edge(0, 2, 4).expect("edge is valid");
///
/// let engine = MstEngine::build(&graph, MstAlgorithm::Prim);
/// assert_eq!(engine.total_weight(), 3);
/// assert!(engine.is_tree());
/// ```
#[derive(Clone, Debug)]
pub struct MstEngine {
    vertex_count: usize,
    weights: Vec<Vec<i64>>,
    algorithm: MstAlgorithm,
    edges: Vec<GraphEdge>,
}

impl MstEngine {
    /// Runs `algorithm` over the graph's canonical edge list.
    #[must_use]
    pub fn build(graph: &Graph, algorithm: MstAlgorithm) -> Self {
        let candidates = graph.edge_list();
        let edges = match algorithm {
            MstAlgorithm::Prim => prim(graph.vertex_count(), &candidates),
            MstAlgorithm::Boruvka => boruvka(graph.vertex_count(), &candidates),
        };
        debug!(
            algorithm = algorithm.as_str(),
            vertex_count = graph.vertex_count(),
            candidate_edges = candidates.len(),
            spanning_edges = edges.len(),
            "spanning forest built"
        );
        Self {
            vertex_count: graph.vertex_count(),
            weights: graph.weights().to_vec(),
            algorithm,
            edges,
        }
    }

    /// Returns the strategy that built this forest.
    #[must_use]
    #[rustfmt::skip]
    pub fn algorithm(&self) -> MstAlgorithm { self.algorithm }

    /// Returns the vertex count of the originating graph.
    #[must_use]
    #[rustfmt::skip]
    pub fn vertex_count(&self) -> usize { self.vertex_count }

    /// Returns the spanning edges in the order the strategy selected them.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[GraphEdge] { &self.edges }

    /// Returns the sum of the spanning edge weights.
    #[must_use]
    pub fn total_weight(&self) -> i64 {
        self.edges
            .iter()
            .fold(0_i64, |total, edge| total.saturating_add(edge.weight()))
    }

    /// Returns the number of connected components the forest spans.
    #[must_use]
    pub fn component_count(&self) -> usize {
        // A forest over n vertices with e edges has n - e components.
        self.vertex_count.saturating_sub(self.edges.len())
    }

    /// Returns `true` when the forest spans a single connected component.
    #[must_use]
    pub fn is_tree(&self) -> bool {
        self.component_count() == 1
    }

    /// Returns the weighted distance along the breadth-first discovery path
    /// from `from` to `to`, or `-1` when `to` is unreachable.
    ///
    /// Each vertex keeps the distance recorded when it is first discovered.
    /// The scan follows breadth-first order over the original adjacency
    /// matrix, so a cheaper path discovered later never lowers the figure.
    ///
    /// # Panics
    /// Panics when `from` or `to` is not less than
    /// [`vertex_count`](Self::vertex_count); callers validate endpoints
    /// before querying.
    #[must_use]
    pub fn shortest_distance(&self, from: usize, to: usize) -> i64 {
        self.bfs_distance(from, to, false)
    }

    /// Returns the longest weighted distance any breadth-first discovery
    /// path can justify from `from` to `to`, or `-1` when `to` is
    /// unreachable.
    ///
    /// While a vertex sits in the frontier queue, a costlier offer from
    /// another already-finalized neighbour raises its recorded distance.
    /// Once the vertex is dequeued the figure is final and is never
    /// re-opened, so this reports the weighted depth of the breadth-first
    /// scan rather than a true longest simple path. The figure coincides
    /// with [`shortest_distance`](Self::shortest_distance) whenever no
    /// queued vertex receives a second, costlier offer.
    ///
    /// # Panics
    /// Panics when `from` or `to` is not less than
    /// [`vertex_count`](Self::vertex_count); callers validate endpoints
    /// before querying.
    #[must_use]
    pub fn longest_distance(&self, from: usize, to: usize) -> i64 {
        self.bfs_distance(from, to, true)
    }

    /// Returns the mean shortest-path distance over all reachable unordered
    /// vertex pairs, or `0.0` when no pair is reachable.
    ///
    /// Distances come from a Floyd-Warshall pass over the original matrix.
    /// Absent edges are infinite, never zero-cost, and the diagonal is zero
    /// even when a self-loop weight is stored.
    #[must_use]
    pub fn average_edge_count(&self) -> f64 {
        let n = self.vertex_count;
        let mut shortest: Vec<Vec<Option<i64>>> = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    shortest[i][j] = Some(0);
                } else if self.weights[i][j] != 0 {
                    shortest[i][j] = Some(self.weights[i][j]);
                }
            }
        }

        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let Some(through) = shortest[i][k]
                        .zip(shortest[k][j])
                        .map(|(left, right)| left.saturating_add(right))
                    else {
                        continue;
                    };
                    if shortest[i][j].is_none_or(|direct| through < direct) {
                        shortest[i][j] = Some(through);
                    }
                }
            }
        }

        let mut total = 0_i64;
        let mut pairs = 0_usize;
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(distance) = shortest[i][j] {
                    total = total.saturating_add(distance);
                    pairs += 1;
                }
            }
        }

        if pairs == 0 {
            0.0
        } else {
            total as f64 / pairs as f64
        }
    }

    fn bfs_distance(&self, from: usize, to: usize, raise_queued: bool) -> i64 {
        assert!(
            from < self.vertex_count && to < self.vertex_count,
            "distance endpoints must be valid vertex indices"
        );

        let mut distance = vec![-1_i64; self.vertex_count];
        let mut finalized = vec![false; self.vertex_count];
        let mut frontier = VecDeque::new();
        distance[from] = 0;
        frontier.push_back(from);

        while let Some(vertex) = frontier.pop_front() {
            finalized[vertex] = true;
            for neighbour in 0..self.vertex_count {
                let weight = self.weights[vertex][neighbour];
                if weight == 0 || neighbour == vertex {
                    continue;
                }
                let offer = distance[vertex].saturating_add(weight);
                if distance[neighbour] == -1 {
                    distance[neighbour] = offer;
                    frontier.push_back(neighbour);
                } else if raise_queued && !finalized[neighbour] && offer > distance[neighbour] {
                    distance[neighbour] = offer;
                }
            }
        }

        distance[to]
    }
}
