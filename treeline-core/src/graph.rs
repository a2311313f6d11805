//! Weighted undirected graph storage.
//!
//! A [`Graph`] owns a symmetric adjacency-weight matrix with a fixed vertex
//! count. Cells hold `0` for "no edge" and a strictly positive weight
//! otherwise. The derived edge count tracks unordered `u < v` pairs only.

use std::cmp::Ordering;

use thiserror::Error;

/// Errors produced by [`Graph`] mutations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GraphError {
    /// An operation referenced a vertex outside `[0, vertex_count)`.
    #[error("vertex {vertex} is out of range for a graph with {vertex_count} vertices")]
    VertexOutOfRange {
        /// The offending vertex index.
        vertex: usize,
        /// The number of vertices in the graph.
        vertex_count: usize,
    },
    /// An edge was added with a zero or negative weight.
    #[error("edge weight must be positive (got {weight})")]
    NonPositiveWeight {
        /// The rejected weight value.
        weight: i64,
    },
}

impl GraphError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> GraphErrorCode {
        match self {
            Self::VertexOutOfRange { .. } => GraphErrorCode::VertexOutOfRange,
            Self::NonPositiveWeight { .. } => GraphErrorCode::NonPositiveWeight,
        }
    }
}

/// Machine-readable error codes for [`GraphError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GraphErrorCode {
    /// An operation referenced a vertex outside `[0, vertex_count)`.
    VertexOutOfRange,
    /// An edge was added with a zero or negative weight.
    NonPositiveWeight,
}

impl GraphErrorCode {
    /// Returns the symbolic identifier used on logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VertexOutOfRange => "GRAPH_VERTEX_OUT_OF_RANGE",
            Self::NonPositiveWeight => "GRAPH_NON_POSITIVE_WEIGHT",
        }
    }
}

/// A single undirected edge in canonical form (`source < target`).
///
/// The `sequence` field is the edge's position in the row-major matrix scan
/// performed by [`Graph::edge_list`]. Strategies use it as a stable
/// tie-break when weights are equal, which keeps every spanning computation
/// deterministic for identical input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GraphEdge {
    source: usize,
    target: usize,
    weight: i64,
    sequence: u64,
}

impl GraphEdge {
    pub(crate) const fn new(source: usize, target: usize, weight: i64, sequence: u64) -> Self {
        Self {
            source,
            target,
            weight,
            sequence,
        }
    }

    /// Returns the smaller endpoint id.
    #[must_use]
    #[rustfmt::skip]
    pub fn source(&self) -> usize { self.source }

    /// Returns the larger endpoint id.
    #[must_use]
    #[rustfmt::skip]
    pub fn target(&self) -> usize { self.target }

    /// Returns the edge weight.
    #[must_use]
    #[rustfmt::skip]
    pub fn weight(&self) -> i64 { self.weight }

    /// Returns the deterministic tie-break sequence associated with the edge.
    #[must_use]
    #[rustfmt::skip]
    pub fn sequence(&self) -> u64 { self.sequence }
}

impl Ord for GraphEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.sequence.cmp(&other.sequence))
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for GraphEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A weighted undirected graph over a fixed set of vertices.
///
/// # Examples
/// ```
/// use treeline_core::Graph;
///
/// let mut graph = Graph::new(3);
/// graph.add_edge(0, 1, 4).expect("edge is valid");
/// graph.add_edge(1, 2, 2).expect("edge is valid");
/// assert_eq!(graph.edge_count(), 2);
/// assert_eq!(graph.edge(0, 1), Some(4));
/// assert_eq!(graph.edge(0, 2), None);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Graph {
    vertex_count: usize,
    edge_count: usize,
    weights: Vec<Vec<i64>>,
}

impl Graph {
    /// Creates a graph with `vertex_count` vertices and no edges.
    ///
    /// A zero-vertex graph is valid; every mutation on it fails with
    /// [`GraphError::VertexOutOfRange`].
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            edge_count: 0,
            weights: vec![vec![0; vertex_count]; vertex_count],
        }
    }

    /// Returns the number of vertices fixed at construction.
    #[must_use]
    #[rustfmt::skip]
    pub fn vertex_count(&self) -> usize { self.vertex_count }

    /// Returns the number of distinct undirected edges currently present.
    #[must_use]
    #[rustfmt::skip]
    pub fn edge_count(&self) -> usize { self.edge_count }

    /// Returns the full symmetric weight matrix.
    #[must_use]
    pub fn weights(&self) -> &[Vec<i64>] {
        &self.weights
    }

    /// Returns the weight of the edge between `u` and `v`, or `None` when
    /// either index is out of range or no edge is present.
    #[must_use]
    pub fn edge(&self, u: usize, v: usize) -> Option<i64> {
        let weight = *self.weights.get(u)?.get(v)?;
        (weight != 0).then_some(weight)
    }

    /// Inserts or re-weights the undirected edge between `u` and `v`.
    ///
    /// Both matrix cells are written symmetrically. The edge count grows
    /// only when the unordered pair had no prior edge, so re-weighting an
    /// existing edge never double-counts. Diagonal writes (`u == v`) are
    /// accepted but never counted: `edge_count` tracks `u < v` pairs only.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfRange`] when either endpoint is
    /// outside `[0, vertex_count)` and [`GraphError::NonPositiveWeight`]
    /// when `weight <= 0`.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: i64) -> Result<(), GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        if weight <= 0 {
            return Err(GraphError::NonPositiveWeight { weight });
        }

        if u != v && self.weights[u][v] == 0 {
            self.edge_count += 1;
        }
        self.weights[u][v] = weight;
        self.weights[v][u] = weight;
        Ok(())
    }

    /// Removes the undirected edge between `u` and `v`.
    ///
    /// Removing an absent edge is a no-op, not an error.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfRange`] when either endpoint is
    /// outside `[0, vertex_count)`.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> Result<(), GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;

        if self.weights[u][v] != 0 {
            self.weights[u][v] = 0;
            self.weights[v][u] = 0;
            if u != v {
                self.edge_count -= 1;
            }
        }
        Ok(())
    }

    /// Returns every edge in canonical `source < target` form.
    ///
    /// Sequence indices follow the row-major scan order, so two calls on the
    /// same graph always yield identical lists. This is the representation
    /// both spanning strategies consume.
    #[must_use]
    pub fn edge_list(&self) -> Vec<GraphEdge> {
        let mut edges = Vec::new();
        for u in 0..self.vertex_count {
            for v in (u + 1)..self.vertex_count {
                let weight = self.weights[u][v];
                if weight != 0 {
                    edges.push(GraphEdge::new(u, v, weight, edges.len() as u64));
                }
            }
        }
        edges
    }

    fn check_vertex(&self, vertex: usize) -> Result<(), GraphError> {
        if vertex >= self.vertex_count {
            return Err(GraphError::VertexOutOfRange {
                vertex,
                vertex_count: self.vertex_count,
            });
        }
        Ok(())
    }
}
