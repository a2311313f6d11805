//! Borůvka's algorithm over repeated cheapest-edge rounds.

use crate::graph::GraphEdge;

use super::union_find::UnionFind;

/// Computes a minimum-weight spanning forest by repeatedly merging every
/// component along its cheapest outgoing edge.
///
/// Each round scans the edge list once, records the cheapest edge leaving
/// each component, then applies the recorded edges through a union-find
/// that rejects cycles. The full [`GraphEdge`] ordering breaks weight ties,
/// which keeps the merge choices deterministic and acyclic. The loop ends
/// when a round merges nothing, which covers disconnected inputs.
///
/// # Panics
/// Panics when an edge references a vertex `>= vertex_count`. Edge lists
/// produced by [`Graph::edge_list`](crate::Graph::edge_list) always satisfy
/// the bound.
#[must_use]
pub fn boruvka(vertex_count: usize, edges: &[GraphEdge]) -> Vec<GraphEdge> {
    let mut union_find = UnionFind::new(vertex_count);
    let mut forest = Vec::with_capacity(vertex_count.saturating_sub(1));

    loop {
        let mut cheapest: Vec<Option<GraphEdge>> = vec![None; vertex_count];
        for edge in edges {
            let left_root = union_find.find(edge.source());
            let right_root = union_find.find(edge.target());
            if left_root == right_root {
                continue;
            }
            for root in [left_root, right_root] {
                if cheapest[root].is_none_or(|best| *edge < best) {
                    cheapest[root] = Some(*edge);
                }
            }
        }

        let mut merged = false;
        for candidate in cheapest.into_iter().flatten() {
            // Two components may nominate the same edge; the union call
            // deduplicates by rejecting the second attempt.
            if union_find.union(candidate.source(), candidate.target()) {
                forest.push(candidate);
                merged = true;
            }
        }

        // A single component is already spanned; merging nothing means the
        // remaining components are mutually unreachable.
        if !merged || union_find.components() == 1 {
            return forest;
        }
    }
}
