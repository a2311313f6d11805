//! Prim's algorithm over a binary heap of frontier edges.

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::graph::GraphEdge;

/// Computes a minimum-weight spanning forest by growing a frontier from
/// each not-yet-visited root in vertex order.
///
/// Every time a vertex joins the tree, its incident edges towards unvisited
/// vertices are offered to the heap; the cheapest crossing edge wins each
/// round. Equal weights resolve through the full [`GraphEdge`] ordering, so
/// the output is deterministic for a given edge list. Edges are returned in
/// selection order.
///
/// # Panics
/// Panics when an edge references a vertex `>= vertex_count`. Edge lists
/// produced by [`Graph::edge_list`](crate::Graph::edge_list) always satisfy
/// the bound.
#[must_use]
pub fn prim(vertex_count: usize, edges: &[GraphEdge]) -> Vec<GraphEdge> {
    let mut adjacency: Vec<Vec<GraphEdge>> = vec![Vec::new(); vertex_count];
    for edge in edges {
        adjacency[edge.source()].push(*edge);
        adjacency[edge.target()].push(*edge);
    }

    let mut in_tree = vec![false; vertex_count];
    let mut frontier: BinaryHeap<Reverse<GraphEdge>> = BinaryHeap::new();
    let mut forest = Vec::with_capacity(vertex_count.saturating_sub(1));

    for root in 0..vertex_count {
        if in_tree[root] {
            continue;
        }
        in_tree[root] = true;
        offer_incident_edges(&adjacency, &in_tree, root, &mut frontier);

        while let Some(Reverse(edge)) = frontier.pop() {
            let next = if in_tree[edge.source()] {
                edge.target()
            } else {
                edge.source()
            };
            // Both endpoints may have joined since the edge was offered.
            if in_tree[next] {
                continue;
            }

            in_tree[next] = true;
            forest.push(edge);
            offer_incident_edges(&adjacency, &in_tree, next, &mut frontier);
        }
    }

    forest
}

fn offer_incident_edges(
    adjacency: &[Vec<GraphEdge>],
    in_tree: &[bool],
    vertex: usize,
    frontier: &mut BinaryHeap<Reverse<GraphEdge>>,
) {
    for edge in &adjacency[vertex] {
        let other = if edge.source() == vertex {
            edge.target()
        } else {
            edge.source()
        };
        if !in_tree[other] {
            frontier.push(Reverse(*edge));
        }
    }
}
