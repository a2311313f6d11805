//! Sequential union-find used for spanning-forest cycle detection.
//!
//! `find` applies grandparent path-halving and `union` merges by rank, so
//! parent chains stay short without a second compression pass. A workflow
//! owns its engine exclusively, so no locking is needed here.

pub(super) struct UnionFind {
    parents: Vec<usize>,
    ranks: Vec<usize>,
    components: usize,
}

impl UnionFind {
    pub(super) fn new(vertex_count: usize) -> Self {
        Self {
            parents: (0..vertex_count).collect(),
            ranks: vec![0; vertex_count],
            components: vertex_count,
        }
    }

    pub(super) fn components(&self) -> usize {
        self.components
    }

    /// Merges the sets containing `left` and `right`.
    ///
    /// Returns `false` when both already belong to the same set.
    pub(super) fn union(&mut self, left: usize, right: usize) -> bool {
        let left_root = self.find(left);
        let right_root = self.find(right);

        if left_root == right_root {
            return false;
        }

        let left_rank = self.ranks[left_root];
        let right_rank = self.ranks[right_root];
        let (parent, child) = choose_parent_child(left_root, right_root, left_rank, right_rank);

        self.parents[child] = parent;
        if left_rank == right_rank {
            self.ranks[parent] += 1;
        }
        self.components -= 1;
        true
    }

    pub(super) fn find(&mut self, node: usize) -> usize {
        let mut current = node;
        loop {
            let parent = self.parents[current];
            if parent == current {
                return current;
            }

            let grandparent = self.parents[parent];
            if grandparent != parent {
                self.parents[current] = grandparent;
            }

            current = parent;
        }
    }
}

fn choose_parent_child(
    left_root: usize,
    right_root: usize,
    left_rank: usize,
    right_rank: usize,
) -> (usize, usize) {
    if left_rank > right_rank {
        return (left_root, right_root);
    }
    if right_rank > left_rank {
        return (right_root, left_root);
    }

    if left_root <= right_root {
        (left_root, right_root)
    } else {
        (right_root, left_root)
    }
}
