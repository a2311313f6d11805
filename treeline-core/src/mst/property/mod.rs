//! Property-based tests for the spanning strategies.
//!
//! Verifies that Prim and Borůvka agree with a sequential Kruskal total
//! across random graph shapes, and that every produced forest satisfies the
//! structural invariants: canonical edges drawn from the input graph, no
//! cycles, and one spanning tree per input component.

mod strategies;
