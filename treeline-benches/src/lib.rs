//! Benchmark support crate for treeline.
//!
//! Provides seeded synthetic graphs and parameter types used by Criterion
//! benchmarks for the spanning strategies and the analytics pass.

pub mod error;
pub mod params;
pub mod source;
