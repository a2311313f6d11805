//! Support library for the treeline server binary.
//!
//! Re-exports the CLI, logging, and server modules so doctests and
//! integration tests can exercise the serving loops without forking a
//! subprocess.

pub mod cli;
pub mod logging;
pub mod server;
