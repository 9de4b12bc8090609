//! Hierarchical phases and the runner that executes them by name.

pub mod phase;
pub mod runner;

pub use phase::{Phase, RunData};
pub use runner::Runner;
