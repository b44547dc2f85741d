//! rfgen: runtime filter generation for hash join plans.
//!
//! Facade over the workspace crates so integration tests and embedders can
//! depend on a single package.

pub use rfgen_core;
pub use rfgen_exec;
pub use rfgen_planner;

pub use rfgen_core::prelude::*;
