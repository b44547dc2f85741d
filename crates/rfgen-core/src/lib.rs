#![forbid(unsafe_code)]
//! rfgen-core: ids, expressions, configuration, and errors shared by the
//! runtime filter planner and the exec-side wait machinery.
//!
//! No async, no I/O here.

pub mod config;
pub mod error;
pub mod expr;
pub mod id;
pub mod prelude;
pub mod schema;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
