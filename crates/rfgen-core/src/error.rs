use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical result for core, planner, and serializer code.
pub type Result<T> = std::result::Result<T, Error>;

/// Which expression list of a runtime filter an expression came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprSide {
    Source,
    Target,
}

impl fmt::Display for ExprSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprSide::Source => f.write_str("src"),
            ExprSide::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Planning error: {0}")]
    Plan(String),

    /// A planner invariant was broken upstream (e.g. an equi-join argument
    /// that is not a column reference).
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    #[error("failed to transform {side} expr {expr} to wire format in runtime filter")]
    Conversion { side: ExprSide, expr: String },
}
