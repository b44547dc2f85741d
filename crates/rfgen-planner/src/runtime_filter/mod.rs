//! Runtime filters: generated from hash join build sides, assigned to probe
//! side table scans, and shipped to the execution layer.
//!
//! Lifecycle: `generate` creates unassigned filters, `assign` links one to a
//! scan and moves it into the plan, `RuntimeFilter::detached_clone` snapshots
//! it for dispatch, and `to_wire_list` serializes snapshots.

mod assign;
mod explain;
mod filter;
mod generator;
pub mod wire;

pub use assign::assign;
pub use explain::explain_list;
pub use filter::{Endpoint, RuntimeFilter};
pub use generator::{equi_join_columns, generate};
pub use wire::{
    to_wire_list, ConvertContext, ExprToWire, PushdownClient, WireExpr, WireExprConverter,
    WireExprType, WireRuntimeFilter, WireRuntimeFilterMode, WireRuntimeFilterType,
};

pub(crate) use filter::write_columns;
