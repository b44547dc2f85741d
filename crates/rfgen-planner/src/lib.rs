#![forbid(unsafe_code)]
//! rfgen-planner: physical plan arena → runtime filter generation and
//! assignment → explain text and executor wire messages.
//!
//! Design:
//! - Operators live in an arena keyed by `OpId`; runtime filters refer to
//!   their build join and target scan by id (`runtime_filter::Endpoint`).
//! - This crate adds:
//!     * the runtime filter lifecycle (`runtime_filter`)
//!     * a plan pass that places filters on probe side scans (`builder`)
//!     * explain output (`format`) and executor messages (`dispatch`)
//!     * a YAML plan DSL for tools and tests (`dsl`)
//!
//! NOTE: Byte-level encoding of wire messages is left to the transport.

pub mod builder;
pub mod dispatch;
pub mod dsl;
pub mod format;
pub mod physical;
pub mod runtime_filter;

pub use builder::generate_runtime_filters;
pub use dispatch::{snapshot_runtime_filters, to_wire_executors, WireExecutor, WireExecutorKind};
pub use dsl::yaml::{apply_plan_config, parse_yaml_plan, ParsedPlan, PlanConfig};
pub use format::explain_plan;
pub use physical::{
    BuildSide, Exchange, ExchangeKind, HashJoin, JoinType, PhysicalOperator, PhysicalPlan,
    Projection, Selection, TableScan,
};
pub use runtime_filter::{
    assign, equi_join_columns, explain_list, generate, to_wire_list, ConvertContext, Endpoint,
    ExprToWire, PushdownClient, RuntimeFilter, WireExprConverter, WireRuntimeFilter,
};
