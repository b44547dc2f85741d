//! Turn a physical plan into executor messages for the execution layer.
//!
//! Each executor carries the serialized detached clones of its operator's
//! runtime filters: outbound filters on hash joins, inbound filters on table
//! scans.

use rfgen_core::error::{Error, Result};
use rfgen_core::id::FilterId;
use serde::{Deserialize, Serialize};

use crate::physical::{BuildSide, ExchangeKind, JoinType, PhysicalOperator, PhysicalPlan};
use crate::runtime_filter::{to_wire_list, ExprToWire, RuntimeFilter, WireRuntimeFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tp", rename_all = "snake_case")]
pub enum WireExecutorKind {
    TableScan {
        table: String,
        /// Present once the scan has at least one inbound filter.
        #[serde(default)]
        max_wait_time_ms: Option<u64>,
    },
    HashJoin {
        join_type: JoinType,
        build_side: BuildSide,
    },
    Exchange {
        kind: ExchangeKind,
    },
    Projection,
    Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireExecutor {
    pub executor_id: String,
    #[serde(flatten)]
    pub kind: WireExecutorKind,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub runtime_filter_list: Vec<WireRuntimeFilter>,
}

/// Detached clones of the listed filters, in list order.
pub fn snapshot_runtime_filters(
    plan: &PhysicalPlan,
    ids: &[FilterId],
) -> Result<Vec<RuntimeFilter>> {
    ids.iter()
        .map(|id| {
            plan.runtime_filter(*id)
                .map(RuntimeFilter::detached_clone)
                .ok_or_else(|| Error::Plan(format!("runtime filter {id} not found in plan")))
        })
        .collect()
}

/// Executors in pre-order. Fails on the first filter that cannot be
/// serialized, returning nothing.
pub fn to_wire_executors(plan: &PhysicalPlan, conv: &dyn ExprToWire) -> Result<Vec<WireExecutor>> {
    plan.validate()?;
    let mut out = Vec::new();
    for id in plan.preorder()? {
        let op = plan.operator(id)?;
        let snapshot = snapshot_runtime_filters(plan, op.runtime_filters())?;
        out.push(WireExecutor {
            executor_id: id.to_string(),
            kind: executor_kind(op),
            children: op.children().iter().map(ToString::to_string).collect(),
            runtime_filter_list: to_wire_list(&snapshot, conv)?,
        });
    }
    Ok(out)
}

fn executor_kind(op: &PhysicalOperator) -> WireExecutorKind {
    match op {
        PhysicalOperator::TableScan(scan) => WireExecutorKind::TableScan {
            table: scan.table.clone(),
            max_wait_time_ms: scan.max_wait_time_ms(),
        },
        PhysicalOperator::HashJoin(join) => WireExecutorKind::HashJoin {
            join_type: join.join_type,
            build_side: join.build_side,
        },
        PhysicalOperator::Exchange(e) => WireExecutorKind::Exchange { kind: e.kind },
        PhysicalOperator::Projection(_) => WireExecutorKind::Projection,
        PhysicalOperator::Selection(_) => WireExecutorKind::Selection,
    }
}
