//! Link a generated runtime filter to its target table scan.

use rfgen_core::config::RuntimeFilterConfig;
use rfgen_core::error::{Error, Result};
use rfgen_core::expr::ColumnRef;
use rfgen_core::id::{FilterId, OpId};

use super::filter::{Endpoint, RuntimeFilter};
use crate::physical::PhysicalPlan;

/// Attach `filter` to `target_scan` and move it into the plan.
///
/// Appends `target_expr` to the filter's target list, sets the filter mode
/// from `cfg`, and links the filter into both the build join's outbound list
/// and the scan's inbound list. The scan's wait budget is set only when this
/// is the first filter it receives.
///
/// A filter can be assigned once. Assigning a filter that already has a
/// target, or whose id is already linked into the plan, is an invariant
/// violation. The plan is left untouched on any error.
pub fn assign(
    plan: &mut PhysicalPlan,
    mut filter: RuntimeFilter,
    target_scan: OpId,
    target_expr: ColumnRef,
    cfg: &RuntimeFilterConfig,
) -> Result<FilterId> {
    if let Some(existing) = filter.target {
        return Err(Error::Invariant(format!(
            "runtime filter {} is already assigned to operator {}",
            filter.id,
            existing.op_id()
        )));
    }
    if plan.runtime_filter(filter.id).is_some() {
        return Err(Error::Invariant(format!(
            "runtime filter {} is already linked into the plan",
            filter.id
        )));
    }
    let build_join = match filter.build {
        Endpoint::Live(id) => id,
        Endpoint::Detached(id) => {
            return Err(Error::Invariant(format!(
                "runtime filter {} is detached from build operator {id} and cannot be assigned",
                filter.id
            )))
        }
    };
    // Resolve both operators before mutating anything.
    plan.hash_join(build_join)?;
    plan.table_scan(target_scan)?;

    let scan = plan.table_scan_mut(target_scan)?;
    if scan.runtime_filters.is_empty() {
        scan.max_wait_time_ms = Some(cfg.max_wait_time_ms);
    }
    scan.runtime_filters.push(filter.id);
    plan.hash_join_mut(build_join)?.runtime_filters.push(filter.id);

    filter.target = Some(Endpoint::Live(target_scan));
    filter.target_exprs.push(target_expr);
    filter.mode = Some(cfg.mode);

    #[cfg(feature = "tracing")]
    tracing::debug!(runtime_filter = %filter, "assign runtime filter to target scan");

    let id = filter.id;
    plan.insert_runtime_filter(filter);
    Ok(id)
}
