//! Plan pass that generates runtime filters for every eligible hash join and
//! assigns them to the probe side table scan producing the join key.

use rfgen_core::config::{RuntimeFilterConfig, RuntimeFilterMode};
use rfgen_core::error::Result;
use rfgen_core::expr::{ColumnRef, ScalarExpr};
use rfgen_core::id::{FilterId, FilterIdSource, OpId};

use crate::physical::{BuildSide, HashJoin, JoinType, PhysicalOperator, PhysicalPlan};
use crate::runtime_filter::{assign, generate};

/// Generate and assign runtime filters across the whole plan.
///
/// Joins are visited in ascending id order and their equi-conditions in list
/// order, so ids are deterministic for a given plan. Filters whose predicate
/// has no reachable target scan are dropped; their ids are not reused.
///
/// Returns the ids of all assigned filters.
pub fn generate_runtime_filters<G>(
    plan: &mut PhysicalPlan,
    id_gen: &mut G,
    cfg: &RuntimeFilterConfig,
) -> Result<Vec<FilterId>>
where
    G: FilterIdSource + ?Sized,
{
    if !cfg.is_active() {
        return Ok(vec![]);
    }
    plan.validate()?;

    let mut assigned = Vec::new();
    for join_id in plan.hash_join_ids() {
        let join = plan.hash_join(join_id)?.clone();

        #[cfg(feature = "tracing")]
        tracing::trace!(
            join = %join_id,
            join_type = %join.join_type,
            build_side = %join.build_side,
            "inspect hash join"
        );

        if !probe_side_prunable(&join) {
            continue;
        }

        for pred in &join.eq_conditions {
            let (filters, target_uid) = generate(id_gen, pred, &join, cfg)?;
            let Some((scan_id, target_col)) =
                find_target_scan(plan, join.probe_child(), target_uid, cfg.mode)?
            else {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    join = %join_id,
                    predicate = %pred,
                    "no target scan for runtime filter"
                );
                continue;
            };
            for rf in filters {
                assigned.push(assign(plan, rf, scan_id, target_col.clone(), cfg)?);
            }
        }
    }
    Ok(assigned)
}

/// Filtering the probe input is only safe when probe rows without a match
/// are discarded by the join.
fn probe_side_prunable(join: &HashJoin) -> bool {
    matches!(
        (join.join_type, join.build_side),
        (JoinType::Inner, _)
            | (JoinType::Semi, BuildSide::Right)
            | (JoinType::LeftOuter, BuildSide::Left)
            | (JoinType::RightOuter, BuildSide::Right)
    )
}

/// Search below `start` for the table scan that produces column `unique_id`.
fn find_target_scan(
    plan: &PhysicalPlan,
    start: OpId,
    unique_id: i64,
    mode: RuntimeFilterMode,
) -> Result<Option<(OpId, ColumnRef)>> {
    match plan.operator(start)? {
        PhysicalOperator::TableScan(scan) => Ok(scan
            .columns
            .iter()
            .find(|c| c.unique_id == unique_id)
            .map(|c| (scan.id, c.clone()))),
        PhysicalOperator::Projection(p) => {
            let forwarded = p
                .exprs
                .iter()
                .any(|e| matches!(e, ScalarExpr::Column(c) if c.unique_id == unique_id));
            if forwarded {
                find_target_scan(plan, p.input, unique_id, mode)
            } else {
                Ok(None)
            }
        }
        PhysicalOperator::Selection(s) => find_target_scan(plan, s.input, unique_id, mode),
        // A local filter is only visible inside one fragment.
        PhysicalOperator::Exchange(e) => match mode {
            RuntimeFilterMode::Global => find_target_scan(plan, e.input, unique_id, mode),
            RuntimeFilterMode::Local => Ok(None),
        },
        PhysicalOperator::HashJoin(j) => {
            if let Some(found) = find_target_scan(plan, j.left, unique_id, mode)? {
                return Ok(Some(found));
            }
            find_target_scan(plan, j.right, unique_id, mode)
        }
    }
}
