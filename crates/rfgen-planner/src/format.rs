//! Text explain of a physical plan, one operator per line:
//!
//! ```text
//! HashJoin_2  inner join, build side:right, equal:[eq(t1.k1, t2.k1)], runtime filter:0[IN] <- t2.k1
//! ├─TableScan_0  table:t1, columns:[t1.k1], runtime filter:0[IN] -> t1.k1, max wait:10000ms
//! └─Exchange_1  broadcast
//!   └─TableScan_3  table:t2, columns:[t2.k1]
//! ```

use std::fmt::Write as _;

use rfgen_core::error::{Error, Result};
use rfgen_core::expr::ScalarExpr;
use rfgen_core::id::{FilterId, OpId};

use crate::physical::{PhysicalOperator, PhysicalPlan};
use crate::runtime_filter::{explain_list, write_columns, RuntimeFilter};

pub fn explain_plan(plan: &PhysicalPlan) -> Result<String> {
    plan.validate()?;
    let mut out = String::new();
    write_node(plan, plan.root(), "", None, &mut out)?;
    Ok(out)
}

/// `is_last` is `None` for the root.
fn write_node(
    plan: &PhysicalPlan,
    id: OpId,
    prefix: &str,
    is_last: Option<bool>,
    out: &mut String,
) -> Result<()> {
    let op = plan.operator(id)?;
    let child_prefix = match is_last {
        None => String::new(),
        Some(true) => {
            out.push_str(prefix);
            out.push_str("└─");
            format!("{prefix}  ")
        }
        Some(false) => {
            out.push_str(prefix);
            out.push_str("├─");
            format!("{prefix}│ ")
        }
    };
    let _ = write!(out, "{}_{}", op.name(), op.id());
    let info = operator_info(plan, op)?;
    if !info.is_empty() {
        out.push_str("  ");
        out.push_str(&info);
    }
    out.push('\n');

    let children = op.children();
    let n = children.len();
    for (i, child) in children.into_iter().enumerate() {
        write_node(plan, child, &child_prefix, Some(i + 1 == n), out)?;
    }
    Ok(())
}

fn operator_info(plan: &PhysicalPlan, op: &PhysicalOperator) -> Result<String> {
    let mut s = String::new();
    match op {
        PhysicalOperator::TableScan(scan) => {
            let _ = write!(s, "table:{}, columns:[", scan.table);
            let _ = write_columns(&mut s, &scan.columns);
            s.push(']');
            if !scan.runtime_filters().is_empty() {
                let rfs = resolve(plan, scan.runtime_filters())?;
                let _ = write!(s, ", runtime filter:{}", explain_list(rfs, false));
            }
            if let Some(ms) = scan.max_wait_time_ms() {
                let _ = write!(s, ", max wait:{ms}ms");
            }
        }
        PhysicalOperator::HashJoin(join) => {
            let _ = write!(
                s,
                "{}, build side:{}, equal:[{}]",
                join.join_type,
                join.build_side,
                join_exprs(&join.eq_conditions)
            );
            if !join.runtime_filters().is_empty() {
                let rfs = resolve(plan, join.runtime_filters())?;
                let _ = write!(s, ", runtime filter:{}", explain_list(rfs, true));
            }
        }
        PhysicalOperator::Exchange(e) => {
            let _ = write!(s, "{}", e.kind);
        }
        PhysicalOperator::Projection(p) => {
            let _ = write!(s, "exprs:[{}]", join_exprs(&p.exprs));
        }
        PhysicalOperator::Selection(sel) => {
            let _ = write!(s, "conditions:[{}]", join_exprs(&sel.conditions));
        }
    }
    Ok(s)
}

fn resolve<'a>(plan: &'a PhysicalPlan, ids: &[FilterId]) -> Result<Vec<&'a RuntimeFilter>> {
    ids.iter()
        .map(|id| {
            plan.runtime_filter(*id)
                .ok_or_else(|| Error::Plan(format!("runtime filter {id} not found in plan")))
        })
        .collect()
}

fn join_exprs(exprs: &[ScalarExpr]) -> String {
    exprs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
