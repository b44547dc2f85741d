//! Physical plan: an arena of operators keyed by `OpId`, plus the runtime
//! filters that link hash joins to table scans.
//!
//! Operators never own filters and filters never own operators. Both sides
//! refer to each other by id; the plan owns everything. We use BTreeMaps to
//! keep iteration order deterministic for explain output and wire dispatch.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rfgen_core::error::{Error, Result};
use rfgen_core::expr::{ColumnRef, ScalarExpr};
use rfgen_core::id::{FilterId, OpId};
use serde::{Deserialize, Serialize};

use crate::runtime_filter::RuntimeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    Semi,
    AntiSemi,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "inner join",
            JoinType::LeftOuter => "left outer join",
            JoinType::RightOuter => "right outer join",
            JoinType::Semi => "semi join",
            JoinType::AntiSemi => "anti semi join",
        };
        f.write_str(s)
    }
}

/// Which input of a hash join is read first to build the hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSide {
    Left,
    Right,
}

impl fmt::Display for BuildSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSide::Left => f.write_str("left"),
            BuildSide::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    PassThrough,
    Broadcast,
    Hash,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeKind::PassThrough => f.write_str("pass through"),
            ExchangeKind::Broadcast => f.write_str("broadcast"),
            ExchangeKind::Hash => f.write_str("hash"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableScan {
    pub id: OpId,
    pub table: String,
    pub columns: Vec<ColumnRef>,
    pub(crate) runtime_filters: Vec<FilterId>,
    pub(crate) max_wait_time_ms: Option<u64>,
}

impl TableScan {
    pub fn new(id: OpId, table: impl Into<String>, columns: Vec<ColumnRef>) -> Self {
        Self {
            id,
            table: table.into(),
            columns,
            runtime_filters: vec![],
            max_wait_time_ms: None,
        }
    }

    /// Inbound runtime filters, in assignment order.
    pub fn runtime_filters(&self) -> &[FilterId] {
        &self.runtime_filters
    }

    /// How long the scan may block waiting for its runtime filters.
    /// `None` until the first filter is assigned.
    pub fn max_wait_time_ms(&self) -> Option<u64> {
        self.max_wait_time_ms
    }
}

#[derive(Debug, Clone)]
pub struct HashJoin {
    pub id: OpId,
    pub left: OpId,
    pub right: OpId,
    pub join_type: JoinType,
    pub build_side: BuildSide,
    /// Equi-join conditions, each `eq(left_col, right_col)`.
    pub eq_conditions: Vec<ScalarExpr>,
    pub(crate) runtime_filters: Vec<FilterId>,
}

impl HashJoin {
    pub fn new(
        id: OpId,
        left: OpId,
        right: OpId,
        join_type: JoinType,
        build_side: BuildSide,
        eq_conditions: Vec<ScalarExpr>,
    ) -> Self {
        Self {
            id,
            left,
            right,
            join_type,
            build_side,
            eq_conditions,
            runtime_filters: vec![],
        }
    }

    pub fn right_is_build_side(&self) -> bool {
        self.build_side == BuildSide::Right
    }

    pub fn build_child(&self) -> OpId {
        match self.build_side {
            BuildSide::Left => self.left,
            BuildSide::Right => self.right,
        }
    }

    pub fn probe_child(&self) -> OpId {
        match self.build_side {
            BuildSide::Left => self.right,
            BuildSide::Right => self.left,
        }
    }

    /// Outbound runtime filters, in assignment order.
    pub fn runtime_filters(&self) -> &[FilterId] {
        &self.runtime_filters
    }
}

#[derive(Debug, Clone)]
pub struct Exchange {
    pub id: OpId,
    pub input: OpId,
    pub kind: ExchangeKind,
}

/// Forwards the listed expressions. Columns keep their unique id.
#[derive(Debug, Clone)]
pub struct Projection {
    pub id: OpId,
    pub input: OpId,
    pub exprs: Vec<ScalarExpr>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub id: OpId,
    pub input: OpId,
    pub conditions: Vec<ScalarExpr>,
}

#[derive(Debug, Clone)]
pub enum PhysicalOperator {
    TableScan(TableScan),
    HashJoin(HashJoin),
    Exchange(Exchange),
    Projection(Projection),
    Selection(Selection),
}

impl PhysicalOperator {
    pub fn id(&self) -> OpId {
        use PhysicalOperator::*;
        match self {
            TableScan(op) => op.id,
            HashJoin(op) => op.id,
            Exchange(op) => op.id,
            Projection(op) => op.id,
            Selection(op) => op.id,
        }
    }

    /// Human-readable operator name (stable).
    pub fn name(&self) -> &'static str {
        use PhysicalOperator::*;
        match self {
            TableScan(_) => "TableScan",
            HashJoin(_) => "HashJoin",
            Exchange(_) => "Exchange",
            Projection(_) => "Projection",
            Selection(_) => "Selection",
        }
    }

    /// Inputs, left to right.
    pub fn children(&self) -> Vec<OpId> {
        use PhysicalOperator::*;
        match self {
            TableScan(_) => vec![],
            HashJoin(op) => vec![op.left, op.right],
            Exchange(op) => vec![op.input],
            Projection(op) => vec![op.input],
            Selection(op) => vec![op.input],
        }
    }

    /// Runtime filters attached to this operator (outbound for joins,
    /// inbound for scans, empty otherwise).
    pub fn runtime_filters(&self) -> &[FilterId] {
        match self {
            PhysicalOperator::TableScan(op) => &op.runtime_filters,
            PhysicalOperator::HashJoin(op) => &op.runtime_filters,
            _ => &[],
        }
    }
}

impl From<TableScan> for PhysicalOperator {
    fn from(op: TableScan) -> Self {
        PhysicalOperator::TableScan(op)
    }
}

impl From<HashJoin> for PhysicalOperator {
    fn from(op: HashJoin) -> Self {
        PhysicalOperator::HashJoin(op)
    }
}

impl From<Exchange> for PhysicalOperator {
    fn from(op: Exchange) -> Self {
        PhysicalOperator::Exchange(op)
    }
}

impl From<Projection> for PhysicalOperator {
    fn from(op: Projection) -> Self {
        PhysicalOperator::Projection(op)
    }
}

impl From<Selection> for PhysicalOperator {
    fn from(op: Selection) -> Self {
        PhysicalOperator::Selection(op)
    }
}

/// Physical plan = operator arena + root + runtime filters linking operators.
#[derive(Debug)]
pub struct PhysicalPlan {
    root: OpId,
    operators: BTreeMap<OpId, PhysicalOperator>,
    runtime_filters: BTreeMap<FilterId, RuntimeFilter>,
}

impl PhysicalPlan {
    pub fn new(root: OpId) -> Self {
        Self {
            root,
            operators: BTreeMap::new(),
            runtime_filters: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> OpId {
        self.root
    }

    /// Add an operator. Ids must be unique within the plan.
    pub fn add(&mut self, op: impl Into<PhysicalOperator>) -> Result<OpId> {
        let op = op.into();
        let id = op.id();
        if self.operators.contains_key(&id) {
            return Err(Error::Plan(format!("duplicate operator id {id}")));
        }
        self.operators.insert(id, op);
        Ok(id)
    }

    pub fn operator(&self, id: OpId) -> Result<&PhysicalOperator> {
        self.operators
            .get(&id)
            .ok_or_else(|| Error::Plan(format!("operator {id} not found in plan")))
    }

    pub fn operators(&self) -> impl Iterator<Item = &PhysicalOperator> {
        self.operators.values()
    }

    pub fn hash_join(&self, id: OpId) -> Result<&HashJoin> {
        match self.operator(id)? {
            PhysicalOperator::HashJoin(j) => Ok(j),
            other => Err(Error::Plan(format!(
                "operator {id} is a {}, expected HashJoin",
                other.name()
            ))),
        }
    }

    pub fn table_scan(&self, id: OpId) -> Result<&TableScan> {
        match self.operator(id)? {
            PhysicalOperator::TableScan(s) => Ok(s),
            other => Err(Error::Plan(format!(
                "operator {id} is a {}, expected TableScan",
                other.name()
            ))),
        }
    }

    pub(crate) fn hash_join_mut(&mut self, id: OpId) -> Result<&mut HashJoin> {
        match self.operators.get_mut(&id) {
            Some(PhysicalOperator::HashJoin(j)) => Ok(j),
            Some(other) => Err(Error::Plan(format!(
                "operator {id} is a {}, expected HashJoin",
                other.name()
            ))),
            None => Err(Error::Plan(format!("operator {id} not found in plan"))),
        }
    }

    pub(crate) fn table_scan_mut(&mut self, id: OpId) -> Result<&mut TableScan> {
        match self.operators.get_mut(&id) {
            Some(PhysicalOperator::TableScan(s)) => Ok(s),
            Some(other) => Err(Error::Plan(format!(
                "operator {id} is a {}, expected TableScan",
                other.name()
            ))),
            None => Err(Error::Plan(format!("operator {id} not found in plan"))),
        }
    }

    /// Ids of all hash joins, ascending.
    pub fn hash_join_ids(&self) -> Vec<OpId> {
        self.operators
            .values()
            .filter_map(|op| match op {
                PhysicalOperator::HashJoin(j) => Some(j.id),
                _ => None,
            })
            .collect()
    }

    pub fn runtime_filter(&self, id: FilterId) -> Option<&RuntimeFilter> {
        self.runtime_filters.get(&id)
    }

    pub fn runtime_filters(&self) -> impl Iterator<Item = &RuntimeFilter> {
        self.runtime_filters.values()
    }

    pub(crate) fn insert_runtime_filter(&mut self, rf: RuntimeFilter) {
        self.runtime_filters.insert(rf.id(), rf);
    }

    /// Check the arena forms a tree rooted at `root`: every referenced child
    /// exists, no operator has two parents, and every operator is reachable.
    pub fn validate(&self) -> Result<()> {
        self.operator(self.root)?;

        let mut seen = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(Error::Plan(format!(
                    "operator {id} is reachable more than once (shared input or cycle)"
                )));
            }
            for child in self.operator(id)?.children() {
                if !self.operators.contains_key(&child) {
                    return Err(Error::Plan(format!(
                        "operator {id} references missing input {child}"
                    )));
                }
                stack.push(child);
            }
        }

        if let Some(orphan) = self.operators.keys().find(|id| !seen.contains(id)) {
            return Err(Error::Plan(format!(
                "operator {orphan} is not reachable from root {}",
                self.root
            )));
        }
        Ok(())
    }

    /// Operators in pre-order from the root (parents before children, left
    /// before right). Assumes `validate` passed.
    pub fn preorder(&self) -> Result<Vec<OpId>> {
        let mut out = Vec::with_capacity(self.operators.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.operator(id)?.children();
            stack.extend(children.into_iter().rev());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfgen_core::schema::DataType;

    fn scan(id: u64, table: &str, uid: i64) -> TableScan {
        TableScan::new(
            OpId::new(id),
            table,
            vec![ColumnRef::new(uid, table, "k1", DataType::Int64)],
        )
    }

    fn two_table_plan() -> PhysicalPlan {
        let mut plan = PhysicalPlan::new(OpId::new(2));
        plan.add(scan(0, "t1", 1)).unwrap();
        plan.add(scan(1, "t2", 2)).unwrap();
        plan.add(HashJoin::new(
            OpId::new(2),
            OpId::new(0),
            OpId::new(1),
            JoinType::Inner,
            BuildSide::Right,
            vec![],
        ))
        .unwrap();
        plan
    }

    #[test]
    fn build_and_probe_children_follow_build_side() {
        let plan = two_table_plan();
        let join = plan.hash_join(OpId::new(2)).unwrap();
        assert!(join.right_is_build_side());
        assert_eq!(join.build_child(), OpId::new(1));
        assert_eq!(join.probe_child(), OpId::new(0));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut plan = two_table_plan();
        assert!(matches!(plan.add(scan(0, "t3", 3)), Err(Error::Plan(_))));
    }

    #[test]
    fn kind_mismatch_is_a_plan_error() {
        let plan = two_table_plan();
        assert!(plan.table_scan(OpId::new(2)).is_err());
        assert!(plan.hash_join(OpId::new(0)).is_err());
        assert!(plan.operator(OpId::new(42)).is_err());
    }

    #[test]
    fn validate_and_preorder() {
        let plan = two_table_plan();
        plan.validate().unwrap();
        assert_eq!(
            plan.preorder().unwrap(),
            vec![OpId::new(2), OpId::new(0), OpId::new(1)]
        );
        assert_eq!(plan.hash_join_ids(), vec![OpId::new(2)]);
    }

    #[test]
    fn validate_rejects_missing_input_and_orphans() {
        let mut plan = PhysicalPlan::new(OpId::new(1));
        plan.add(Exchange {
            id: OpId::new(1),
            input: OpId::new(9),
            kind: ExchangeKind::Broadcast,
        })
        .unwrap();
        assert!(plan.validate().is_err());

        let mut plan = two_table_plan();
        plan.add(scan(7, "orphan", 7)).unwrap();
        assert!(plan.validate().is_err());
    }
}
