//! The runtime filter record and its detached snapshot.

use std::fmt;

use rfgen_core::config::{RuntimeFilterMode, RuntimeFilterType};
use rfgen_core::expr::ColumnRef;
use rfgen_core::id::{FilterId, OpId};

/// One side of a runtime filter: a key into the live plan arena, or an id
/// resolved when the filter was cloned off the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Live(OpId),
    Detached(OpId),
}

impl Endpoint {
    pub fn op_id(&self) -> OpId {
        match self {
            Endpoint::Live(id) | Endpoint::Detached(id) => *id,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Endpoint::Live(_))
    }

    pub fn detach(&self) -> Endpoint {
        Endpoint::Detached(self.op_id())
    }
}

/// A filter computed from the build side of a hash join and applied to a
/// table scan on the probe side.
///
/// Source and target expression lists pair up positionally. Only one column
/// per list is produced today; the lists leave room for composite filters.
///
/// Example, `select * from t1, t2 where t1.k1 = t2.k1` with t2 as build side:
///
/// ```text
///     HashJoin_2(t1.k1 = t2.k1)
///       /            \
/// TableScan_0(t1)   Exchange_1
///
/// id: 0, build: 2, target: 0, src: [t2.k1], target: [t1.k1], IN, LOCAL
/// ```
#[derive(Debug, PartialEq)]
pub struct RuntimeFilter {
    pub(crate) id: FilterId,
    pub(crate) build: Endpoint,
    pub(crate) target: Option<Endpoint>,
    pub(crate) source_exprs: Vec<ColumnRef>,
    pub(crate) target_exprs: Vec<ColumnRef>,
    pub(crate) filter_type: RuntimeFilterType,
    // Set when the filter is assigned to a target scan.
    pub(crate) mode: Option<RuntimeFilterMode>,
}

impl RuntimeFilter {
    pub(crate) fn new(
        id: FilterId,
        build_join: OpId,
        source_exprs: Vec<ColumnRef>,
        filter_type: RuntimeFilterType,
    ) -> Self {
        Self {
            id,
            build: Endpoint::Live(build_join),
            target: None,
            source_exprs,
            target_exprs: vec![],
            filter_type,
            mode: None,
        }
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn build(&self) -> Endpoint {
        self.build
    }

    pub fn target(&self) -> Option<Endpoint> {
        self.target
    }

    pub fn source_exprs(&self) -> &[ColumnRef] {
        &self.source_exprs
    }

    pub fn target_exprs(&self) -> &[ColumnRef] {
        &self.target_exprs
    }

    pub fn filter_type(&self) -> RuntimeFilterType {
        self.filter_type
    }

    /// `None` until assigned.
    pub fn mode(&self) -> Option<RuntimeFilterMode> {
        self.mode
    }

    pub fn is_assigned(&self) -> bool {
        self.target.is_some()
    }

    /// Deep copy that references no live operator.
    ///
    /// Endpoints are resolved to their operator ids; an absent target stays
    /// absent. Expressions are owned by the copy, so the plan and the copy
    /// can be changed or dropped independently.
    pub fn detached_clone(&self) -> RuntimeFilter {
        RuntimeFilter {
            id: self.id,
            build: self.build.detach(),
            target: self.target.as_ref().map(Endpoint::detach),
            source_exprs: self.source_exprs.to_vec(),
            target_exprs: self.target_exprs.to_vec(),
            filter_type: self.filter_type,
            mode: self.mode,
        }
    }
}

impl fmt::Display for RuntimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}, build_op={}, ", self.id, self.build.op_id())?;
        match self.target {
            Some(t) => write!(f, "target_op={}, ", t.op_id())?,
            None => f.write_str("target_op=nil, ")?,
        }
        f.write_str("src_columns=[")?;
        write_columns(f, &self.source_exprs)?;
        f.write_str("], target_columns=[")?;
        write_columns(f, &self.target_exprs)?;
        write!(f, "], type={}, ", self.filter_type)?;
        match self.mode {
            Some(m) => write!(f, "mode={m}"),
            None => f.write_str("mode=nil"),
        }
    }
}

pub(crate) fn write_columns(f: &mut impl fmt::Write, cols: &[ColumnRef]) -> fmt::Result {
    for (i, col) in cols.iter().enumerate() {
        if i != 0 {
            f.write_char(',')?;
        }
        write!(f, "{col}")?;
    }
    Ok(())
}
