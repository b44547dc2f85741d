//! Execution-layer wire messages for runtime filters.
//!
//! The planner fills these structs; byte encoding is left to whatever
//! transport carries them (they are serde-serializable).

use std::collections::{BTreeSet, HashMap};

use rfgen_core::config::{RuntimeFilterMode, RuntimeFilterType};
use rfgen_core::error::{Error, ExprSide, Result};
use rfgen_core::expr::{ColumnRef, Literal, ScalarExpr};
use rfgen_core::schema::DataType;
use serde::{Deserialize, Serialize};

use super::filter::RuntimeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireExprType {
    ColumnRef,
    Null,
    Bool,
    Int64,
    Float64,
    String,
    ScalarFunc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireExpr {
    pub tp: WireExprType,
    /// Big-endian payload: column offset/id, literal bytes, or empty.
    #[serde(default)]
    pub val: Vec<u8>,
    #[serde(default)]
    pub children: Vec<WireExpr>,
    /// Function signature for `ScalarFunc`.
    #[serde(default)]
    pub sig: Option<String>,
    #[serde(default)]
    pub field_type: Option<DataType>,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireRuntimeFilterType {
    IN,
    MIN_MAX,
}

impl From<RuntimeFilterType> for WireRuntimeFilterType {
    fn from(t: RuntimeFilterType) -> Self {
        match t {
            RuntimeFilterType::In => WireRuntimeFilterType::IN,
            RuntimeFilterType::MinMax => WireRuntimeFilterType::MIN_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireRuntimeFilterMode {
    LOCAL,
    GLOBAL,
}

impl From<RuntimeFilterMode> for WireRuntimeFilterMode {
    fn from(m: RuntimeFilterMode) -> Self {
        match m {
            RuntimeFilterMode::Local => WireRuntimeFilterMode::LOCAL,
            RuntimeFilterMode::Global => WireRuntimeFilterMode::GLOBAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRuntimeFilter {
    pub id: i32,
    pub source_expr_list: Vec<WireExpr>,
    pub target_expr_list: Vec<WireExpr>,
    pub source_executor_id: String,
    pub target_executor_id: String,
    pub rf_type: WireRuntimeFilterType,
    pub rf_mode: WireRuntimeFilterMode,
}

/// Converts planner expressions to wire expressions. `None` means the
/// expression cannot be pushed to the execution client.
pub trait ExprToWire {
    fn expr_to_wire(&self, expr: &ScalarExpr) -> Option<WireExpr>;
}

/// The execution client expressions are pushed to, with the scalar
/// functions it can evaluate.
#[derive(Debug, Clone, Default)]
pub struct PushdownClient {
    pub name: String,
    supported_functions: BTreeSet<String>,
}

impl PushdownClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported_functions: BTreeSet::new(),
        }
    }

    pub fn with_functions<I, S>(mut self, funcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_functions
            .extend(funcs.into_iter().map(Into::into));
        self
    }

    pub fn supports(&self, func: &str) -> bool {
        self.supported_functions.contains(func)
    }
}

/// Statement-level conversion context.
///
/// With column offsets set, columns encode as their offset in the executor's
/// output schema and unknown columns fail to convert. Without offsets,
/// columns encode as their plan-wide unique id.
#[derive(Debug, Clone, Default)]
pub struct ConvertContext {
    column_offsets: Option<HashMap<i64, i64>>,
}

impl ConvertContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_offsets(mut self, offsets: HashMap<i64, i64>) -> Self {
        self.column_offsets = Some(offsets);
        self
    }

    fn column_key(&self, col: &ColumnRef) -> Option<i64> {
        match &self.column_offsets {
            Some(offsets) => offsets.get(&col.unique_id).copied(),
            None => Some(col.unique_id),
        }
    }
}

/// Default converter keyed by a client/context pair.
pub struct WireExprConverter<'a> {
    client: &'a PushdownClient,
    ctx: &'a ConvertContext,
}

impl<'a> WireExprConverter<'a> {
    pub fn new(client: &'a PushdownClient, ctx: &'a ConvertContext) -> Self {
        Self { client, ctx }
    }
}

impl ExprToWire for WireExprConverter<'_> {
    fn expr_to_wire(&self, expr: &ScalarExpr) -> Option<WireExpr> {
        match expr {
            ScalarExpr::Column(col) => Some(WireExpr {
                tp: WireExprType::ColumnRef,
                val: self.ctx.column_key(col)?.to_be_bytes().to_vec(),
                children: vec![],
                sig: None,
                field_type: Some(col.data_type),
            }),
            ScalarExpr::Literal(lit) => Some(literal_to_wire(lit)),
            ScalarExpr::Function { name, args } => {
                if !self.client.supports(name) {
                    return None;
                }
                let children = args
                    .iter()
                    .map(|a| self.expr_to_wire(a))
                    .collect::<Option<Vec<_>>>()?;
                Some(WireExpr {
                    tp: WireExprType::ScalarFunc,
                    val: vec![],
                    children,
                    sig: Some(name.clone()),
                    field_type: None,
                })
            }
        }
    }
}

fn literal_to_wire(lit: &Literal) -> WireExpr {
    let (tp, val, field_type) = match lit {
        Literal::Null => (WireExprType::Null, vec![], None),
        Literal::Bool(b) => (WireExprType::Bool, vec![u8::from(*b)], Some(DataType::Boolean)),
        Literal::I64(v) => (
            WireExprType::Int64,
            v.to_be_bytes().to_vec(),
            Some(DataType::Int64),
        ),
        Literal::F64(v) => (
            WireExprType::Float64,
            v.to_bits().to_be_bytes().to_vec(),
            Some(DataType::Float64),
        ),
        Literal::Str(s) => (
            WireExprType::String,
            s.as_bytes().to_vec(),
            Some(DataType::Utf8),
        ),
    };
    WireExpr {
        tp,
        val,
        children: vec![],
        sig: None,
        field_type,
    }
}

fn exprs_to_wire(
    exprs: &[ColumnRef],
    side: ExprSide,
    conv: &dyn ExprToWire,
) -> Result<Vec<WireExpr>> {
    exprs
        .iter()
        .map(|col| {
            conv.expr_to_wire(&ScalarExpr::Column(col.clone()))
                .ok_or_else(|| Error::Conversion {
                    side,
                    expr: col.to_string(),
                })
        })
        .collect()
}

impl RuntimeFilter {
    /// Convert one filter. The filter must be assigned.
    pub fn to_wire(&self, conv: &dyn ExprToWire) -> Result<WireRuntimeFilter> {
        let (target, mode) = match (self.target, self.mode) {
            (Some(target), Some(mode)) => (target, mode),
            _ => {
                return Err(Error::Invariant(format!(
                    "runtime filter {} is not assigned to a target scan and cannot be serialized",
                    self.id
                )))
            }
        };
        let id = i32::try_from(self.id.get()).map_err(|_| {
            Error::Invariant(format!(
                "runtime filter id {} does not fit the wire id",
                self.id
            ))
        })?;

        Ok(WireRuntimeFilter {
            id,
            source_expr_list: exprs_to_wire(&self.source_exprs, ExprSide::Source, conv)?,
            target_expr_list: exprs_to_wire(&self.target_exprs, ExprSide::Target, conv)?,
            source_executor_id: self.build.op_id().to_string(),
            target_executor_id: target.op_id().to_string(),
            rf_type: self.filter_type.into(),
            rf_mode: mode.into(),
        })
    }
}

/// Convert filters in order. Fails on the first filter that cannot be
/// converted; nothing is returned in that case.
pub fn to_wire_list(
    filters: &[RuntimeFilter],
    conv: &dyn ExprToWire,
) -> Result<Vec<WireRuntimeFilter>> {
    let mut out = Vec::with_capacity(filters.len());
    for rf in filters {
        out.push(rf.to_wire(conv)?);
    }
    Ok(out)
}
