//! YAML description of a physical plan.
//!
//! Example:
//! ```yaml
//! config:
//!   types: [IN, MIN_MAX]
//!   mode: LOCAL
//!   max_wait_time_ms: 5000
//! root: 2
//! operators:
//!   - { op: hash_join, id: 2, left: 0, right: 1, join_type: inner,
//!       build_side: right, equal: [["t1.k1", "t2.k1"]] }
//!   - { op: table_scan, id: 0, table: t1, columns: [{name: k1, type: i64}] }
//!   - { op: exchange, id: 1, input: 3, kind: broadcast }
//!   - { op: table_scan, id: 3, table: t2, columns: [{name: k1, type: i64}] }
//! ```
//!
//! Scan columns get plan-wide unique ids in the order they are declared,
//! starting at 1. Other operators refer to them as `table.column`.

use std::collections::HashMap;

use rfgen_core::config::{parse_filter_types, RuntimeFilterConfig, RuntimeFilterMode};
use rfgen_core::error::{Error, Result};
use rfgen_core::expr::{ColumnRef, Literal, ScalarExpr};
use rfgen_core::id::OpId;
use rfgen_core::schema::DataType;
use serde::{Deserialize, Serialize};

use crate::physical::{
    BuildSide, Exchange, ExchangeKind, HashJoin, JoinType, PhysicalPlan, Projection, Selection,
    TableScan,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDoc {
    #[serde(default)]
    pub config: Option<PlanConfig>,
    pub root: u64,
    pub operators: Vec<OperatorDef>,
}

/// Overrides for the session runtime filter config. Absent fields keep the
/// session value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub enabled: Option<bool>,
    pub types: Option<Vec<String>>,
    /// `LOCAL`, `GLOBAL`, or `OFF` to disable generation.
    pub mode: Option<String>,
    pub max_wait_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperatorDef {
    TableScan {
        id: u64,
        table: String,
        columns: Vec<ColumnDef>,
    },
    HashJoin {
        id: u64,
        left: u64,
        right: u64,
        #[serde(default = "default_join_type")]
        join_type: JoinType,
        build_side: BuildSide,
        /// Pairs of `table.column` references.
        #[serde(default)]
        equal: Vec<[String; 2]>,
    },
    Exchange {
        id: u64,
        input: u64,
        kind: ExchangeKind,
    },
    Projection {
        id: u64,
        input: u64,
        columns: Vec<String>,
    },
    Selection {
        id: u64,
        input: u64,
        conditions: Vec<FuncDef>,
    },
}

fn default_join_type() -> JoinType {
    JoinType::Inner
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDef {
    pub func: String,
    #[serde(default)]
    pub args: Vec<ArgDef>,
}

/// Function argument. Bare strings are column references; string literals
/// are written `{ lit: "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgDef {
    Bool(bool),
    Int(i64),
    Float(f64),
    Column(String),
    Str { lit: String },
    Func(FuncDef),
}

#[derive(Debug)]
pub struct ParsedPlan {
    pub plan: PhysicalPlan,
    pub config: PlanConfig,
}

pub fn parse_yaml_plan(yaml_src: &str) -> Result<ParsedPlan> {
    let doc: PlanDoc = serde_yaml::from_str(yaml_src)
        .map_err(|e| Error::Plan(format!("invalid plan yaml: {e}")))?;
    let columns = collect_columns(&doc.operators)?;

    let mut plan = PhysicalPlan::new(OpId::new(doc.root));
    for def in doc.operators {
        match def {
            OperatorDef::TableScan { id, table, columns: defs } => {
                let cols = defs
                    .iter()
                    .map(|c| lookup(&columns, &format!("{table}.{}", c.name)))
                    .collect::<Result<Vec<_>>>()?;
                plan.add(TableScan::new(OpId::new(id), table, cols))?;
            }
            OperatorDef::HashJoin {
                id,
                left,
                right,
                join_type,
                build_side,
                equal,
            } => {
                let eq_conditions = equal
                    .iter()
                    .map(|[l, r]| -> Result<ScalarExpr> {
                        Ok(ScalarExpr::eq_columns(lookup(&columns, l)?, lookup(&columns, r)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                plan.add(HashJoin::new(
                    OpId::new(id),
                    OpId::new(left),
                    OpId::new(right),
                    join_type,
                    build_side,
                    eq_conditions,
                ))?;
            }
            OperatorDef::Exchange { id, input, kind } => {
                plan.add(Exchange {
                    id: OpId::new(id),
                    input: OpId::new(input),
                    kind,
                })?;
            }
            OperatorDef::Projection { id, input, columns: names } => {
                let exprs = names
                    .iter()
                    .map(|n| lookup(&columns, n).map(ScalarExpr::Column))
                    .collect::<Result<Vec<_>>>()?;
                plan.add(Projection {
                    id: OpId::new(id),
                    input: OpId::new(input),
                    exprs,
                })?;
            }
            OperatorDef::Selection {
                id,
                input,
                conditions,
            } => {
                let conditions = conditions
                    .iter()
                    .map(|f| func_expr(&columns, f))
                    .collect::<Result<Vec<_>>>()?;
                plan.add(Selection {
                    id: OpId::new(id),
                    input: OpId::new(input),
                    conditions,
                })?;
            }
        }
    }
    plan.validate()?;

    Ok(ParsedPlan {
        plan,
        config: doc.config.unwrap_or_default(),
    })
}

/// Apply the plan's overrides on top of `cfg`.
pub fn apply_plan_config(overrides: &PlanConfig, cfg: &mut RuntimeFilterConfig) -> Result<()> {
    if let Some(enabled) = overrides.enabled {
        cfg.enabled = enabled;
    }
    if let Some(types) = &overrides.types {
        cfg.types = parse_filter_types(&types.join(","))?;
    }
    if let Some(mode) = &overrides.mode {
        if mode.trim().eq_ignore_ascii_case("OFF") {
            cfg.enabled = false;
        } else {
            cfg.mode = mode.parse::<RuntimeFilterMode>()?;
        }
    }
    if let Some(ms) = overrides.max_wait_time_ms {
        cfg.max_wait_time_ms = ms;
    }
    Ok(())
}

fn collect_columns(defs: &[OperatorDef]) -> Result<HashMap<String, ColumnRef>> {
    let mut columns = HashMap::new();
    let mut next_uid = 1i64;
    for def in defs {
        let OperatorDef::TableScan { table, columns: cols, .. } = def else {
            continue;
        };
        for c in cols {
            let data_type = c.data_type.parse::<DataType>()?;
            let key = format!("{table}.{}", c.name);
            let col = ColumnRef::new(next_uid, table.as_str(), c.name.as_str(), data_type);
            if columns.insert(key.clone(), col).is_some() {
                return Err(Error::Plan(format!("column {key} is declared twice")));
            }
            next_uid += 1;
        }
    }
    Ok(columns)
}

fn lookup(columns: &HashMap<String, ColumnRef>, name: &str) -> Result<ColumnRef> {
    columns
        .get(name)
        .cloned()
        .ok_or_else(|| Error::Plan(format!("unknown column '{name}'")))
}

fn func_expr(columns: &HashMap<String, ColumnRef>, f: &FuncDef) -> Result<ScalarExpr> {
    let args = f
        .args
        .iter()
        .map(|a| arg_expr(columns, a))
        .collect::<Result<Vec<_>>>()?;
    Ok(ScalarExpr::Function {
        name: f.func.clone(),
        args,
    })
}

fn arg_expr(columns: &HashMap<String, ColumnRef>, arg: &ArgDef) -> Result<ScalarExpr> {
    Ok(match arg {
        ArgDef::Bool(b) => ScalarExpr::Literal(Literal::Bool(*b)),
        ArgDef::Int(v) => ScalarExpr::Literal(Literal::I64(*v)),
        ArgDef::Float(v) => ScalarExpr::Literal(Literal::F64(*v)),
        ArgDef::Column(name) => ScalarExpr::Column(lookup(columns, name)?),
        ArgDef::Str { lit } => ScalarExpr::Literal(Literal::Str(lit.clone())),
        ArgDef::Func(f) => func_expr(columns, f)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfgen_core::config::RuntimeFilterType;

    const PLAN: &str = r#"
root: 2
operators:
  - { op: hash_join, id: 2, left: 4, right: 1, build_side: right, equal: [["t1.k1", "t2.k1"]] }
  - { op: selection, id: 4, input: 0, conditions: [{ func: gt, args: ["t1.v", 3] }] }
  - { op: table_scan, id: 0, table: t1, columns: [{name: k1, type: i64}, {name: v, type: i64}] }
  - { op: table_scan, id: 1, table: t2, columns: [{name: k1, type: i64}] }
"#;

    #[test]
    fn parses_operators_and_assigns_unique_ids() {
        let parsed = parse_yaml_plan(PLAN).unwrap();
        let plan = &parsed.plan;
        assert_eq!(plan.root(), OpId::new(2));

        let join = plan.hash_join(OpId::new(2)).unwrap();
        assert_eq!(join.join_type, JoinType::Inner);
        assert_eq!(join.eq_conditions[0].to_string(), "eq(t1.k1, t2.k1)");

        let t1 = plan.table_scan(OpId::new(0)).unwrap();
        assert_eq!(t1.columns[0].unique_id, 1);
        assert_eq!(t1.columns[1].unique_id, 2);
        assert_eq!(plan.table_scan(OpId::new(1)).unwrap().columns[0].unique_id, 3);
        assert!(parsed.config.mode.is_none());
    }

    #[test]
    fn unknown_column_is_a_plan_error() {
        let src = PLAN.replace("\"t2.k1\"", "\"t2.nope\"");
        assert!(matches!(parse_yaml_plan(&src), Err(Error::Plan(_))));
    }

    #[test]
    fn bad_yaml_is_a_plan_error() {
        assert!(matches!(parse_yaml_plan("root: [1"), Err(Error::Plan(_))));
        assert!(matches!(
            parse_yaml_plan("root: 0\noperators:\n  - { op: sort, id: 0 }\n"),
            Err(Error::Plan(_))
        ));
    }

    #[test]
    fn config_overrides_apply_on_top() {
        let overrides = PlanConfig {
            types: Some(vec!["MIN_MAX".into(), "IN".into()]),
            mode: Some("global".into()),
            max_wait_time_ms: Some(250),
            ..Default::default()
        };
        let mut cfg = RuntimeFilterConfig::default();
        apply_plan_config(&overrides, &mut cfg).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.types, vec![RuntimeFilterType::MinMax, RuntimeFilterType::In]);
        assert_eq!(cfg.mode, RuntimeFilterMode::Global);
        assert_eq!(cfg.max_wait_time_ms, 250);

        let off = PlanConfig {
            mode: Some("OFF".into()),
            ..Default::default()
        };
        apply_plan_config(&off, &mut cfg).unwrap();
        assert!(!cfg.is_active());

        let bad = PlanConfig {
            types: Some(vec!["BLOOM".into()]),
            ..Default::default()
        };
        assert!(matches!(
            apply_plan_config(&bad, &mut cfg),
            Err(Error::Config(_))
        ));
    }
}
