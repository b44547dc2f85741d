//! Minimal expression tree consumed by the planner.
//!
//! Only what runtime filter generation touches is modelled: column references
//! with a plan-wide unique id, literals, and named scalar functions (equality
//! conditions of a hash join are `eq(col, col)` functions).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

/// Name of the equality function produced for equi-join conditions.
pub const EQ_FUNC: &str = "eq";

/// A resolved column. `unique_id` identifies the column across the whole plan;
/// `table`/`name` are only used for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub unique_id: i64,
    pub table: String,
    pub name: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(
        unique_id: i64,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            unique_id,
            table: table.into(),
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.table.is_empty(), self.name.is_empty()) {
            (_, true) => write!(f, "Column#{}", self.unique_id),
            (true, false) => f.write_str(&self.name),
            (false, false) => write!(f, "{}.{}", self.table, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::I64(v) => write!(f, "{v}"),
            Literal::F64(v) => write!(f, "{v}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpr {
    Column(ColumnRef),
    Literal(Literal),
    Function { name: String, args: Vec<ScalarExpr> },
}

impl ScalarExpr {
    /// Build `eq(left, right)` from two columns.
    pub fn eq_columns(left: ColumnRef, right: ColumnRef) -> Self {
        ScalarExpr::Function {
            name: EQ_FUNC.to_string(),
            args: vec![ScalarExpr::Column(left), ScalarExpr::Column(right)],
        }
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            ScalarExpr::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Arguments if this is a call of `func`.
    pub fn function_args(&self, func: &str) -> Option<&[ScalarExpr]> {
        match self {
            ScalarExpr::Function { name, args } if name == func => Some(args),
            _ => None,
        }
    }
}

impl From<ColumnRef> for ScalarExpr {
    fn from(c: ColumnRef) -> Self {
        ScalarExpr::Column(c)
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Column(c) => write!(f, "{c}"),
            ScalarExpr::Literal(l) => write!(f, "{l}"),
            ScalarExpr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
