//! Logical column types. Pure data; no Arrow dependency here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
    Date64,
    Decimal128,
}

impl DataType {
    /// Stable lower-case name, also accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "bool",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
            DataType::Float32 => "f32",
            DataType::Float64 => "f64",
            DataType::Utf8 => "utf8",
            DataType::Binary => "binary",
            DataType::Date64 => "date64",
            DataType::Decimal128 => "decimal128",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Boolean" | "bool" => Ok(DataType::Boolean),
            "Int32" | "i32" => Ok(DataType::Int32),
            "Int64" | "i64" => Ok(DataType::Int64),
            "Float32" | "f32" => Ok(DataType::Float32),
            "Float64" | "f64" => Ok(DataType::Float64),
            "Utf8" | "utf8" | "string" => Ok(DataType::Utf8),
            "Binary" | "binary" | "bytes" => Ok(DataType::Binary),
            "Date64" | "date64" => Ok(DataType::Date64),
            "Decimal128" | "decimal128" => Ok(DataType::Decimal128),
            other => Err(Error::Config(format!("unknown data type '{other}'"))),
        }
    }
}
