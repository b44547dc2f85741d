//! Convenient re-exports for downstream crates.

pub use crate::config::{RuntimeFilterConfig, RuntimeFilterMode, RuntimeFilterType};
pub use crate::error::{Error, ExprSide, Result};
pub use crate::expr::{ColumnRef, Literal, ScalarExpr};
pub use crate::id::{FilterId, FilterIdSource, IdGenerator, OpId, SharedIdGenerator};
pub use crate::schema::DataType;
