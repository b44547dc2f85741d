//! Plan-explanation text for runtime filters.

use std::fmt::Write as _;

use super::filter::{write_columns, RuntimeFilter};

impl RuntimeFilter {
    /// `0[IN] <- t2.k1` from the build side, `0[IN] -> t1.k1` from the target
    /// side. Expressions keep list order, which pairs them positionally.
    pub fn explain_info(&self, is_build_side: bool) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}[{}]", self.id, self.filter_type);
        if is_build_side {
            out.push_str(" <- ");
            let _ = write_columns(&mut out, &self.source_exprs);
        } else {
            out.push_str(" -> ");
            let _ = write_columns(&mut out, &self.target_exprs);
        }
        out
    }
}

/// Explain several filters from the same endpoint, separated by `", "`.
pub fn explain_list<'a, I>(filters: I, is_build_side: bool) -> String
where
    I: IntoIterator<Item = &'a RuntimeFilter>,
{
    filters
        .into_iter()
        .map(|rf| rf.explain_info(is_build_side))
        .collect::<Vec<_>>()
        .join(", ")
}
