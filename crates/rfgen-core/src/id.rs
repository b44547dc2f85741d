//! Strongly-typed identifiers used across the planner and exec crates.
//!
//! Downstream crates should *not* use raw integers for operator or filter ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        // Plain decimal: this is what explain output and executor ids print.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

new_id!(OpId);
new_id!(FilterId);

/// Anything that can hand out runtime filter ids.
pub trait FilterIdSource {
    fn next_filter_id(&mut self) -> FilterId;
}

/// Per-compilation runtime filter id counter.
///
/// Owned by exactly one plan-construction pass and passed explicitly to every
/// call that needs an id. Ids start at 0 and strictly increase.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a different baseline (e.g. when resuming numbering for a
    /// statement that already produced filters).
    pub fn with_baseline(baseline: u64) -> Self {
        Self { next: baseline }
    }

    pub fn next_id(&mut self) -> FilterId {
        let id = FilterId::new(self.next);
        self.next += 1;
        id
    }

    /// Peek at the id the next call will return.
    pub fn peek(&self) -> FilterId {
        FilterId::new(self.next)
    }
}

impl FilterIdSource for IdGenerator {
    fn next_filter_id(&mut self) -> FilterId {
        self.next_id()
    }
}

/// Atomic variant for statements compiled concurrently within one session.
#[derive(Debug, Default)]
pub struct SharedIdGenerator {
    next: AtomicU64,
}

impl SharedIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> FilterId {
        FilterId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl FilterIdSource for &SharedIdGenerator {
    fn next_filter_id(&mut self) -> FilterId {
        self.next_id()
    }
}
