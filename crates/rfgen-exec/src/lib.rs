#![forbid(unsafe_code)]
//! rfgen-exec: execution-time side of runtime filters.
//!
//! Build sides publish filters into a `RuntimeFilterHub`; dispatched table
//! scans wait on them through a `ScanFilterGate`, bounded by the scan's wait
//! budget and by query cancellation.

pub mod hub;
pub mod metrics;
pub mod wait;

pub use hub::{FilterState, PublishedFilter, RuntimeFilterHub};
pub use wait::{ScanFilterGate, WaitError, WaitOutcome};
