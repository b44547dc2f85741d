//! Tracing hook for runtime filter waits.
//!
//! Events go wherever the binary installs a subscriber; without the
//! `tracing` feature this compiles to nothing.

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "rfgen_wait", event);
    let _enter = span.enter();
    for (k, v) in key_values {
        tracing::trace!(key = %k, value = %v, "wait stat");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) {}
