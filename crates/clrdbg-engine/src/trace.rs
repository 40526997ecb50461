//! Operation instrumentation.
//!
//! Every operation emits `tool_invoked` / `tool_completed` /
//! `tool_error` records through `tracing`; the subscriber is whatever the
//! embedder installed.

use std::time::Instant;

use crate::error::DebugError;

pub(crate) fn instrument<T>(
    op: &'static str,
    f: impl FnOnce() -> Result<T, DebugError>,
) -> Result<T, DebugError> {
    let started = Instant::now();
    tracing::debug!(op, "tool_invoked");
    match f() {
        Ok(value) => {
            let duration_ms = started.elapsed().as_millis();
            tracing::debug!(op, duration_ms = duration_ms as u64, "tool_completed");
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(op, code = err.code().as_str(), error = %err, "tool_error");
            Err(err)
        }
    }
}
