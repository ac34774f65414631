//! Progress reporting for the per-precinct download loop.
//!
//! The consolidation run reports one unit of work per roster precinct.
//! Rendering is left to the caller: the CLI wires in an `indicatif` bar,
//! tests and library callers use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running run.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of units (precincts) expected.
    fn set_total(&self, total: u64);

    /// Advance by `delta` units.
    fn inc(&self, delta: u64);

    /// Replace the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the run as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
