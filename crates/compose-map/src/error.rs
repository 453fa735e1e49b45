use compose_map_renderer::RendererError;
use serde::Serialize;
use thiserror::Error;

/// A renderer mutation that failed and was swallowed by a reconciler.
///
/// The affected resource is treated as absent (or unchanged) and the
/// operation is retried on the next cycle if its id is still declared.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{operation} for {target:?} failed: {error}")]
pub struct ApplyFailure {
    pub target: String,
    pub operation: &'static str,
    pub error: RendererError,
}

impl ApplyFailure {
    pub fn new(target: impl Into<String>, operation: &'static str, error: RendererError) -> Self {
        Self {
            target: target.into(),
            operation,
            error,
        }
    }
}

/// Logs `failure` and keeps it for the cycle report.
pub(crate) fn record(failures: &mut Vec<ApplyFailure>, failure: ApplyFailure) {
    log::warn!("{failure}");
    failures.push(failure);
}
