use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Kind of renderer resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Source,
    Layer,
    View,
    Subscription,
    Transition,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Source => "source",
            ResourceKind::Layer => "layer",
            ResourceKind::View => "view",
            ResourceKind::Subscription => "subscription",
            ResourceKind::Transition => "transition",
        };
        f.write_str(name)
    }
}

/// Failure reported by a renderer mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RendererError {
    #[error("{kind} {id:?} already exists")]
    DuplicateId { kind: ResourceKind, id: String },
    #[error("{kind} {id:?} not found")]
    NotFound { kind: ResourceKind, id: String },
    #[error("invalid camera bounds: {0}")]
    InvalidBounds(String),
    #[error("renderer rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}
