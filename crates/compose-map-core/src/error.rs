use thiserror::Error;

use crate::identity::{PositionalId, ResolvedId};

/// Validation failures detected while resolving a content tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// Two leaves of one snapshot resolved to the same identity.
    #[error("duplicate content id {id}: declared at {first} and again at {second}")]
    DuplicateId {
        id: ResolvedId,
        first: PositionalId,
        second: PositionalId,
    },
    /// Two leaves with distinct identities derive the same renderer id.
    #[error("{resource} id {id:?} claimed at {first} and again at {second}")]
    DuplicateRendererId {
        resource: &'static str,
        id: String,
        first: PositionalId,
        second: PositionalId,
    },
}
