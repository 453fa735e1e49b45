#![doc = r"Identity, content tree and serial runtime for declarative map content."]

pub mod arena;
pub mod binding;
pub mod collections;
pub mod content;
pub mod error;
pub mod identity;
pub mod latch;
pub mod platform;
pub mod runtime;

pub use arena::{BackingTable, SlotIndex};
pub use binding::Binding;
pub use content::{ContentNode, ContentPayload, RepeatedItem, ResolvedLeaf};
pub use error::ContentError;
pub use identity::{Branch, ItemKey, PathSegment, PositionalId, ResolvedId};
pub use latch::OnceLatch;
pub use platform::RuntimeScheduler;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};

#[cfg(test)]
pub use runtime::TestScheduler;

/// Builds a [`PositionalId`] from segment literals: `path![0, "a"]`.
#[macro_export]
macro_rules! path {
    ($($segment:expr),* $(,)?) => {
        $crate::PositionalId::from_segments(vec![$($crate::PathSegment::from($segment)),*])
    };
}
