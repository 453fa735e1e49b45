//! Declarative content tree and the traversal that assigns identities.
//!
//! The tree is a closed sum type. A host builds a fresh one for every update;
//! the traversal in [`ContentNode::visit`] is deterministic so the same shape
//! always yields the same ids.
//!
//! Identity rules:
//! - children of [`ContentNode::Composite`] push their index,
//! - [`ContentNode::Conditional`] pushes the tag of its active arm so that the
//!   two arms never share ids,
//! - items of [`ContentNode::Repeated`] push their explicit key instead of
//!   their position, so reordering a collection leaves identities alone.

use crate::collections::map::HashMap;
use crate::error::ContentError;
use crate::identity::{Branch, ItemKey, PathSegment, PositionalId, ResolvedId};

/// Payloads can opt out of positional identity by naming themselves.
pub trait ContentPayload {
    fn explicit_id(&self) -> Option<&str> {
        None
    }

    /// Scope an explicit id is unique in. Two payloads may share an explicit
    /// id when their namespaces differ.
    fn id_namespace(&self) -> &'static str {
        ""
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedItem<P> {
    pub id: ItemKey,
    pub content: ContentNode<P>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode<P> {
    Leaf(P),
    Composite(Vec<ContentNode<P>>),
    Conditional {
        branch: Branch,
        content: Box<ContentNode<P>>,
    },
    Repeated(Vec<RepeatedItem<P>>),
}

impl<P> Default for ContentNode<P> {
    fn default() -> Self {
        ContentNode::Composite(Vec::new())
    }
}

impl<P> ContentNode<P> {
    pub fn leaf(payload: P) -> Self {
        ContentNode::Leaf(payload)
    }

    pub fn empty() -> Self {
        ContentNode::Composite(Vec::new())
    }

    pub fn composite(children: impl IntoIterator<Item = ContentNode<P>>) -> Self {
        ContentNode::Composite(children.into_iter().collect())
    }

    /// `if condition { then } else { otherwise }`. Only the active arm is built.
    pub fn either(
        condition: bool,
        then: impl FnOnce() -> ContentNode<P>,
        otherwise: impl FnOnce() -> ContentNode<P>,
    ) -> Self {
        if condition {
            ContentNode::Conditional {
                branch: Branch::First,
                content: Box::new(then()),
            }
        } else {
            ContentNode::Conditional {
                branch: Branch::Second,
                content: Box::new(otherwise()),
            }
        }
    }

    /// `if let Some(..)` without an else arm.
    pub fn optional(content: Option<ContentNode<P>>) -> Self {
        match content {
            Some(content) => ContentNode::Conditional {
                branch: Branch::First,
                content: Box::new(content),
            },
            None => ContentNode::Conditional {
                branch: Branch::Second,
                content: Box::new(ContentNode::empty()),
            },
        }
    }

    /// Builds one subtree per element, keyed by `id(&element)`.
    pub fn for_each<T, K>(
        items: impl IntoIterator<Item = T>,
        id: impl Fn(&T) -> K,
        mut build: impl FnMut(T) -> ContentNode<P>,
    ) -> Self
    where
        K: Into<ItemKey>,
    {
        let items = items
            .into_iter()
            .map(|element| {
                let key = id(&element).into();
                RepeatedItem {
                    id: key,
                    content: build(element),
                }
            })
            .collect();
        ContentNode::Repeated(items)
    }

    /// Pre-order walk invoking `visitor` with the positional id of each leaf.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&PositionalId, &'a P)) {
        let mut path = PositionalId::root();
        self.visit_at(&mut path, visitor);
    }

    fn visit_at<'a>(
        &'a self,
        path: &mut PositionalId,
        visitor: &mut impl FnMut(&PositionalId, &'a P),
    ) {
        match self {
            ContentNode::Leaf(payload) => visitor(&*path, payload),
            ContentNode::Composite(children) => {
                for (index, child) in children.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    child.visit_at(path, visitor);
                    path.pop();
                }
            }
            ContentNode::Conditional { branch, content } => {
                path.push(PathSegment::Branch(*branch));
                content.visit_at(path, visitor);
                path.pop();
            }
            ContentNode::Repeated(items) => {
                for item in items {
                    path.push(PathSegment::Key(item.id.clone()));
                    item.content.visit_at(path, visitor);
                    path.pop();
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_, _| count += 1);
        count
    }
}

/// A leaf together with the identity it resolved to.
#[derive(Debug)]
pub struct ResolvedLeaf<'a, P> {
    pub id: ResolvedId,
    pub path: PositionalId,
    pub payload: &'a P,
}

impl<P: ContentPayload> ContentNode<P> {
    /// Resolves every leaf and rejects snapshots where two leaves share an id.
    pub fn resolve(&self) -> Result<Vec<ResolvedLeaf<'_, P>>, ContentError> {
        let mut leaves: Vec<ResolvedLeaf<'_, P>> = Vec::new();
        let mut seen: HashMap<(&'static str, ResolvedId), usize> = HashMap::new();
        let mut collision = None;
        self.visit(&mut |path, payload| {
            if collision.is_some() {
                return;
            }
            let (namespace, id) = match payload.explicit_id() {
                Some(explicit) => (
                    payload.id_namespace(),
                    ResolvedId::Explicit(explicit.to_owned()),
                ),
                None => ("", ResolvedId::Positional(path.clone())),
            };
            let key = (namespace, id);
            if let Some(&first) = seen.get(&key) {
                collision = Some((key.1, first, path.clone()));
                return;
            }
            let id = key.1.clone();
            seen.insert(key, leaves.len());
            leaves.push(ResolvedLeaf {
                id,
                path: path.clone(),
                payload,
            });
        });
        if let Some((id, first, second)) = collision {
            return Err(ContentError::DuplicateId {
                id,
                first: leaves[first].path.clone(),
                second,
            });
        }
        Ok(leaves)
    }
}

#[cfg(test)]
#[path = "tests/content_tests.rs"]
mod tests;
