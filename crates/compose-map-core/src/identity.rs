//! Stable identity for nodes of a content tree that is rebuilt every cycle.
//!
//! A leaf is identified by the path walked from the root to reach it
//! ([`PositionalId`]) unless the host supplied an explicit identity, in which
//! case that wins ([`ResolvedId::Explicit`]).

use std::fmt;
use std::sync::Arc;

/// Host-supplied identity of an item in a repeated collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Int(i64),
    Str(Arc<str>),
}

impl ItemKey {
    /// Renders the key the way renderer feature ids expect it.
    pub fn to_id_string(&self) -> String {
        match self {
            ItemKey::Int(value) => value.to_string(),
            ItemKey::Str(value) => value.to_string(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Int(value) => write!(f, "{value}"),
            ItemKey::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(value: i64) -> Self {
        ItemKey::Int(value)
    }
}

impl From<i32> for ItemKey {
    fn from(value: i32) -> Self {
        ItemKey::Int(i64::from(value))
    }
}

impl From<u32> for ItemKey {
    fn from(value: u32) -> Self {
        ItemKey::Int(i64::from(value))
    }
}

impl From<usize> for ItemKey {
    fn from(value: usize) -> Self {
        // Collections larger than i64::MAX do not exist on any target we run on.
        ItemKey::Int(value as i64)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        ItemKey::Str(Arc::from(value))
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        ItemKey::Str(Arc::from(value))
    }
}

impl From<&String> for ItemKey {
    fn from(value: &String) -> Self {
        ItemKey::Str(Arc::from(value.as_str()))
    }
}

/// Which arm of a conditional is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    First,
    Second,
}

/// One step of a path from the root of a content tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Child position inside a composite.
    Index(usize),
    /// Explicit id of a repeated item.
    Key(ItemKey),
    /// Arm of a conditional.
    Branch(Branch),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(index) => write!(f, "{index}"),
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Branch(Branch::First) => f.write_str("then"),
            PathSegment::Branch(Branch::Second) => f.write_str("else"),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(ItemKey::from(value))
    }
}

impl From<ItemKey> for PathSegment {
    fn from(value: ItemKey) -> Self {
        PathSegment::Key(value)
    }
}

impl From<Branch> for PathSegment {
    fn from(value: Branch) -> Self {
        PathSegment::Branch(value)
    }
}

/// Ordered path from the root of a content tree to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionalId(Vec<PathSegment>);

impl PositionalId {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Joins the segments into a renderer id, e.g. `prefix-0-a`.
    ///
    /// Integer keys are tagged with `#` and branches with `~`. String keys
    /// escape reserved characters and a leading digit as `%XX`, so distinct
    /// paths never share a string.
    pub fn string_id(&self, prefix: &str) -> String {
        let mut out = String::from(prefix);
        for segment in &self.0 {
            out.push('-');
            match segment {
                PathSegment::Index(index) => out.push_str(&index.to_string()),
                PathSegment::Key(ItemKey::Int(value)) => {
                    out.push('#');
                    out.push_str(&value.to_string());
                }
                PathSegment::Key(ItemKey::Str(value)) => push_escaped(&mut out, value),
                PathSegment::Branch(Branch::First) => out.push_str("~then"),
                PathSegment::Branch(Branch::Second) => out.push_str("~else"),
            }
        }
        out
    }
}

fn push_escaped(out: &mut String, key: &str) {
    for (position, ch) in key.chars().enumerate() {
        let reserved = matches!(ch, '%' | '-' | '#' | '~');
        if reserved || (position == 0 && ch.is_ascii_digit()) {
            out.push_str(&format!("%{:02X}", ch as u32));
        } else {
            out.push(ch);
        }
    }
}

impl fmt::Display for PositionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str("]")
    }
}

/// Identity used to match a leaf against its backing resource across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolvedId {
    /// Identity supplied by the host (layer id, overlay id).
    Explicit(String),
    /// Identity derived from the leaf's position in the tree.
    Positional(PositionalId),
}

impl ResolvedId {
    /// Renderer-facing string id. Explicit ids pass through unchanged.
    pub fn string_id(&self, prefix: &str) -> String {
        match self {
            ResolvedId::Explicit(id) => id.clone(),
            ResolvedId::Positional(path) => path.string_id(prefix),
        }
    }

    pub fn as_positional(&self) -> Option<&PositionalId> {
        match self {
            ResolvedId::Positional(path) => Some(path),
            ResolvedId::Explicit(_) => None,
        }
    }
}

impl fmt::Display for ResolvedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedId::Explicit(id) => write!(f, "{id:?}"),
            ResolvedId::Positional(path) => write!(f, "{path}"),
        }
    }
}

impl From<PositionalId> for ResolvedId {
    fn from(value: PositionalId) -> Self {
        ResolvedId::Positional(value)
    }
}

impl From<&str> for ResolvedId {
    fn from(value: &str) -> Self {
        ResolvedId::Explicit(value.to_owned())
    }
}

impl From<String> for ResolvedId {
    fn from(value: String) -> Self {
        ResolvedId::Explicit(value)
    }
}
