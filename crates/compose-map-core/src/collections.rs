//! Collection aliases shared by the reconcilers.
//!
//! `OrderedMap` keeps insertion order so that destroy sweeps and debug dumps
//! are deterministic across runs.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};

    pub type OrderedMap<K, V> = indexmap::IndexMap<K, V>;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};

    pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;
}
