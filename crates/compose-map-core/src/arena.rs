//! Id → arena slot table owned by a single reconciler.
//!
//! Backing objects live in a `Vec<Option<T>>` arena addressed by slot index;
//! freed slots are recycled. The id index keeps insertion order so that
//! sweeps destroy resources in the order they were created.

use crate::collections::map::{HashSet, OrderedMap};
use crate::identity::ResolvedId;

pub type SlotIndex = usize;

pub struct BackingTable<T> {
    slots: Vec<Option<T>>, // FUTURE(no_std): migrate to a fixed-capacity slab.
    free: Vec<SlotIndex>,
    index: OrderedMap<ResolvedId, SlotIndex>,
}

impl<T> Default for BackingTable<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: OrderedMap::default(),
        }
    }
}

impl<T> BackingTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &ResolvedId) -> bool {
        self.index.contains_key(id)
    }

    pub fn slot_of(&self, id: &ResolvedId) -> Option<SlotIndex> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &ResolvedId) -> Option<&T> {
        let slot = *self.index.get(id)?;
        self.slots.get(slot)?.as_ref()
    }

    pub fn get_mut(&mut self, id: &ResolvedId) -> Option<&mut T> {
        let slot = *self.index.get(id)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Stores `value` under `id`. An existing entry keeps its slot and the
    /// previous value is returned.
    pub fn insert(&mut self, id: ResolvedId, value: T) -> Option<T> {
        if let Some(&slot) = self.index.get(&id) {
            return self.slots[slot].replace(value);
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(value);
                slot
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        None
    }

    pub fn remove(&mut self, id: &ResolvedId) -> Option<T> {
        let slot = self.index.shift_remove(id)?;
        let value = self.slots[slot].take();
        self.free.push(slot);
        value
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResolvedId> {
        self.index.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResolvedId, &T)> {
        self.index
            .iter()
            .filter_map(|(id, &slot)| self.slots[slot].as_ref().map(|value| (id, value)))
    }

    /// Removes every entry whose id is not in `keep`, in insertion order.
    pub fn take_absent(&mut self, keep: &HashSet<ResolvedId>) -> Vec<(ResolvedId, T)> {
        let absent: Vec<ResolvedId> = self
            .index
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        absent
            .into_iter()
            .filter_map(|id| self.remove(&id).map(|value| (id, value)))
            .collect()
    }

    /// Empties the table, yielding entries in insertion order.
    pub fn drain(&mut self) -> Vec<(ResolvedId, T)> {
        let ids: Vec<ResolvedId> = self.index.keys().cloned().collect();
        let drained = ids
            .into_iter()
            .filter_map(|id| self.remove(&id).map(|value| (id, value)))
            .collect();
        self.slots.clear();
        self.free.clear();
        drained
    }
}
