//! Annotation groups: declared item collections realized as one GeoJSON
//! source plus one style layer per group.

use std::fmt;
use std::rc::Rc;

use compose_map_core::collections::map::{HashMap, HashSet};
use compose_map_core::{BackingTable, ItemKey, ResolvedId};
use compose_map_renderer::{
    Feature, Geometry, LayerKind, LayerPosition, LayerSpec, LayerUpdate, Properties, SourceDiff,
    StyleHost,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{record, ApplyFailure};
use crate::gestures::{AnnotationGestureHandler, GestureContext};
use crate::report::ReconcileStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnnotationKind {
    Point,
    Circle,
    Polyline,
    Polygon,
}

impl AnnotationKind {
    pub fn layer_kind(self) -> LayerKind {
        match self {
            AnnotationKind::Point => LayerKind::Symbol,
            AnnotationKind::Circle => LayerKind::Circle,
            AnnotationKind::Polyline => LayerKind::Line,
            AnnotationKind::Polygon => LayerKind::Fill,
        }
    }
}

/// One declared item of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: ItemKey,
    pub geometry: Geometry,
    pub properties: Properties,
    /// Initial draggable state for items seen for the first time.
    pub is_draggable: bool,
}

impl Annotation {
    pub fn new(id: impl Into<ItemKey>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: Properties::new(),
            is_draggable: false,
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn draggable(mut self, is_draggable: bool) -> Self {
        self.is_draggable = is_draggable;
        self
    }

    fn feature(&self) -> Feature {
        Feature {
            id: self.id.to_id_string(),
            geometry: self.geometry.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// Item as held by a backing manager, with its transient interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedAnnotation {
    pub annotation: Annotation,
    pub is_selected: bool,
    pub is_draggable: bool,
}

#[derive(Clone)]
pub struct AnnotationGroup {
    pub kind: AnnotationKind,
    pub items: Vec<Annotation>,
    layer_id: Option<String>,
    layer_position: LayerPosition,
    slot: Option<String>,
    layer_properties: Properties,
    on_tap: Option<AnnotationGestureHandler>,
    on_long_press: Option<AnnotationGestureHandler>,
}

impl AnnotationGroup {
    pub fn new(kind: AnnotationKind, items: Vec<Annotation>) -> Self {
        Self {
            kind,
            items,
            layer_id: None,
            layer_position: LayerPosition::Top,
            slot: None,
            layer_properties: Properties::new(),
            on_tap: None,
            on_long_press: None,
        }
    }

    /// Builds one annotation per data element.
    pub fn from_data<T>(
        kind: AnnotationKind,
        data: impl IntoIterator<Item = T>,
        build: impl Fn(T) -> Annotation,
    ) -> Self {
        Self::new(kind, data.into_iter().map(build).collect())
    }

    /// Explicit layer id. It becomes the group's identity.
    pub fn layer_id(mut self, id: impl Into<String>) -> Self {
        self.layer_id = Some(id.into());
        self
    }

    pub fn layer_position(mut self, position: LayerPosition) -> Self {
        self.layer_position = position;
        self
    }

    pub fn slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn layer_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layer_properties.insert(key.into(), value.into());
        self
    }

    /// Called with the tapped item's id. Return `true` to consume the tap.
    pub fn on_tap(mut self, handler: impl Fn(&str, &GestureContext) -> bool + 'static) -> Self {
        self.on_tap = Some(Rc::new(handler));
        self
    }

    pub fn on_long_press(
        mut self,
        handler: impl Fn(&str, &GestureContext) -> bool + 'static,
    ) -> Self {
        self.on_long_press = Some(Rc::new(handler));
        self
    }

    pub fn explicit_layer_id(&self) -> Option<&str> {
        self.layer_id.as_deref()
    }

    pub(crate) fn tap_handler(&self) -> Option<&AnnotationGestureHandler> {
        self.on_tap.as_ref()
    }

    pub(crate) fn long_press_handler(&self) -> Option<&AnnotationGestureHandler> {
        self.on_long_press.as_ref()
    }
}

impl fmt::Debug for AnnotationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationGroup")
            .field("kind", &self.kind)
            .field("layer_id", &self.layer_id)
            .field("items", &self.items.len())
            .finish()
    }
}

impl PartialEq for AnnotationGroup {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.items == other.items
            && self.layer_id == other.layer_id
            && self.layer_position == other.layer_position
            && self.slot == other.slot
            && self.layer_properties == other.layer_properties
    }
}

/// Item-level changes pushed to the renderer by one `set_items` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.added + self.updated + self.removed == 0
    }
}

/// Live source + layer pair for one group.
#[derive(Debug)]
pub struct BackingAnnotationManager {
    kind: AnnotationKind,
    layer_id: String,
    source_id: String,
    layer_position: LayerPosition,
    slot: Option<String>,
    layer_properties: Properties,
    items: Vec<ManagedAnnotation>,
}

/// Source id paired with an annotation layer id.
pub fn annotation_source_id(layer_id: &str) -> String {
    format!("{layer_id}-source")
}

impl BackingAnnotationManager {
    /// Allocates the group's source and layer. A failed layer leaves no
    /// source behind.
    pub fn create<R: StyleHost + ?Sized>(
        renderer: &mut R,
        layer_id: String,
        group: &AnnotationGroup,
    ) -> Result<Self, ApplyFailure> {
        let source_id = annotation_source_id(&layer_id);
        renderer
            .add_source(&source_id)
            .map_err(|error| ApplyFailure::new(&source_id, "add_source", error))?;
        let spec = LayerSpec {
            id: layer_id.clone(),
            kind: group.kind.layer_kind(),
            source: source_id.clone(),
            position: group.layer_position.clone(),
            slot: group.slot.clone(),
            properties: group.layer_properties.clone(),
        };
        if let Err(error) = renderer.add_layer(&spec) {
            if let Err(cleanup) = renderer.remove_source(&source_id) {
                log::warn!("removing orphaned source {source_id:?} failed: {cleanup}");
            }
            return Err(ApplyFailure::new(&layer_id, "add_layer", error));
        }
        log::trace!("created annotation manager {layer_id:?}");
        Ok(Self {
            kind: group.kind,
            layer_id,
            source_id,
            layer_position: group.layer_position.clone(),
            slot: group.slot.clone(),
            layer_properties: group.layer_properties.clone(),
            items: Vec::new(),
        })
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn items(&self) -> &[ManagedAnnotation] {
        &self.items
    }

    pub fn layer_position(&self) -> &LayerPosition {
        &self.layer_position
    }

    /// Replaces the item list. The renderer receives a single diff when
    /// anything changed; on failure the previous list is kept.
    pub fn set_items<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        items: Vec<ManagedAnnotation>,
    ) -> Result<ItemChanges, ApplyFailure> {
        let diff = {
            let previous: HashMap<&ItemKey, &Annotation> = self
                .items
                .iter()
                .map(|item| (&item.annotation.id, &item.annotation))
                .collect();
            let incoming: HashSet<&ItemKey> =
                items.iter().map(|item| &item.annotation.id).collect();

            let mut diff = SourceDiff::default();
            for item in &self.items {
                if !incoming.contains(&item.annotation.id) {
                    diff.removed.push(item.annotation.id.to_id_string());
                }
            }
            for item in &items {
                match previous.get(&item.annotation.id) {
                    None => diff.added.push(item.annotation.feature()),
                    Some(old) if **old != item.annotation => {
                        diff.updated.push(item.annotation.feature())
                    }
                    Some(_) => {}
                }
            }
            diff
        };

        let changes = ItemChanges {
            added: diff.added.len(),
            updated: diff.updated.len(),
            removed: diff.removed.len(),
        };
        if !diff.is_empty() {
            renderer
                .apply_source_diff(&self.source_id, &diff)
                .map_err(|error| ApplyFailure::new(&self.source_id, "apply_source_diff", error))?;
        }
        self.items = items;
        Ok(changes)
    }

    /// Applies slot and layer properties when they differ from the last
    /// applied values. Returns whether the renderer was called.
    pub fn update_layer_settings<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        slot: &Option<String>,
        properties: &Properties,
    ) -> Result<bool, ApplyFailure> {
        if &self.slot == slot && &self.layer_properties == properties {
            return Ok(false);
        }
        let update = LayerUpdate {
            slot: slot.clone(),
            properties: properties.clone(),
        };
        renderer
            .update_layer(&self.layer_id, &update)
            .map_err(|error| ApplyFailure::new(&self.layer_id, "update_layer", error))?;
        self.slot = update.slot;
        self.layer_properties = update.properties;
        Ok(true)
    }

    /// Moves the layer when `position` differs from the last applied one.
    /// Returns whether the renderer was called.
    pub fn move_layer<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        position: &LayerPosition,
    ) -> Result<bool, ApplyFailure> {
        if &self.layer_position == position {
            return Ok(false);
        }
        renderer
            .move_layer(&self.layer_id, position)
            .map_err(|error| ApplyFailure::new(&self.layer_id, "move_layer", error))?;
        self.layer_position = position.clone();
        Ok(true)
    }

    /// Removes the layer, then its source. Both removals are attempted.
    pub fn destroy<R: StyleHost + ?Sized>(
        self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) {
        if let Err(error) = renderer.remove_layer(&self.layer_id) {
            record(failures, ApplyFailure::new(&self.layer_id, "remove_layer", error));
        }
        if let Err(error) = renderer.remove_source(&self.source_id) {
            record(failures, ApplyFailure::new(&self.source_id, "remove_source", error));
        }
        log::trace!("destroyed annotation manager {:?}", self.layer_id);
    }

    fn item_mut(&mut self, item: &ItemKey) -> Option<&mut ManagedAnnotation> {
        self.items
            .iter_mut()
            .find(|managed| &managed.annotation.id == item)
    }
}

/// Carries interaction state forward onto a fresh declaration. Later
/// duplicates of an item id are dropped.
fn merge_items(
    previous: &[ManagedAnnotation],
    declared: &[Annotation],
    group: &str,
) -> Vec<ManagedAnnotation> {
    let prior: HashMap<&ItemKey, (bool, bool)> = previous
        .iter()
        .map(|item| (&item.annotation.id, (item.is_selected, item.is_draggable)))
        .collect();
    let mut seen: HashSet<&ItemKey> = HashSet::default();
    let mut merged = Vec::with_capacity(declared.len());
    for annotation in declared {
        if !seen.insert(&annotation.id) {
            log::warn!("annotation group {group:?} declares item {} twice", annotation.id);
            continue;
        }
        let (is_selected, is_draggable) = prior
            .get(&annotation.id)
            .copied()
            .unwrap_or((false, annotation.is_draggable));
        merged.push(ManagedAnnotation {
            annotation: annotation.clone(),
            is_selected,
            is_draggable,
        });
    }
    merged
}

/// Diffs declared annotation groups against live backing managers.
#[derive(Default)]
pub struct AnnotationGroupReconciler {
    managers: BackingTable<BackingAnnotationManager>,
}

/// Declared group together with the identity it resolved to this cycle.
pub struct DeclaredGroup<'a> {
    pub id: ResolvedId,
    pub layer_id: String,
    pub group: &'a AnnotationGroup,
}

impl AnnotationGroupReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn manager(&self, id: &ResolvedId) -> Option<&BackingAnnotationManager> {
        self.managers.get(id)
    }

    pub fn managers(&self) -> impl Iterator<Item = (&ResolvedId, &BackingAnnotationManager)> {
        self.managers.iter()
    }

    pub fn reconcile<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        groups: &[DeclaredGroup<'_>],
        stats: &mut AnnotationStats,
        failures: &mut Vec<ApplyFailure>,
    ) {
        let mut seen: HashSet<ResolvedId> = HashSet::default();
        for declared in groups {
            seen.insert(declared.id.clone());
            self.reconcile_group(renderer, declared, stats, failures);
        }
        for (id, manager) in self.managers.take_absent(&seen) {
            log::trace!("annotation group {id} left the tree");
            manager.destroy(renderer, failures);
            stats.groups.destroyed += 1;
        }
    }

    fn reconcile_group<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        declared: &DeclaredGroup<'_>,
        stats: &mut AnnotationStats,
        failures: &mut Vec<ApplyFailure>,
    ) {
        let group = declared.group;
        let kind_changed = self
            .managers
            .get(&declared.id)
            .is_some_and(|manager| manager.kind != group.kind);
        if kind_changed {
            if let Some(manager) = self.managers.remove(&declared.id) {
                manager.destroy(renderer, failures);
                stats.groups.destroyed += 1;
            }
        }
        if !self.managers.contains(&declared.id) {
            match BackingAnnotationManager::create(renderer, declared.layer_id.clone(), group) {
                Ok(manager) => {
                    self.managers.insert(declared.id.clone(), manager);
                    stats.groups.created += 1;
                }
                Err(failure) => {
                    record(failures, failure);
                    return;
                }
            }
        }
        let Some(manager) = self.managers.get_mut(&declared.id) else {
            return;
        };

        let mut touched = false;
        match manager.update_layer_settings(renderer, &group.slot, &group.layer_properties) {
            Ok(updated) => touched |= updated,
            Err(failure) => record(failures, failure),
        }
        match manager.move_layer(renderer, &group.layer_position) {
            Ok(moved) => touched |= moved,
            Err(failure) => record(failures, failure),
        }
        let items = merge_items(&manager.items, &group.items, &manager.layer_id);
        match manager.set_items(renderer, items) {
            Ok(changes) => {
                touched |= !changes.is_empty();
                stats.items.created += changes.added;
                stats.items.updated += changes.updated;
                stats.items.destroyed += changes.removed;
            }
            Err(failure) => record(failures, failure),
        }
        if touched {
            stats.groups.updated += 1;
        }
    }

    /// Destroys every manager in creation order.
    pub fn teardown<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) -> usize {
        let drained = self.managers.drain();
        let count = drained.len();
        for (_, manager) in drained {
            manager.destroy(renderer, failures);
        }
        count
    }

    /// Marks an item selected. Returns `false` when the group or item is
    /// unknown.
    pub fn set_item_selected(
        &mut self,
        group: &ResolvedId,
        item: &ItemKey,
        selected: bool,
    ) -> bool {
        self.managers
            .get_mut(group)
            .and_then(|manager| manager.item_mut(item))
            .map(|managed| managed.is_selected = selected)
            .is_some()
    }

    pub fn set_item_draggable(
        &mut self,
        group: &ResolvedId,
        item: &ItemKey,
        draggable: bool,
    ) -> bool {
        self.managers
            .get_mut(group)
            .and_then(|manager| manager.item_mut(item))
            .map(|managed| managed.is_draggable = draggable)
            .is_some()
    }

    pub fn selected_items(&self, group: &ResolvedId) -> Vec<ItemKey> {
        self.managers
            .get(group)
            .map(|manager| {
                manager
                    .items
                    .iter()
                    .filter(|item| item.is_selected)
                    .map(|item| item.annotation.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Group- and item-level counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationStats {
    pub groups: ReconcileStats,
    pub items: ReconcileStats,
}

#[cfg(test)]
#[path = "tests/annotations_tests.rs"]
mod tests;
