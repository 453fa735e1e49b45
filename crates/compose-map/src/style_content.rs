//! Style layers and GeoJSON sources declared directly in the content tree.
//!
//! Unlike annotation groups these map one leaf to one renderer object under
//! the host's own id. Layer properties are an opaque bag handed to the
//! renderer untouched.

use compose_map_core::collections::map::HashSet;
use compose_map_core::{BackingTable, ResolvedId};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use compose_map_renderer::{
    Feature, LayerKind, LayerPosition, LayerSpec, LayerUpdate, Properties, SourceDiff, StyleHost,
};

use crate::error::{record, ApplyFailure};
use crate::report::ReconcileStats;

/// A style layer drawn from a source the host names.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleLayer {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    pub position: LayerPosition,
    pub slot: Option<String>,
    pub properties: Properties,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, kind: LayerKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            position: LayerPosition::Top,
            slot: None,
            properties: Properties::new(),
        }
    }

    pub fn position(mut self, position: LayerPosition) -> Self {
        self.position = position;
        self
    }

    pub fn slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    fn spec(&self) -> LayerSpec {
        LayerSpec {
            id: self.id.clone(),
            kind: self.kind,
            source: self.source.clone(),
            position: self.position.clone(),
            slot: self.slot.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// A GeoJSON source whose features are diffed by feature id.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSource {
    pub id: String,
    pub features: Vec<Feature>,
}

impl StyleSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            features: Vec::new(),
        }
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StyleStats {
    pub sources: ReconcileStats,
    pub layers: ReconcileStats,
}

/// Last layer state the renderer accepted.
#[derive(Debug)]
struct MountedLayer {
    spec: LayerSpec,
}

/// Features the renderer holds for a live source, keyed by feature id.
#[derive(Debug)]
struct MountedSource {
    id: String,
    features: IndexMap<String, Feature>,
}

/// Diffs declared style layers and sources against what the renderer holds.
///
/// Sources are created before layers and removed after them, so a layer
/// never outlives the source it draws from.
#[derive(Default)]
pub struct StyleContentReconciler {
    sources: BackingTable<MountedSource>,
    layers: BackingTable<MountedLayer>,
}

impl StyleContentReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn has_layer(&self, id: &ResolvedId) -> bool {
        self.layers.contains(id)
    }

    pub fn has_source(&self, id: &ResolvedId) -> bool {
        self.sources.contains(id)
    }

    pub fn reconcile<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        sources: &[(ResolvedId, &StyleSource)],
        layers: &[(ResolvedId, &StyleLayer)],
        failures: &mut Vec<ApplyFailure>,
    ) -> StyleStats {
        let mut stats = StyleStats::default();

        let mut seen_sources: HashSet<ResolvedId> = HashSet::default();
        for (id, source) in sources {
            seen_sources.insert(id.clone());
            self.reconcile_source(renderer, id, source, &mut stats.sources, failures);
        }

        let mut seen_layers: HashSet<ResolvedId> = HashSet::default();
        for (id, layer) in layers {
            seen_layers.insert(id.clone());
            self.reconcile_layer(renderer, id, layer, &mut stats.layers, failures);
        }

        for (id, mounted) in self.layers.take_absent(&seen_layers) {
            log::trace!("style layer {id} left the tree");
            remove_layer(renderer, &mounted, failures);
            stats.layers.destroyed += 1;
        }
        for (id, mounted) in self.sources.take_absent(&seen_sources) {
            log::trace!("style source {id} left the tree");
            remove_source(renderer, &mounted, failures);
            stats.sources.destroyed += 1;
        }
        stats
    }

    fn reconcile_source<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        id: &ResolvedId,
        source: &StyleSource,
        stats: &mut ReconcileStats,
        failures: &mut Vec<ApplyFailure>,
    ) {
        let created = !self.sources.contains(id);
        if created {
            if let Err(error) = renderer.add_source(&source.id) {
                record(failures, ApplyFailure::new(&source.id, "add_source", error));
                return;
            }
            self.sources.insert(
                id.clone(),
                MountedSource {
                    id: source.id.clone(),
                    features: IndexMap::new(),
                },
            );
            stats.created += 1;
        }
        let Some(mounted) = self.sources.get_mut(id) else {
            return;
        };
        let incoming = dedup_features(&source.id, &source.features);
        let mut diff = SourceDiff::default();
        for feature_id in mounted.features.keys() {
            if !incoming.contains_key(feature_id) {
                diff.removed.push(feature_id.clone());
            }
        }
        for (feature_id, feature) in &incoming {
            match mounted.features.get(feature_id) {
                None => diff.added.push(feature.clone()),
                Some(old) if old != feature => diff.updated.push(feature.clone()),
                Some(_) => {}
            }
        }
        if diff.is_empty() {
            return;
        }
        match renderer.apply_source_diff(&source.id, &diff) {
            Ok(()) => {
                mounted.features = incoming;
                if !created {
                    stats.updated += 1;
                }
            }
            Err(error) => record(
                failures,
                ApplyFailure::new(&source.id, "apply_source_diff", error),
            ),
        }
    }

    fn reconcile_layer<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        id: &ResolvedId,
        layer: &StyleLayer,
        stats: &mut ReconcileStats,
        failures: &mut Vec<ApplyFailure>,
    ) {
        let replaced = self.layers.get(id).is_some_and(|mounted| {
            mounted.spec.kind != layer.kind || mounted.spec.source != layer.source
        });
        if replaced {
            if let Some(mounted) = self.layers.remove(id) {
                remove_layer(renderer, &mounted, failures);
                stats.destroyed += 1;
            }
        }

        if !self.layers.contains(id) {
            let spec = layer.spec();
            match renderer.add_layer(&spec) {
                Ok(()) => {
                    self.layers.insert(id.clone(), MountedLayer { spec });
                    stats.created += 1;
                }
                Err(error) => record(failures, ApplyFailure::new(&layer.id, "add_layer", error)),
            }
            return;
        }
        let Some(mounted) = self.layers.get_mut(id) else {
            return;
        };

        let mut touched = false;
        if mounted.spec.slot != layer.slot || mounted.spec.properties != layer.properties {
            let update = LayerUpdate {
                slot: layer.slot.clone(),
                properties: layer.properties.clone(),
            };
            match renderer.update_layer(&layer.id, &update) {
                Ok(()) => {
                    mounted.spec.slot = update.slot;
                    mounted.spec.properties = update.properties;
                    touched = true;
                }
                Err(error) => {
                    record(failures, ApplyFailure::new(&layer.id, "update_layer", error))
                }
            }
        }
        if mounted.spec.position != layer.position {
            match renderer.move_layer(&layer.id, &layer.position) {
                Ok(()) => {
                    mounted.spec.position = layer.position.clone();
                    touched = true;
                }
                Err(error) => record(failures, ApplyFailure::new(&layer.id, "move_layer", error)),
            }
        }
        if touched {
            stats.updated += 1;
        }
    }

    /// Removes every layer, then every source. Returns how many objects
    /// were released.
    pub fn teardown<R: StyleHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) -> usize {
        let layers = self.layers.drain();
        let sources = self.sources.drain();
        let count = layers.len() + sources.len();
        for (_, mounted) in layers {
            remove_layer(renderer, &mounted, failures);
        }
        for (_, mounted) in sources {
            remove_source(renderer, &mounted, failures);
        }
        count
    }
}

/// Later features reusing an id are dropped.
fn dedup_features(source: &str, features: &[Feature]) -> IndexMap<String, Feature> {
    let mut out: IndexMap<String, Feature> = IndexMap::with_capacity(features.len());
    for feature in features {
        if out.contains_key(&feature.id) {
            log::warn!("style source {source:?} declares feature {:?} twice", feature.id);
            continue;
        }
        out.insert(feature.id.clone(), feature.clone());
    }
    out
}

fn remove_layer<R: StyleHost + ?Sized>(
    renderer: &mut R,
    mounted: &MountedLayer,
    failures: &mut Vec<ApplyFailure>,
) {
    if let Err(error) = renderer.remove_layer(&mounted.spec.id) {
        record(failures, ApplyFailure::new(&mounted.spec.id, "remove_layer", error));
    }
}

fn remove_source<R: StyleHost + ?Sized>(
    renderer: &mut R,
    mounted: &MountedSource,
    failures: &mut Vec<ApplyFailure>,
) {
    if let Err(error) = renderer.remove_source(&mounted.id) {
        record(failures, ApplyFailure::new(&mounted.id, "remove_source", error));
    }
}

#[cfg(test)]
#[path = "tests/style_content_tests.rs"]
mod tests;
