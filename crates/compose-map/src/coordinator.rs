//! Drives every reconciler from one declaration per host update.

use compose_map_core::collections::map::HashMap;
use compose_map_core::{ContentError, ItemKey, PositionalId, ResolvedId, RuntimeHandle};
use compose_map_renderer::{MapRenderer, ScreenPoint};

use crate::annotations::{
    annotation_source_id, AnnotationGroupReconciler, AnnotationStats, DeclaredGroup,
};
use crate::camera_sync::{CameraSynchronizer, SuppressionGate};
use crate::debug::log_cycle_report;
use crate::declaration::{MapContent, MapDeclaration};
use crate::error::ApplyFailure;
use crate::events::EventSubscriptionRegistry;
use crate::gestures::{AnnotationRoute, ContentGestureDispatcher, GestureKind, GestureRoutes};
use crate::report::CycleReport;
use crate::style_content::{StyleContentReconciler, StyleLayer, StyleSource};
use crate::view_overlays::{ViewOverlay, ViewOverlayReconciler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Prefix of renderer ids derived from tree positions.
    pub id_prefix: String,
    /// Log a one-line summary of every cycle at debug level.
    pub log_cycle_summary: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            id_prefix: "compose-map".to_owned(),
            log_cycle_summary: true,
        }
    }
}

/// Owns the backing state of one map and keeps it in line with the latest
/// [`MapDeclaration`].
pub struct MapCoordinator {
    options: CoordinatorOptions,
    camera: CameraSynchronizer,
    style: StyleContentReconciler,
    annotations: AnnotationGroupReconciler,
    overlays: ViewOverlayReconciler,
    events: EventSubscriptionRegistry,
    gestures: ContentGestureDispatcher,
    cycle: u64,
}

impl MapCoordinator {
    pub fn new(runtime: RuntimeHandle, options: CoordinatorOptions) -> Self {
        Self {
            options,
            camera: CameraSynchronizer::new(runtime),
            style: StyleContentReconciler::new(),
            annotations: AnnotationGroupReconciler::new(),
            overlays: ViewOverlayReconciler::new(),
            events: EventSubscriptionRegistry::new(),
            gestures: ContentGestureDispatcher::new(),
            cycle: 0,
        }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Number of completed update cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn style(&self) -> &StyleContentReconciler {
        &self.style
    }

    pub fn annotations(&self) -> &AnnotationGroupReconciler {
        &self.annotations
    }

    pub fn overlays(&self) -> &ViewOverlayReconciler {
        &self.overlays
    }

    pub fn events(&self) -> &EventSubscriptionRegistry {
        &self.events
    }

    pub fn gestures(&self) -> &ContentGestureDispatcher {
        &self.gestures
    }

    pub fn camera_gate(&self) -> SuppressionGate {
        self.camera.gate()
    }

    /// Reconciles the renderer against `declaration`.
    ///
    /// A tree with colliding ids is rejected before the renderer sees any
    /// call. Renderer failures do not abort the cycle; they are collected in
    /// the returned report.
    pub fn update<R: MapRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        declaration: &MapDeclaration,
    ) -> Result<CycleReport, ContentError> {
        let leaves = match declaration.content.resolve() {
            Ok(leaves) => leaves,
            Err(error) => {
                log::error!("map content rejected: {error}");
                return Err(error);
            }
        };

        let mut groups: Vec<DeclaredGroup<'_>> = Vec::new();
        let mut overlays: Vec<(ResolvedId, &ViewOverlay)> = Vec::new();
        let mut layers: Vec<(ResolvedId, &StyleLayer)> = Vec::new();
        let mut sources: Vec<(ResolvedId, &StyleSource)> = Vec::new();
        let mut claims = RendererIdClaims::default();
        for leaf in &leaves {
            let claimed = match leaf.payload {
                MapContent::Annotations(group) => {
                    let layer_id = leaf.id.string_id(&self.options.id_prefix);
                    let claimed = claims
                        .claim("source", annotation_source_id(&layer_id), &leaf.path)
                        .and_then(|()| claims.claim("layer", layer_id.clone(), &leaf.path));
                    groups.push(DeclaredGroup {
                        layer_id,
                        id: leaf.id.clone(),
                        group,
                    });
                    claimed
                }
                MapContent::Layer(layer) => {
                    layers.push((leaf.id.clone(), layer));
                    claims.claim("layer", layer.id.clone(), &leaf.path)
                }
                MapContent::Source(source) => {
                    sources.push((leaf.id.clone(), source));
                    claims.claim("source", source.id.clone(), &leaf.path)
                }
                MapContent::Overlay(overlay) => {
                    overlays.push((leaf.id.clone(), overlay));
                    Ok(())
                }
            };
            if let Err(error) = claimed {
                log::error!("map content rejected: {error}");
                return Err(error);
            }
        }

        self.cycle += 1;
        let mut failures = Vec::new();
        let camera = self.camera.update(
            renderer,
            &declaration.viewport,
            declaration.animation.as_ref(),
            &declaration.settings,
            declaration.camera_changed.clone(),
            &mut failures,
        );
        let style = self
            .style
            .reconcile(renderer, &sources, &layers, &mut failures);
        let mut annotations = AnnotationStats::default();
        self.annotations
            .reconcile(renderer, &groups, &mut annotations, &mut failures);
        let overlay_stats = self.overlays.reconcile(renderer, &overlays, &mut failures);
        let subscriptions_attached =
            self.events.update(renderer, &declaration.subscriptions, &mut failures);
        let routes = self.gesture_routes(&groups, declaration);
        self.gestures.set_routes(routes);

        let report = CycleReport {
            cycle: self.cycle,
            leaves: leaves.len(),
            camera,
            style,
            annotations,
            overlays: overlay_stats,
            subscriptions_attached,
            failures,
        };
        if self.options.log_cycle_summary {
            log_cycle_report(&report);
        }
        Ok(report)
    }

    /// Annotation routes only cover groups whose manager exists, so a group
    /// that failed to materialize is never queried.
    fn gesture_routes(
        &self,
        groups: &[DeclaredGroup<'_>],
        declaration: &MapDeclaration,
    ) -> GestureRoutes {
        let annotations = groups
            .iter()
            .filter_map(|declared| {
                let manager = self.annotations.manager(&declared.id)?;
                Some(AnnotationRoute {
                    layer_id: manager.layer_id().to_owned(),
                    on_tap: declared.group.tap_handler().cloned(),
                    on_long_press: declared.group.long_press_handler().cloned(),
                })
            })
            .collect();
        GestureRoutes {
            annotations,
            layer_taps: declaration.layer_taps.clone(),
            layer_long_presses: declaration.layer_long_presses.clone(),
            on_map_tap: declaration.on_map_tap.clone(),
            on_map_long_press: declaration.on_map_long_press.clone(),
        }
    }

    pub fn tap<R: MapRenderer + ?Sized>(&mut self, renderer: &mut R, point: ScreenPoint) {
        self.gestures.handle(renderer, GestureKind::Tap, point);
    }

    pub fn long_press<R: MapRenderer + ?Sized>(&mut self, renderer: &mut R, point: ScreenPoint) {
        self.gestures.handle(renderer, GestureKind::LongPress, point);
    }

    /// Selection state of an item, kept across cycles while the item stays
    /// declared.
    pub fn set_item_selected(
        &mut self,
        group: &ResolvedId,
        item: &ItemKey,
        selected: bool,
    ) -> bool {
        self.annotations.set_item_selected(group, item, selected)
    }

    pub fn set_item_draggable(
        &mut self,
        group: &ResolvedId,
        item: &ItemKey,
        draggable: bool,
    ) -> bool {
        self.annotations.set_item_draggable(group, item, draggable)
    }

    pub fn selected_items(&self, group: &ResolvedId) -> Vec<ItemKey> {
        self.annotations.selected_items(group)
    }

    /// Releases every backing resource. The coordinator can be reused
    /// afterwards; the next update starts from scratch.
    pub fn teardown<R: MapRenderer + ?Sized>(&mut self, renderer: &mut R) -> Vec<ApplyFailure> {
        let mut failures = Vec::new();
        self.gestures.cancel_all();
        self.gestures.set_routes(GestureRoutes::default());
        let overlays = self.overlays.teardown(renderer, &mut failures);
        let groups = self.annotations.teardown(renderer, &mut failures);
        let style = self.style.teardown(renderer, &mut failures);
        self.events.teardown(renderer, &mut failures);
        self.camera.teardown(renderer, &mut failures);
        log::debug!(
            "map coordinator torn down: {groups} annotation groups, {style} style objects, {overlays} overlays, {} failures",
            failures.len()
        );
        failures
    }
}

/// Renderer ids handed out so far in one cycle, per resource kind.
#[derive(Default)]
struct RendererIdClaims {
    claimed: HashMap<(&'static str, String), PositionalId>,
}

impl RendererIdClaims {
    fn claim(
        &mut self,
        resource: &'static str,
        id: String,
        path: &PositionalId,
    ) -> Result<(), ContentError> {
        let key = (resource, id);
        if let Some(first) = self.claimed.get(&key) {
            return Err(ContentError::DuplicateRendererId {
                resource,
                id: key.1,
                first: first.clone(),
                second: path.clone(),
            });
        }
        self.claimed.insert(key, path.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
