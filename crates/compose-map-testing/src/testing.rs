//! [`TestMap`]: a [`MapShell`] over the headless renderer, plus small
//! builders for the content tests keep writing.

use compose_map::renderer::{
    Coordinate, Geometry, HeadlessMapRenderer, Properties, RenderedFeature, RendererCall,
    ScreenPoint, ScreenRect,
};
use compose_map::{
    Annotation, AnnotationGroup, AnnotationKind, CoordinatorOptions, CycleReport, MapCoordinator,
    MapDeclaration,
};
use compose_map_shell::{MapShell, ShellConfig};

/// Rebuild limit for [`TestMap::settle`].
const MAX_SETTLE_ROUNDS: usize = 32;

pub struct TestMap {
    shell: MapShell<HeadlessMapRenderer>,
}

impl TestMap {
    pub fn new() -> Self {
        Self::with_renderer(HeadlessMapRenderer::new())
    }

    pub fn with_renderer(renderer: HeadlessMapRenderer) -> Self {
        let config = ShellConfig {
            coordinator: CoordinatorOptions {
                log_cycle_summary: false,
                ..CoordinatorOptions::default()
            },
            ..ShellConfig::default()
        };
        Self {
            shell: MapShell::new(renderer, config),
        }
    }

    /// Runs one cycle and panics if the content does not resolve.
    pub fn render(&mut self, declaration: &MapDeclaration) -> CycleReport {
        self.shell
            .update(declaration)
            .unwrap_or_else(|err| panic!("map content failed to resolve: {err}"))
    }

    /// Renders, pumps, and re-renders with a fresh declaration until the
    /// shell stops asking for turns.
    pub fn settle(&mut self, mut build: impl FnMut() -> MapDeclaration) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        for _ in 0..MAX_SETTLE_ROUNDS {
            reports.push(self.render(&build()));
            self.shell.pump();
            if !self.shell.needs_turn() {
                return reports;
            }
        }
        panic!("map did not settle after {MAX_SETTLE_ROUNDS} rounds");
    }

    pub fn pump(&mut self) -> usize {
        self.shell.pump()
    }

    pub fn needs_turn(&self) -> bool {
        self.shell.needs_turn()
    }

    pub fn renderer(&self) -> &HeadlessMapRenderer {
        self.shell.renderer()
    }

    pub fn renderer_mut(&mut self) -> &mut HeadlessMapRenderer {
        self.shell.renderer_mut()
    }

    pub fn coordinator(&self) -> &MapCoordinator {
        self.shell.coordinator()
    }

    pub fn shell_mut(&mut self) -> &mut MapShell<HeadlessMapRenderer> {
        &mut self.shell
    }

    pub fn calls(&self) -> &[RendererCall] {
        self.shell.renderer().calls()
    }

    pub fn take_calls(&mut self) -> Vec<RendererCall> {
        self.shell.renderer_mut().take_calls()
    }

    /// Taps `point` and releases the resulting feature query.
    pub fn tap(&mut self, point: ScreenPoint) {
        self.shell.tap(point);
        self.shell.renderer_mut().complete_queries();
    }

    pub fn long_press(&mut self, point: ScreenPoint) {
        self.shell.long_press(point);
        self.shell.renderer_mut().complete_queries();
    }

    /// Places a 10x10 rendered feature centred on `point` and taps it.
    pub fn tap_feature(&mut self, layer_id: &str, feature_id: &str, point: ScreenPoint) {
        self.shell
            .renderer_mut()
            .set_rendered_features(vec![feature_at(layer_id, feature_id, point)]);
        self.tap(point);
    }

    /// Serialized report, for snapshot-style assertions.
    pub fn report_json(report: &CycleReport) -> serde_json::Value {
        serde_json::to_value(report)
            .unwrap_or_else(|err| panic!("cycle report failed to serialize: {err}"))
    }
}

impl Default for TestMap {
    fn default() -> Self {
        Self::new()
    }
}

/// A point annotation at `lat`/`lng`.
pub fn pin(id: impl Into<compose_map::ItemKey>, lat: f64, lng: f64) -> Annotation {
    Annotation::new(id, Geometry::Point(Coordinate::new(lat, lng)))
}

/// A group of point annotations keyed by the given string ids.
pub fn pin_group(kind: AnnotationKind, pins: &[(&str, f64, f64)]) -> AnnotationGroup {
    AnnotationGroup::new(
        kind,
        pins.iter()
            .map(|(id, lat, lng)| pin(*id, *lat, *lng))
            .collect(),
    )
}

/// A rendered feature occupying a 10x10 square around `point`.
pub fn feature_at(layer_id: &str, feature_id: &str, point: ScreenPoint) -> RenderedFeature {
    RenderedFeature {
        layer_id: layer_id.to_owned(),
        feature_id: Some(feature_id.to_owned()),
        area: ScreenRect {
            origin: ScreenPoint::new(point.x - 5.0, point.y - 5.0),
            width: 10.0,
            height: 10.0,
        },
        properties: Properties::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use compose_map::renderer::{CameraHost, CameraOptions};
    use compose_map::{annotations, Binding, ContentNode, Viewport};

    use super::*;

    #[test]
    fn render_materializes_declared_pins() {
        let mut map = TestMap::new();
        let group = pin_group(AnnotationKind::Circle, &[("a", 1.0, 2.0), ("b", 3.0, 4.0)])
            .layer_id("pins");

        let report = map.render(&MapDeclaration::new(annotations(group)));

        assert_eq!(report.annotations.groups.created, 1);
        let features = map
            .renderer()
            .source_features("pins-source")
            .expect("source exists");
        assert_eq!(features.len(), 2);
        assert_eq!(TestMap::report_json(&report)["leaves"], 1);
    }

    #[test]
    fn tap_feature_reaches_the_group_handler() {
        let mut map = TestMap::new();
        let tapped: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&tapped);
        let group = pin_group(AnnotationKind::Point, &[("7", 0.0, 0.0)])
            .layer_id("pins")
            .on_tap(move |item, _| {
                sink.borrow_mut().push(item.to_owned());
                true
            });
        map.render(&MapDeclaration::new(annotations(group)));

        map.tap_feature("pins", "7", ScreenPoint::new(40.0, 40.0));

        assert_eq!(tapped.borrow().as_slice(), ["7".to_owned()]);
    }

    #[test]
    fn settle_rebuilds_after_a_bound_write() {
        let mut map = TestMap::new();
        let viewport = Binding::with_runtime(
            Viewport::camera(CameraOptions::new().zoom(4.0)),
            map.shell_mut().runtime_handle(),
        );
        let declare = || MapDeclaration::new(ContentNode::empty()).bound_viewport(viewport.clone());
        map.settle(declare);

        map.renderer_mut()
            .simulate_user_pan(&CameraOptions::new().zoom(9.0));
        let reports = map.settle(declare);

        assert!(viewport.with(Viewport::is_idle));
        assert!(reports.iter().all(|report| !report.camera.viewport_applied));
        assert_eq!(map.renderer().camera_state().zoom, 9.0);
    }
}
