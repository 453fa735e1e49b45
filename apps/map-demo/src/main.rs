use std::error::Error;

use compose_map::renderer::{
    CameraOptions, Coordinate, Geometry, HeadlessMapRenderer, MapEventKind, NativeView,
    Properties, RenderedFeature, ScreenPoint, ScreenRect, TransitionOutcome, ViewAnchor,
};
use compose_map::{
    annotations, format_renderer_calls, overlay, Annotation, AnnotationGroup, AnnotationKind,
    Binding, ContentNode, CycleReport, MapDeclaration, ViewOverlay, Viewport, ViewportAnimation,
};
use compose_map_core::RuntimeHandle;
use compose_map_shell::{MapShell, ShellConfig};

const PIN_LAYER: &str = "pins";
const MAX_SETTLE_ROUNDS: usize = 8;

#[derive(Clone, Debug)]
struct Pin {
    id: &'static str,
    location: Coordinate,
}

impl Pin {
    fn new(id: &'static str, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            location: Coordinate::new(latitude, longitude),
        }
    }
}

/// Host-side state the declaration is rebuilt from.
struct DemoState {
    pins: Vec<Pin>,
    selected: Binding<Vec<&'static str>>,
    viewport: Binding<Viewport>,
    animation: Option<ViewportAnimation>,
}

impl DemoState {
    fn new(runtime: RuntimeHandle) -> Self {
        Self {
            pins: vec![
                Pin::new("harbor", 59.437, 24.753),
                Pin::new("old-town", 59.436, 24.745),
                Pin::new("station", 59.440, 24.737),
            ],
            selected: Binding::with_runtime(Vec::new(), runtime.clone()),
            viewport: Binding::with_runtime(
                Viewport::camera(
                    CameraOptions::new()
                        .center(Coordinate::new(59.437, 24.745))
                        .zoom(13.0),
                ),
                runtime,
            ),
            animation: None,
        }
    }

    fn declaration(&self) -> MapDeclaration {
        let selected = self.selected.clone();
        let group = AnnotationGroup::new(
            AnnotationKind::Circle,
            self.pins
                .iter()
                .map(|pin| {
                    Annotation::new(pin.id, Geometry::Point(pin.location))
                        .property("title", pin.id)
                })
                .collect(),
        )
        .layer_id(PIN_LAYER)
        .on_tap(move |item, _| {
            let item = item.to_owned();
            selected.update(|ids| {
                if let Some(index) = ids.iter().position(|id| *id == item) {
                    ids.remove(index);
                } else if let Some(known) = known_pin(&item) {
                    ids.push(known);
                }
            });
            true
        });

        let selected_ids = self.selected.get();
        let callouts = ContentNode::for_each(
            self.pins
                .iter()
                .filter(|pin| selected_ids.contains(&pin.id))
                .cloned()
                .collect::<Vec<_>>(),
            |pin| pin.id,
            |pin| {
                let label = format!("callout for {}", pin.id);
                overlay(
                    ViewOverlay::new(pin.id, ViewAnchor::Coordinate(pin.location), move || {
                        Box::new(label.clone()) as NativeView
                    })
                    .allow_overlap(true),
                )
            },
        );

        let mut declaration = MapDeclaration::new(ContentNode::composite([
            annotations(group),
            callouts,
        ]))
        .bound_viewport(self.viewport.clone())
        .on_camera_changed(|camera| {
            log::info!(
                "camera at {:.3},{:.3} zoom {:.1}",
                camera.center.latitude,
                camera.center.longitude,
                camera.zoom
            );
        })
        .on_event(MapEventKind::MapIdle, |_| log::info!("map idle"))
        .on_map_tap(|context| {
            log::info!(
                "map tapped at {:.1},{:.1}",
                context.point.x,
                context.point.y
            )
        });
        if let Some(animation) = &self.animation {
            declaration = declaration.animation(animation.clone());
        }
        declaration
    }
}

fn known_pin(id: &str) -> Option<&'static str> {
    ["harbor", "old-town", "station", "airport"]
        .into_iter()
        .find(|known| *known == id)
}

fn print_step(
    title: &str,
    shell: &mut MapShell<HeadlessMapRenderer>,
    report: &CycleReport,
) -> Result<(), Box<dyn Error>> {
    println!("── {title} ──");
    print!("{}", format_renderer_calls(&shell.renderer_mut().take_calls()));
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Rebuilds the declaration and pumps until the shell stops asking for turns.
fn settle(
    title: &str,
    shell: &mut MapShell<HeadlessMapRenderer>,
    state: &DemoState,
) -> Result<(), Box<dyn Error>> {
    for round in 0..MAX_SETTLE_ROUNDS {
        let report = shell.update(&state.declaration())?;
        print_step(title, shell, &report)?;
        let executed = shell.pump();
        if executed > 0 {
            log::debug!("{title}: round {round} pumped {executed} tasks");
        }
        if !shell.needs_turn() {
            return Ok(());
        }
    }
    log::warn!("{title}: still busy after {MAX_SETTLE_ROUNDS} rounds");
    Ok(())
}

fn tap_pin(shell: &mut MapShell<HeadlessMapRenderer>, pin: &str, point: ScreenPoint) {
    shell
        .renderer_mut()
        .set_rendered_features(vec![RenderedFeature {
            layer_id: PIN_LAYER.to_owned(),
            feature_id: Some(pin.to_owned()),
            area: ScreenRect {
                origin: ScreenPoint::new(point.x - 8.0, point.y - 8.0),
                width: 16.0,
                height: 16.0,
            },
            properties: Properties::new(),
        }]);
    shell.tap(point);
    shell.renderer_mut().complete_queries();
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== compose-map headless demo ===");

    let mut shell = MapShell::new(HeadlessMapRenderer::new(), ShellConfig::default());
    let mut state = DemoState::new(shell.runtime_handle());

    settle("initial pins", &mut shell, &state)?;

    tap_pin(&mut shell, "old-town", ScreenPoint::new(120.0, 80.0));
    settle("select old-town", &mut shell, &state)?;

    state.pins.push(Pin::new("airport", 59.413, 24.832));
    settle("insert airport", &mut shell, &state)?;

    state.pins.reverse();
    settle("reorder", &mut shell, &state)?;

    state.pins.retain(|pin| pin.id != "harbor");
    settle("delete harbor", &mut shell, &state)?;

    state.animation = Some(
        ViewportAnimation::fly(800)
            .on_completion(|finished| log::info!("viewport transition finished: {finished}")),
    );
    state.viewport.set(Viewport::camera(
        CameraOptions::new()
            .center(Coordinate::new(59.413, 24.832))
            .zoom(15.0),
    ));
    settle("fly to airport", &mut shell, &state)?;
    shell
        .renderer_mut()
        .finish_transition(TransitionOutcome::Completed);
    shell.pump();

    shell.renderer_mut().set_rendered_features(Vec::new());
    shell.tap(ScreenPoint::new(10.0, 10.0));
    shell.renderer_mut().complete_queries();

    let failures = shell.teardown();
    println!(
        "── teardown ── {} failures, {} layers left",
        failures.len(),
        shell.renderer().layer_ids().len()
    );
    Ok(())
}
