use super::*;
use compose_map_core::{DefaultScheduler, Runtime};
use compose_map_renderer::{
    CameraOptions, Coordinate, CoordinateBounds, HeadlessMapRenderer, HostOperation, RendererCall,
    RendererError,
};
use std::cell::Cell;
use std::sync::Arc;

struct Fixture {
    runtime: Runtime,
    renderer: HeadlessMapRenderer,
    sync: CameraSynchronizer,
    seen: Rc<RefCell<Vec<CameraSnapshot>>>,
}

impl Fixture {
    fn new() -> Self {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let sync = CameraSynchronizer::new(runtime.handle());
        Self {
            runtime,
            renderer: HeadlessMapRenderer::new(),
            sync,
            seen: Rc::default(),
        }
    }

    fn handlers(&self) -> Vec<CameraChangedHandler> {
        let sink = Rc::clone(&self.seen);
        let handler: CameraChangedHandler =
            Rc::new(move |camera: &CameraSnapshot| sink.borrow_mut().push(*camera));
        vec![handler]
    }

    fn cycle_with(
        &mut self,
        source: &ViewportSource,
        animation: Option<&ViewportAnimation>,
        settings: &MapSettings,
    ) -> (CameraReport, Vec<ApplyFailure>) {
        let mut failures = Vec::new();
        let handlers = self.handlers();
        let report = self.sync.update(
            &mut self.renderer,
            source,
            animation,
            settings,
            handlers,
            &mut failures,
        );
        (report, failures)
    }

    fn cycle(&mut self, source: &ViewportSource) -> CameraReport {
        let (report, failures) = self.cycle_with(source, None, &MapSettings::default());
        assert!(failures.is_empty(), "unexpected failures: {failures:?}");
        report
    }

    fn seen_zooms(&self) -> Vec<f64> {
        self.seen.borrow().iter().map(|camera| camera.zoom).collect()
    }
}

fn zoomed(zoom: f64) -> Viewport {
    Viewport::camera(CameraOptions::new().zoom(zoom))
}

#[test]
fn constant_viewport_is_applied_on_the_first_cycle_only() {
    let mut fixture = Fixture::new();
    let source = ViewportSource::Constant(zoomed(5.0));

    let report = fixture.cycle(&source);
    assert!(report.viewport_applied);
    assert!(report.camera_changed);
    assert_eq!(fixture.renderer.camera_state().zoom, 5.0);

    fixture.renderer.clear_calls();
    let report = fixture.cycle(&ViewportSource::Constant(zoomed(9.0)));
    assert!(!report.viewport_applied);
    assert_eq!(fixture.renderer.camera_mutations(), 0);
}

#[test]
fn camera_notifications_are_withheld_until_the_next_turn() {
    let mut fixture = Fixture::new();

    fixture.cycle(&ViewportSource::Constant(zoomed(5.0)));

    assert!(fixture.seen.borrow().is_empty());
    assert!(fixture.sync.gate().is_raised());
    assert!(fixture.sync.gate().is_resume_pending());
    assert!(fixture.runtime.has_pending_tasks());

    fixture.runtime.drain_tasks();
    assert_eq!(fixture.seen_zooms(), vec![5.0]);
    assert!(!fixture.sync.gate().is_raised());

    fixture.runtime.drain_tasks();
    assert_eq!(fixture.seen_zooms(), vec![5.0]);
}

#[test]
fn cycle_without_camera_change_lowers_the_gate_synchronously() {
    let mut fixture = Fixture::new();
    let binding = Binding::new(zoomed(5.0));
    let source = ViewportSource::Bound(binding);
    fixture.cycle(&source);
    fixture.runtime.drain_tasks();

    let report = fixture.cycle(&source);
    assert!(!report.camera_changed);
    assert!(!fixture.sync.gate().is_raised());
    assert!(!fixture.runtime.has_pending_tasks());

    fixture
        .renderer
        .simulate_user_pan(&CameraOptions::new().zoom(7.0));
    assert_eq!(fixture.seen_zooms(), vec![5.0, 7.0]);
}

#[test]
fn bound_viewport_is_applied_when_its_value_changes() {
    let mut fixture = Fixture::new();
    let binding = Binding::new(zoomed(3.0));
    let source = ViewportSource::Bound(binding.clone());

    fixture.cycle(&source);
    fixture.cycle(&source);
    assert_eq!(fixture.renderer.camera_mutations(), 1);

    binding.set(zoomed(6.0));
    let report = fixture.cycle(&source);
    assert!(report.viewport_applied);
    assert_eq!(fixture.renderer.camera_mutations(), 2);
    assert_eq!(fixture.renderer.camera_state().zoom, 6.0);
}

#[test]
fn user_interaction_writes_idle_back_into_the_binding() {
    let mut fixture = Fixture::new();
    let binding = Binding::new(zoomed(3.0));
    let source = ViewportSource::Bound(binding.clone());
    fixture.cycle(&source);
    fixture.runtime.drain_tasks();
    let writes = binding.write_count();

    fixture
        .renderer
        .simulate_user_pan(&CameraOptions::new().center(Coordinate::new(10.0, 20.0)));

    assert_eq!(binding.get(), Viewport::Idle);
    assert_eq!(binding.write_count(), writes + 1);
    assert_eq!(fixture.sync.last_applied(), Some(Viewport::Idle));

    fixture.renderer.clear_calls();
    let report = fixture.cycle(&source);
    assert!(!report.viewport_applied);
    assert_eq!(
        fixture
            .renderer
            .count_calls(|call| matches!(call, RendererCall::IdleViewport)),
        0
    );
}

#[test]
fn idle_declared_by_the_host_idles_the_renderer() {
    let mut fixture = Fixture::new();
    let binding = Binding::new(zoomed(3.0));
    let source = ViewportSource::Bound(binding.clone());
    fixture.cycle(&source);

    binding.set(Viewport::Idle);
    let report = fixture.cycle(&source);

    assert!(report.viewport_applied);
    assert_eq!(fixture.renderer.viewport_status(), ViewportStatus::Idle);
    assert_eq!(
        fixture
            .renderer
            .count_calls(|call| matches!(call, RendererCall::IdleViewport)),
        1
    );
}

#[test]
fn animation_completion_runs_on_a_later_turn() {
    let mut fixture = Fixture::new();
    let finished = Rc::new(Cell::new(None));
    let sink = Rc::clone(&finished);
    let animation = ViewportAnimation::easing(300).on_completion(move |done| sink.set(Some(done)));
    let source = ViewportSource::Bound(Binding::new(zoomed(8.0)));

    let (report, _) = fixture.cycle_with(&source, Some(&animation), &MapSettings::default());
    assert!(report.viewport_applied);
    assert!(!report.camera_changed);
    assert_eq!(
        fixture.renderer.viewport_status(),
        ViewportStatus::Transitioning
    );

    fixture
        .renderer
        .finish_transition(TransitionOutcome::Completed);
    assert_eq!(finished.get(), None);
    assert_eq!(fixture.seen_zooms(), vec![8.0]);

    fixture.runtime.drain_tasks();
    assert_eq!(finished.get(), Some(true));
}

#[test]
fn interrupted_animation_reports_false() {
    let mut fixture = Fixture::new();
    let finished = Rc::new(Cell::new(None));
    let sink = Rc::clone(&finished);
    let animation = ViewportAnimation::fly(500).on_completion(move |done| sink.set(Some(done)));
    let source = ViewportSource::Bound(Binding::new(zoomed(8.0)));
    fixture.cycle_with(&source, Some(&animation), &MapSettings::default());

    fixture
        .renderer
        .simulate_user_pan(&CameraOptions::new().zoom(2.0));
    fixture.runtime.drain_tasks();

    assert_eq!(finished.get(), Some(false));
}

#[test]
fn settings_are_applied_only_when_they_differ() {
    let mut fixture = Fixture::new();
    let source = ViewportSource::Constant(Viewport::Idle);
    let (report, _) = fixture.cycle_with(&source, None, &MapSettings::default());
    assert_eq!(report.settings_applied, 0);

    let settings = MapSettings {
        constrain_mode: ConstrainMode::WidthAndHeight,
        orientation: NorthOrientation::Downwards,
        camera_bounds: CameraBounds {
            min_zoom: Some(2.0),
            ..CameraBounds::default()
        },
        ..MapSettings::default()
    };
    let (report, _) = fixture.cycle_with(&source, None, &settings);
    assert_eq!(report.settings_applied, 3);

    fixture.renderer.clear_calls();
    let (report, _) = fixture.cycle_with(&source, None, &settings);
    assert_eq!(report.settings_applied, 0);
    assert!(fixture.renderer.calls().is_empty());
}

#[test]
fn rejected_bounds_are_reported_and_retried() {
    let mut fixture = Fixture::new();
    let source = ViewportSource::Constant(Viewport::Idle);
    let invalid = MapSettings {
        camera_bounds: CameraBounds {
            bounds: Some(CoordinateBounds {
                southwest: Coordinate::new(10.0, 0.0),
                northeast: Coordinate::new(-10.0, 5.0),
            }),
            ..CameraBounds::default()
        },
        ..MapSettings::default()
    };

    let (_, failures) = fixture.cycle_with(&source, None, &invalid);
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].error, RendererError::InvalidBounds(_)));

    let (_, failures) = fixture.cycle_with(&source, None, &invalid);
    assert_eq!(failures.len(), 1);
}

#[test]
fn failed_transition_is_retried_next_cycle() {
    let mut fixture = Fixture::new();
    fixture.renderer.fail_next(
        HostOperation::TransitionTo,
        RendererError::Rejected {
            operation: "transition_to",
            reason: "style not loaded".to_owned(),
        },
    );
    let source = ViewportSource::Constant(zoomed(4.0));

    let (report, failures) = fixture.cycle_with(&source, None, &MapSettings::default());
    assert!(!report.viewport_applied);
    assert_eq!(failures.len(), 1);
    assert_eq!(fixture.sync.last_applied(), None);

    let report = fixture.cycle(&source);
    assert!(report.viewport_applied);
    assert_eq!(fixture.renderer.camera_state().zoom, 4.0);
}

#[test]
fn internal_subscriptions_are_made_once_and_released_on_teardown() {
    let mut fixture = Fixture::new();
    let source = ViewportSource::default();
    fixture.cycle(&source);
    fixture.cycle(&source);
    assert_eq!(
        fixture.renderer.subscription_count(MapEventKind::CameraChanged),
        1
    );

    let mut failures = Vec::new();
    fixture.sync.teardown(&mut fixture.renderer, &mut failures);

    assert!(failures.is_empty());
    assert_eq!(
        fixture.renderer.subscription_count(MapEventKind::CameraChanged),
        0
    );
    assert_eq!(
        fixture
            .renderer
            .subscription_count(MapEventKind::TransitionFinished),
        0
    );
}
