//! Two-way camera/viewport synchronization.
//!
//! Every cycle runs inside a suppression gate: camera-changed notifications
//! the renderer emits while the cycle mutates the camera are withheld. When
//! the cycle leaves the camera untouched the gate drops synchronously;
//! otherwise it drops on the next runtime turn and the latest withheld
//! notification is delivered then, outside the host's update.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use compose_map_core::{Binding, OnceLatch, RuntimeHandle};
use compose_map_renderer::{
    CameraBounds, CameraHost, CameraSnapshot, ConstrainMode, EventCallback, EventHost, MapEvent,
    MapEventKind, NorthOrientation, SubscriptionHandle, Transition, TransitionId,
    TransitionOutcome, ViewportChangeReason, ViewportMode, ViewportStatus,
};

use crate::error::{record, ApplyFailure};
use crate::report::CameraReport;
use crate::viewport::{TransitionCompletion, Viewport, ViewportAnimation};

pub type CameraChangedHandler = Rc<dyn Fn(&CameraSnapshot)>;

/// Where the declared viewport comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportSource {
    /// Applied once over the synchronizer's lifetime.
    Constant(Viewport),
    /// Host-owned state; reset to [`Viewport::Idle`] when the user takes over.
    Bound(Binding<Viewport>),
}

impl Default for ViewportSource {
    fn default() -> Self {
        ViewportSource::Constant(Viewport::default())
    }
}

/// Map-level settings guarded by value equality.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapSettings {
    pub camera_bounds: CameraBounds,
    pub constrain_mode: ConstrainMode,
    pub viewport_mode: ViewportMode,
    pub orientation: NorthOrientation,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionGate {
    raised: bool,
    pending_resume: bool,
}

impl SuppressionGate {
    pub fn is_raised(&self) -> bool {
        self.raised
    }

    pub fn is_resume_pending(&self) -> bool {
        self.pending_resume
    }
}

#[derive(Default)]
struct SyncState {
    gate: SuppressionGate,
    withheld: Option<CameraSnapshot>,
    handlers: Vec<CameraChangedHandler>,
    binding: Option<Binding<Viewport>>,
    last_applied: Option<Viewport>,
    completions: Vec<(TransitionId, TransitionCompletion)>,
    unclaimed: Vec<(TransitionId, TransitionOutcome)>,
}

impl SyncState {
    fn delivery_targets(&self) -> Vec<CameraChangedHandler> {
        self.handlers.clone()
    }
}

pub struct CameraSynchronizer {
    state: Rc<RefCell<SyncState>>,
    runtime: RuntimeHandle,
    subscribe_once: OnceLatch,
    subscriptions: Vec<SubscriptionHandle>,
    constant_once: OnceLatch,
    applied_bounds: CameraBounds,
}

impl CameraSynchronizer {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            state: Rc::new(RefCell::new(SyncState::default())),
            runtime,
            subscribe_once: OnceLatch::new(),
            subscriptions: Vec::new(),
            constant_once: OnceLatch::new(),
            applied_bounds: CameraBounds::default(),
        }
    }

    pub fn gate(&self) -> SuppressionGate {
        self.state.borrow().gate
    }

    pub fn last_applied(&self) -> Option<Viewport> {
        self.state.borrow().last_applied.clone()
    }

    /// Runs one synchronization cycle.
    pub fn update<R: CameraHost + EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        source: &ViewportSource,
        animation: Option<&ViewportAnimation>,
        settings: &MapSettings,
        handlers: Vec<CameraChangedHandler>,
        failures: &mut Vec<ApplyFailure>,
    ) -> CameraReport {
        self.ensure_subscribed(renderer, failures);
        {
            let mut state = self.state.borrow_mut();
            state.handlers = handlers;
            state.binding = match source {
                ViewportSource::Bound(binding) => Some(binding.clone()),
                ViewportSource::Constant(_) => None,
            };
            state.gate.raised = true;
        }

        let before = renderer.camera_state();
        let viewport_applied = self.apply_viewport(renderer, source, animation, failures);
        let settings_applied = self.apply_settings(renderer, settings, failures);
        let after = renderer.camera_state();
        let camera_changed = after != before;
        self.lower_gate(camera_changed);

        CameraReport {
            viewport_applied,
            settings_applied,
            camera_changed,
            camera: after,
        }
    }

    fn apply_viewport<R: CameraHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        source: &ViewportSource,
        animation: Option<&ViewportAnimation>,
        failures: &mut Vec<ApplyFailure>,
    ) -> bool {
        match source {
            ViewportSource::Constant(viewport) => {
                let mut first_cycle = false;
                self.constant_once.run(|| first_cycle = true);
                if !first_cycle {
                    return false;
                }
                match self.apply_intent(renderer, viewport, None) {
                    Ok(applied) => applied,
                    Err(failure) => {
                        self.constant_once.reset();
                        record(failures, failure);
                        false
                    }
                }
            }
            ViewportSource::Bound(binding) => {
                let viewport = binding.get();
                match self.apply_intent(renderer, &viewport, animation) {
                    Ok(applied) => applied,
                    Err(failure) => {
                        record(failures, failure);
                        false
                    }
                }
            }
        }
    }

    /// Moves the renderer towards `viewport` unless it is the intent applied
    /// last. A failed transition forgets the intent so it is retried.
    fn apply_intent<R: CameraHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        viewport: &Viewport,
        animation: Option<&ViewportAnimation>,
    ) -> Result<bool, ApplyFailure> {
        {
            let mut state = self.state.borrow_mut();
            if state.last_applied.as_ref() == Some(viewport) {
                return Ok(false);
            }
            state.last_applied = Some(viewport.clone());
            state.unclaimed.clear();
        }

        let Some(target) = viewport.target(renderer.style_default_camera()) else {
            log::trace!("viewport idle requested");
            renderer.idle_viewport();
            return Ok(true);
        };
        let transition = animation.map_or(Transition::Immediate, |animation| {
            Transition::Animated(animation.curve)
        });
        match renderer.transition_to(&target, &transition) {
            Ok(id) => {
                log::trace!("viewport transition {id} started: {transition:?}");
                if let Some(completion) = animation.and_then(ViewportAnimation::completion) {
                    self.track_completion(id, Rc::clone(completion));
                }
                Ok(true)
            }
            Err(error) => {
                self.state.borrow_mut().last_applied = None;
                Err(ApplyFailure::new("viewport", "transition_to", error))
            }
        }
    }

    fn track_completion(&self, id: TransitionId, completion: TransitionCompletion) {
        let finished = {
            let mut state = self.state.borrow_mut();
            match state.unclaimed.iter().position(|(done, _)| *done == id) {
                Some(index) => Some(state.unclaimed.remove(index).1),
                None => {
                    state.completions.push((id, Rc::clone(&completion)));
                    None
                }
            }
        };
        if let Some(outcome) = finished {
            schedule_completion(&self.runtime, completion, outcome);
        }
    }

    fn apply_settings<R: CameraHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        settings: &MapSettings,
        failures: &mut Vec<ApplyFailure>,
    ) -> usize {
        let mut applied = 0;
        if self.applied_bounds != settings.camera_bounds {
            match renderer.set_camera_bounds(&settings.camera_bounds) {
                Ok(()) => {
                    self.applied_bounds = settings.camera_bounds;
                    applied += 1;
                }
                Err(error) => record(
                    failures,
                    ApplyFailure::new("camera bounds", "set_camera_bounds", error),
                ),
            }
        }
        let current = renderer.map_options();
        if current.constrain_mode != settings.constrain_mode {
            renderer.set_constrain_mode(settings.constrain_mode);
            applied += 1;
        }
        if current.viewport_mode != settings.viewport_mode {
            renderer.set_viewport_mode(settings.viewport_mode);
            applied += 1;
        }
        if current.orientation != settings.orientation {
            renderer.set_north_orientation(settings.orientation);
            applied += 1;
        }
        applied
    }

    fn lower_gate(&self, camera_changed: bool) {
        {
            let mut state = self.state.borrow_mut();
            if state.gate.pending_resume {
                return;
            }
            if !camera_changed {
                state.gate.raised = false;
                state.withheld = None;
                return;
            }
            state.gate.pending_resume = true;
        }
        let shared = Rc::downgrade(&self.state);
        self.runtime.spawn_task(Box::new(move || resume(shared)));
    }

    fn ensure_subscribed<R: EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) {
        let mut first_cycle = false;
        self.subscribe_once.run(|| first_cycle = true);
        if !first_cycle {
            return;
        }
        let callbacks: [(MapEventKind, EventCallback); 3] = [
            (MapEventKind::CameraChanged, self.camera_changed_callback()),
            (
                MapEventKind::ViewportStatusChanged,
                self.viewport_status_callback(),
            ),
            (
                MapEventKind::TransitionFinished,
                self.transition_finished_callback(),
            ),
        ];
        for (kind, callback) in callbacks {
            match renderer.subscribe(kind, callback) {
                Ok(handle) => self.subscriptions.push(handle),
                Err(error) => {
                    record(
                        failures,
                        ApplyFailure::new("camera synchronizer", "subscribe", error),
                    );
                    self.release_subscriptions(renderer, failures);
                    self.subscribe_once.reset();
                    return;
                }
            }
        }
    }

    fn camera_changed_callback(&self) -> EventCallback {
        let shared = Rc::downgrade(&self.state);
        Box::new(move |event| {
            let MapEvent::CameraChanged(camera) = event else {
                return;
            };
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let handlers = {
                let mut state = shared.borrow_mut();
                if state.gate.raised {
                    state.withheld = Some(*camera);
                    return;
                }
                state.delivery_targets()
            };
            for handler in handlers {
                handler(camera);
            }
        })
    }

    /// Idling caused by the user drops the applied intent and writes
    /// [`Viewport::Idle`] back into a bound viewport.
    fn viewport_status_callback(&self) -> EventCallback {
        let shared = Rc::downgrade(&self.state);
        Box::new(move |event| {
            let MapEvent::ViewportStatusChanged {
                to: ViewportStatus::Idle,
                reason: ViewportChangeReason::UserInteraction,
                ..
            } = event
            else {
                return;
            };
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let binding = {
                let mut state = shared.borrow_mut();
                state.last_applied = Some(Viewport::Idle);
                state.binding.clone()
            };
            if let Some(binding) = binding {
                if !binding.with(Viewport::is_idle) {
                    log::debug!("user interaction idled the viewport");
                    binding.set(Viewport::Idle);
                }
            }
        })
    }

    fn transition_finished_callback(&self) -> EventCallback {
        let shared = Rc::downgrade(&self.state);
        let runtime = self.runtime.clone();
        Box::new(move |event| {
            let MapEvent::TransitionFinished { id, outcome } = event else {
                return;
            };
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let completion = {
                let mut state = shared.borrow_mut();
                match state.completions.iter().position(|(pending, _)| pending == id) {
                    Some(index) => Some(state.completions.remove(index).1),
                    None => {
                        state.unclaimed.push((*id, *outcome));
                        None
                    }
                }
            };
            if let Some(completion) = completion {
                schedule_completion(&runtime, completion, *outcome);
            }
        })
    }

    fn release_subscriptions<R: EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) {
        for handle in self.subscriptions.drain(..) {
            if let Err(error) = renderer.unsubscribe(handle) {
                record(
                    failures,
                    ApplyFailure::new("camera synchronizer", "unsubscribe", error),
                );
            }
        }
    }

    /// Detaches from the renderer and forgets every applied value.
    pub fn teardown<R: EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) {
        self.release_subscriptions(renderer, failures);
        self.subscribe_once.reset();
        self.constant_once.reset();
        self.applied_bounds = CameraBounds::default();
        let mut state = self.state.borrow_mut();
        state.handlers.clear();
        state.binding = None;
        state.last_applied = None;
        state.withheld = None;
        state.completions.clear();
        state.unclaimed.clear();
    }
}

/// Drops the gate raised by a camera-changing cycle and delivers the
/// latest withheld notification, once.
fn resume(shared: Weak<RefCell<SyncState>>) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let (camera, handlers) = {
        let mut state = shared.borrow_mut();
        state.gate.raised = false;
        state.gate.pending_resume = false;
        (state.withheld.take(), state.delivery_targets())
    };
    if let Some(camera) = camera {
        for handler in handlers {
            handler(&camera);
        }
    }
}

fn schedule_completion(
    runtime: &RuntimeHandle,
    completion: TransitionCompletion,
    outcome: TransitionOutcome,
) {
    let finished = outcome == TransitionOutcome::Completed;
    runtime.spawn_task(Box::new(move || completion(finished)));
}

#[cfg(test)]
#[path = "tests/camera_sync_tests.rs"]
mod tests;
