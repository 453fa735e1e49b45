//! In-memory renderer that records every call it receives.
//!
//! Besides implementing the renderer contracts it exposes knobs that a test
//! (or a headless demo) uses to play the part of the real engine: finishing
//! transitions, user gestures, puck movement, failure injection and releasing
//! held feature-query completions.

use std::collections::VecDeque;

use compose_map_core::collections::map::HashMap;
use indexmap::IndexMap;
use serde::Serialize;

use crate::camera::{
    CameraBounds, CameraHost, CameraOptions, CameraSnapshot, ConstrainMode, FollowBearing,
    MapOptions, NorthOrientation, Transition, TransitionId, TransitionOutcome,
    ViewportChangeReason, ViewportMode, ViewportStatus, ViewportTarget,
};
use crate::error::{RendererError, ResourceKind};
use crate::events::{EventCallback, EventHost, MapEvent, MapEventKind, SubscriptionHandle};
use crate::geometry::{Coordinate, Geometry, ScreenPoint, ScreenRect};
use crate::query::{FeatureQueryHost, QueriedFeature, QueryCallback, QueryTarget};
use crate::style::{
    Feature, LayerPosition, LayerSpec, LayerUpdate, Properties, SourceDiff, StyleHost,
};
use crate::view::{NativeView, ViewAnchor, ViewHandle, ViewHost, ViewOptions, ViewUpdate};

/// Renderer operation names used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HostOperation {
    SetCamera,
    TransitionTo,
    SetCameraBounds,
    AddSource,
    RemoveSource,
    AddLayer,
    UpdateLayer,
    MoveLayer,
    RemoveLayer,
    ApplySourceDiff,
    AddView,
    UpdateView,
    RemoveView,
    Subscribe,
    Unsubscribe,
    QueryFeatures,
}

/// A call received by [`HeadlessMapRenderer`], in submission order.
///
/// Failed calls are recorded too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RendererCall {
    SetCamera(CameraOptions),
    TransitionTo {
        target: ViewportTarget,
        transition: Transition,
    },
    IdleViewport,
    SetCameraBounds(CameraBounds),
    SetConstrainMode(ConstrainMode),
    SetViewportMode(ViewportMode),
    SetNorthOrientation(NorthOrientation),
    AddSource { id: String },
    RemoveSource { id: String },
    AddLayer(LayerSpec),
    UpdateLayer { id: String, update: LayerUpdate },
    MoveLayer { id: String, position: LayerPosition },
    RemoveLayer { id: String },
    ApplySourceDiff { source_id: String, diff: SourceDiff },
    AddView {
        id: String,
        anchor: ViewAnchor,
        options: ViewOptions,
    },
    UpdateView { handle: ViewHandle, update: ViewUpdate },
    RemoveView { handle: ViewHandle },
    Subscribe { kind: MapEventKind },
    Unsubscribe { handle: SubscriptionHandle },
    QueryFeatures {
        target: QueryTarget,
        layer_ids: Vec<String>,
    },
}

impl RendererCall {
    pub fn is_camera_mutation(&self) -> bool {
        matches!(
            self,
            RendererCall::SetCamera(_) | RendererCall::TransitionTo { .. }
        )
    }

    pub fn is_style_mutation(&self) -> bool {
        matches!(
            self,
            RendererCall::AddSource { .. }
                | RendererCall::RemoveSource { .. }
                | RendererCall::AddLayer(_)
                | RendererCall::UpdateLayer { .. }
                | RendererCall::MoveLayer { .. }
                | RendererCall::RemoveLayer { .. }
                | RendererCall::ApplySourceDiff { .. }
        )
    }

    pub fn is_view_mutation(&self) -> bool {
        matches!(
            self,
            RendererCall::AddView { .. }
                | RendererCall::UpdateView { .. }
                | RendererCall::RemoveView { .. }
        )
    }
}

/// Last known puck position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PuckLocation {
    pub coordinate: Coordinate,
    pub heading: Option<f64>,
    pub course: Option<f64>,
}

/// Feature drawn on screen, hit by queries whose target intersects `area`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub feature_id: Option<String>,
    pub area: ScreenRect,
    pub properties: Properties,
}

pub struct HeadlessView {
    pub id: String,
    pub anchor: ViewAnchor,
    pub options: ViewOptions,
    pub view: NativeView,
}

struct Subscription {
    kind: MapEventKind,
    callback: EventCallback,
}

struct ActiveTransition {
    id: TransitionId,
    target: ViewportTarget,
}

struct PendingQuery {
    target: QueryTarget,
    layer_ids: Vec<String>,
    callback: QueryCallback,
}

pub struct HeadlessMapRenderer {
    calls: Vec<RendererCall>,
    events: Vec<MapEvent>,
    failures: HashMap<HostOperation, VecDeque<RendererError>>,
    camera: CameraSnapshot,
    style_default: CameraOptions,
    options: MapOptions,
    status: ViewportStatus,
    viewport_state: Option<ViewportTarget>,
    active_transition: Option<ActiveTransition>,
    next_transition: TransitionId,
    puck: Option<PuckLocation>,
    sources: IndexMap<String, IndexMap<String, Feature>>,
    layers: Vec<LayerSpec>,
    views: IndexMap<ViewHandle, HeadlessView>,
    next_view: u64,
    subscriptions: IndexMap<SubscriptionHandle, Subscription>,
    next_subscription: u64,
    pending_queries: Vec<PendingQuery>,
    rendered: Vec<RenderedFeature>,
}

impl Default for HeadlessMapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessMapRenderer {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            events: Vec::new(),
            failures: HashMap::default(),
            camera: CameraSnapshot {
                zoom: 1.0,
                ..CameraSnapshot::default()
            },
            style_default: CameraOptions::new()
                .center(Coordinate::new(0.0, 0.0))
                .zoom(1.0)
                .bearing(0.0)
                .pitch(0.0),
            options: MapOptions::default(),
            status: ViewportStatus::Idle,
            viewport_state: None,
            active_transition: None,
            next_transition: 1,
            puck: None,
            sources: IndexMap::new(),
            layers: Vec::new(),
            views: IndexMap::new(),
            next_view: 1,
            subscriptions: IndexMap::new(),
            next_subscription: 1,
            pending_queries: Vec::new(),
            rendered: Vec::new(),
        }
    }

    pub fn with_camera(mut self, camera: CameraSnapshot) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_style_default_camera(mut self, camera: CameraOptions) -> Self {
        self.style_default = camera;
        self
    }

    pub fn calls(&self) -> &[RendererCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<RendererCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count_calls(&self, predicate: impl Fn(&RendererCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(*call)).count()
    }

    pub fn camera_mutations(&self) -> usize {
        self.count_calls(RendererCall::is_camera_mutation)
    }

    /// Every event delivered to subscribers so far.
    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn source_features(&self, id: &str) -> Option<Vec<&Feature>> {
        self.sources.get(id).map(|features| features.values().collect())
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Layer ids in draw order, bottom first.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.id.as_str()).collect()
    }

    pub fn view(&self, handle: ViewHandle) -> Option<&HeadlessView> {
        self.views.get(&handle)
    }

    pub fn view_by_id(&self, id: &str) -> Option<&HeadlessView> {
        self.views.values().find(|view| view.id == id)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn subscription_count(&self, kind: MapEventKind) -> usize {
        self.subscriptions
            .values()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }

    pub fn viewport_status(&self) -> ViewportStatus {
        self.status
    }

    pub fn active_transition(&self) -> Option<TransitionId> {
        self.active_transition.as_ref().map(|active| active.id)
    }

    pub fn pending_query_count(&self) -> usize {
        self.pending_queries.len()
    }

    /// Makes the next call of `operation` fail with `error`. Queued per
    /// operation, consumed one at a time.
    pub fn fail_next(&mut self, operation: HostOperation, error: RendererError) {
        self.failures.entry(operation).or_default().push_back(error);
    }

    /// Delivers `event` to its subscribers as if the engine emitted it.
    pub fn emit(&mut self, event: MapEvent) {
        let kind = event.kind();
        for subscription in self.subscriptions.values_mut() {
            if subscription.kind == kind {
                (subscription.callback)(&event);
            }
        }
        self.events.push(event);
    }

    /// Ends the running transition. Returns its id, or `None` when idle.
    pub fn finish_transition(&mut self, outcome: TransitionOutcome) -> Option<TransitionId> {
        let active = self.active_transition.take()?;
        match outcome {
            TransitionOutcome::Completed => {
                let camera = self.resolve_target(&active.target);
                self.move_camera(camera);
                self.viewport_state = Some(active.target);
                self.set_status(ViewportStatus::State, ViewportChangeReason::TransitionSucceeded);
            }
            TransitionOutcome::Canceled => {
                self.set_status(ViewportStatus::Idle, ViewportChangeReason::IdleRequested);
            }
            TransitionOutcome::Failed => {
                self.set_status(ViewportStatus::Idle, ViewportChangeReason::TransitionFailed);
            }
        }
        self.emit(MapEvent::TransitionFinished {
            id: active.id,
            outcome,
        });
        Some(active.id)
    }

    /// A user gesture moving the camera. Cancels any transition and idles
    /// the viewport.
    pub fn simulate_user_pan(&mut self, options: &CameraOptions) {
        self.cancel_active();
        self.viewport_state = None;
        self.set_status(ViewportStatus::Idle, ViewportChangeReason::UserInteraction);
        let camera = self.constrain(self.camera.applying(options));
        self.move_camera(camera);
    }

    /// Updates the puck. A settled follow-puck viewport re-centres on it.
    pub fn move_puck(&mut self, location: PuckLocation) {
        self.puck = Some(location);
        if self.active_transition.is_some() || self.status != ViewportStatus::State {
            return;
        }
        if let Some(target @ ViewportTarget::FollowPuck(_)) = self.viewport_state.clone() {
            let camera = self.resolve_target(&target);
            self.move_camera(camera);
        }
    }

    pub fn set_rendered_features(&mut self, features: Vec<RenderedFeature>) {
        self.rendered = features;
    }

    /// Completes every held feature query, in submission order.
    pub fn complete_queries(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_queries);
        let count = pending.len();
        for query in pending {
            let hits = self
                .rendered
                .iter()
                .filter(|feature| query.layer_ids.contains(&feature.layer_id))
                .filter(|feature| match query.target {
                    QueryTarget::Point(point) => feature.area.contains(point),
                    QueryTarget::Rect(rect) => rects_intersect(&feature.area, &rect),
                })
                .map(|feature| QueriedFeature {
                    layer_id: feature.layer_id.clone(),
                    feature_id: feature.feature_id.clone(),
                    properties: feature.properties.clone(),
                })
                .collect();
            (query.callback)(Ok(hits));
        }
        count
    }

    fn take_failure(&mut self, operation: HostOperation) -> Result<(), RendererError> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn set_status(&mut self, to: ViewportStatus, reason: ViewportChangeReason) {
        let from = self.status;
        if from == to {
            return;
        }
        self.status = to;
        self.emit(MapEvent::ViewportStatusChanged { from, to, reason });
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active_transition.take() {
            self.emit(MapEvent::TransitionFinished {
                id: active.id,
                outcome: TransitionOutcome::Canceled,
            });
        }
    }

    fn move_camera(&mut self, camera: CameraSnapshot) {
        if camera == self.camera {
            return;
        }
        self.camera = camera;
        self.emit(MapEvent::CameraChanged(camera));
    }

    fn resolve_target(&self, target: &ViewportTarget) -> CameraSnapshot {
        let camera = match target {
            ViewportTarget::Camera(options) => self.camera.applying(options),
            ViewportTarget::Overview(request) => CameraSnapshot {
                center: geometry_center(&request.geometry).unwrap_or(self.camera.center),
                zoom: request.max_zoom.unwrap_or(self.camera.zoom),
                bearing: request.bearing,
                pitch: request.pitch,
                padding: request.padding,
            },
            ViewportTarget::FollowPuck(request) => {
                let puck = self.puck.unwrap_or_default();
                let bearing = match request.bearing {
                    FollowBearing::Constant(bearing) => bearing,
                    FollowBearing::Heading => puck.heading.unwrap_or(self.camera.bearing),
                    FollowBearing::Course => puck.course.unwrap_or(self.camera.bearing),
                };
                CameraSnapshot {
                    center: self.puck.map_or(self.camera.center, |puck| puck.coordinate),
                    zoom: request.zoom,
                    bearing,
                    pitch: request.pitch,
                    padding: request.padding,
                }
            }
        };
        self.constrain(camera)
    }

    fn constrain(&self, mut camera: CameraSnapshot) -> CameraSnapshot {
        let limits = &self.options.camera_bounds;
        if let Some(min) = limits.min_zoom {
            camera.zoom = camera.zoom.max(min);
        }
        if let Some(max) = limits.max_zoom {
            camera.zoom = camera.zoom.min(max);
        }
        if let Some(min) = limits.min_pitch {
            camera.pitch = camera.pitch.max(min);
        }
        if let Some(max) = limits.max_pitch {
            camera.pitch = camera.pitch.min(max);
        }
        if let Some(bounds) = limits.bounds {
            if self.options.constrain_mode != ConstrainMode::None {
                camera.center.latitude = camera
                    .center
                    .latitude
                    .clamp(bounds.southwest.latitude, bounds.northeast.latitude);
                camera.center.longitude = camera
                    .center
                    .longitude
                    .clamp(bounds.southwest.longitude, bounds.northeast.longitude);
            }
        }
        camera
    }

    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    fn insertion_index(&self, position: &LayerPosition) -> Result<usize, RendererError> {
        let anchor = |other: &String| {
            self.layer_index(other).ok_or_else(|| RendererError::NotFound {
                kind: ResourceKind::Layer,
                id: other.clone(),
            })
        };
        Ok(match position {
            LayerPosition::Top => self.layers.len(),
            LayerPosition::Above(other) => anchor(other)? + 1,
            LayerPosition::Below(other) => anchor(other)?,
            LayerPosition::At(index) => (*index).min(self.layers.len()),
        })
    }
}

fn geometry_center(geometry: &Geometry) -> Option<Coordinate> {
    let points: Vec<Coordinate> = match geometry {
        Geometry::Point(point) => vec![*point],
        Geometry::LineString(line) => line.clone(),
        Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
    };
    let first = points.first()?;
    let (mut south, mut west, mut north, mut east) =
        (first.latitude, first.longitude, first.latitude, first.longitude);
    for point in &points {
        south = south.min(point.latitude);
        north = north.max(point.latitude);
        west = west.min(point.longitude);
        east = east.max(point.longitude);
    }
    Some(Coordinate::new((south + north) / 2.0, (west + east) / 2.0))
}

fn rects_intersect(a: &ScreenRect, b: &ScreenRect) -> bool {
    a.origin.x <= b.origin.x + b.width
        && b.origin.x <= a.origin.x + a.width
        && a.origin.y <= b.origin.y + b.height
        && b.origin.y <= a.origin.y + a.height
}

impl CameraHost for HeadlessMapRenderer {
    fn camera_state(&self) -> CameraSnapshot {
        self.camera
    }

    fn set_camera(&mut self, options: &CameraOptions) -> Result<(), RendererError> {
        self.calls.push(RendererCall::SetCamera(*options));
        self.take_failure(HostOperation::SetCamera)?;
        let camera = self.constrain(self.camera.applying(options));
        self.move_camera(camera);
        Ok(())
    }

    fn style_default_camera(&self) -> CameraOptions {
        self.style_default
    }

    fn transition_to(
        &mut self,
        target: &ViewportTarget,
        transition: &Transition,
    ) -> Result<TransitionId, RendererError> {
        self.calls.push(RendererCall::TransitionTo {
            target: target.clone(),
            transition: *transition,
        });
        self.take_failure(HostOperation::TransitionTo)?;
        self.cancel_active();
        let id = self.next_transition;
        self.next_transition += 1;
        match transition {
            Transition::Immediate => {
                let camera = self.resolve_target(target);
                self.move_camera(camera);
                self.viewport_state = Some(target.clone());
                self.set_status(ViewportStatus::State, ViewportChangeReason::TransitionSucceeded);
                self.emit(MapEvent::TransitionFinished {
                    id,
                    outcome: TransitionOutcome::Completed,
                });
            }
            Transition::Animated(_) => {
                self.active_transition = Some(ActiveTransition {
                    id,
                    target: target.clone(),
                });
                self.set_status(
                    ViewportStatus::Transitioning,
                    ViewportChangeReason::TransitionStarted,
                );
            }
        }
        Ok(id)
    }

    fn idle_viewport(&mut self) {
        self.calls.push(RendererCall::IdleViewport);
        self.cancel_active();
        self.viewport_state = None;
        self.set_status(ViewportStatus::Idle, ViewportChangeReason::IdleRequested);
    }

    fn map_options(&self) -> MapOptions {
        self.options
    }

    fn set_camera_bounds(&mut self, bounds: &CameraBounds) -> Result<(), RendererError> {
        self.calls.push(RendererCall::SetCameraBounds(*bounds));
        self.take_failure(HostOperation::SetCameraBounds)?;
        if let Some(area) = bounds.bounds {
            if !area.is_valid() {
                return Err(RendererError::InvalidBounds(format!(
                    "southwest {:?} is not below northeast {:?}",
                    area.southwest, area.northeast
                )));
            }
        }
        if let (Some(min), Some(max)) = (bounds.min_zoom, bounds.max_zoom) {
            if min > max {
                return Err(RendererError::InvalidBounds(format!(
                    "min zoom {min} exceeds max zoom {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (bounds.min_pitch, bounds.max_pitch) {
            if min > max {
                return Err(RendererError::InvalidBounds(format!(
                    "min pitch {min} exceeds max pitch {max}"
                )));
            }
        }
        self.options.camera_bounds = *bounds;
        let camera = self.constrain(self.camera);
        self.move_camera(camera);
        Ok(())
    }

    fn set_constrain_mode(&mut self, mode: ConstrainMode) {
        self.calls.push(RendererCall::SetConstrainMode(mode));
        self.options.constrain_mode = mode;
    }

    fn set_viewport_mode(&mut self, mode: ViewportMode) {
        self.calls.push(RendererCall::SetViewportMode(mode));
        self.options.viewport_mode = mode;
    }

    fn set_north_orientation(&mut self, orientation: NorthOrientation) {
        self.calls.push(RendererCall::SetNorthOrientation(orientation));
        self.options.orientation = orientation;
    }
}

impl StyleHost for HeadlessMapRenderer {
    fn add_source(&mut self, id: &str) -> Result<(), RendererError> {
        self.calls.push(RendererCall::AddSource { id: id.to_owned() });
        self.take_failure(HostOperation::AddSource)?;
        if self.sources.contains_key(id) {
            return Err(RendererError::DuplicateId {
                kind: ResourceKind::Source,
                id: id.to_owned(),
            });
        }
        self.sources.insert(id.to_owned(), IndexMap::new());
        self.emit(MapEvent::SourceAdded {
            source_id: id.to_owned(),
        });
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), RendererError> {
        self.calls.push(RendererCall::RemoveSource { id: id.to_owned() });
        self.take_failure(HostOperation::RemoveSource)?;
        if self.layers.iter().any(|layer| layer.source == id) {
            return Err(RendererError::Rejected {
                operation: "remove_source",
                reason: format!("source {id:?} is still used by a layer"),
            });
        }
        if self.sources.shift_remove(id).is_none() {
            return Err(RendererError::NotFound {
                kind: ResourceKind::Source,
                id: id.to_owned(),
            });
        }
        self.emit(MapEvent::SourceRemoved {
            source_id: id.to_owned(),
        });
        Ok(())
    }

    fn add_layer(&mut self, spec: &LayerSpec) -> Result<(), RendererError> {
        self.calls.push(RendererCall::AddLayer(spec.clone()));
        self.take_failure(HostOperation::AddLayer)?;
        if self.layer_index(&spec.id).is_some() {
            return Err(RendererError::DuplicateId {
                kind: ResourceKind::Layer,
                id: spec.id.clone(),
            });
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(RendererError::NotFound {
                kind: ResourceKind::Source,
                id: spec.source.clone(),
            });
        }
        let index = self.insertion_index(&spec.position)?;
        self.layers.insert(index, spec.clone());
        Ok(())
    }

    fn update_layer(&mut self, id: &str, update: &LayerUpdate) -> Result<(), RendererError> {
        self.calls.push(RendererCall::UpdateLayer {
            id: id.to_owned(),
            update: update.clone(),
        });
        self.take_failure(HostOperation::UpdateLayer)?;
        let index = self.layer_index(id).ok_or_else(|| RendererError::NotFound {
            kind: ResourceKind::Layer,
            id: id.to_owned(),
        })?;
        let layer = &mut self.layers[index];
        layer.slot = update.slot.clone();
        layer.properties = update.properties.clone();
        Ok(())
    }

    fn move_layer(&mut self, id: &str, position: &LayerPosition) -> Result<(), RendererError> {
        self.calls.push(RendererCall::MoveLayer {
            id: id.to_owned(),
            position: position.clone(),
        });
        self.take_failure(HostOperation::MoveLayer)?;
        let current = self.layer_index(id).ok_or_else(|| RendererError::NotFound {
            kind: ResourceKind::Layer,
            id: id.to_owned(),
        })?;
        let self_relative = matches!(
            position,
            LayerPosition::Above(other) | LayerPosition::Below(other) if other == id
        );
        if self_relative {
            return Err(RendererError::Rejected {
                operation: "move_layer",
                reason: format!("layer {id:?} cannot be positioned relative to itself"),
            });
        }
        let mut layer = self.layers.remove(current);
        let index = match self.insertion_index(position) {
            Ok(index) => index,
            Err(error) => {
                self.layers.insert(current, layer);
                return Err(error);
            }
        };
        layer.position = position.clone();
        self.layers.insert(index, layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), RendererError> {
        self.calls.push(RendererCall::RemoveLayer { id: id.to_owned() });
        self.take_failure(HostOperation::RemoveLayer)?;
        let index = self.layer_index(id).ok_or_else(|| RendererError::NotFound {
            kind: ResourceKind::Layer,
            id: id.to_owned(),
        })?;
        self.layers.remove(index);
        Ok(())
    }

    fn apply_source_diff(
        &mut self,
        source_id: &str,
        diff: &SourceDiff,
    ) -> Result<(), RendererError> {
        self.calls.push(RendererCall::ApplySourceDiff {
            source_id: source_id.to_owned(),
            diff: diff.clone(),
        });
        self.take_failure(HostOperation::ApplySourceDiff)?;
        let features = self
            .sources
            .get_mut(source_id)
            .ok_or_else(|| RendererError::NotFound {
                kind: ResourceKind::Source,
                id: source_id.to_owned(),
            })?;
        for id in &diff.removed {
            features.shift_remove(id);
        }
        for feature in diff.added.iter().chain(&diff.updated) {
            features.insert(feature.id.clone(), feature.clone());
        }
        Ok(())
    }
}

impl ViewHost for HeadlessMapRenderer {
    fn add_view(
        &mut self,
        id: &str,
        view: NativeView,
        anchor: &ViewAnchor,
        options: &ViewOptions,
    ) -> Result<ViewHandle, RendererError> {
        self.calls.push(RendererCall::AddView {
            id: id.to_owned(),
            anchor: anchor.clone(),
            options: options.clone(),
        });
        self.take_failure(HostOperation::AddView)?;
        if self.view_by_id(id).is_some() {
            return Err(RendererError::DuplicateId {
                kind: ResourceKind::View,
                id: id.to_owned(),
            });
        }
        let handle = ViewHandle(self.next_view);
        self.next_view += 1;
        self.views.insert(
            handle,
            HeadlessView {
                id: id.to_owned(),
                anchor: anchor.clone(),
                options: options.clone(),
                view,
            },
        );
        Ok(handle)
    }

    fn update_view(
        &mut self,
        handle: ViewHandle,
        update: &ViewUpdate,
    ) -> Result<(), RendererError> {
        self.calls.push(RendererCall::UpdateView {
            handle,
            update: update.clone(),
        });
        self.take_failure(HostOperation::UpdateView)?;
        let view = self
            .views
            .get_mut(&handle)
            .ok_or_else(|| RendererError::NotFound {
                kind: ResourceKind::View,
                id: handle.to_string(),
            })?;
        if let Some(anchor) = &update.anchor {
            view.anchor = anchor.clone();
        }
        if let Some(options) = &update.options {
            view.options = options.clone();
        }
        Ok(())
    }

    fn remove_view(&mut self, handle: ViewHandle) -> Result<NativeView, RendererError> {
        self.calls.push(RendererCall::RemoveView { handle });
        self.take_failure(HostOperation::RemoveView)?;
        self.views
            .shift_remove(&handle)
            .map(|entry| entry.view)
            .ok_or_else(|| RendererError::NotFound {
                kind: ResourceKind::View,
                id: handle.to_string(),
            })
    }
}

impl EventHost for HeadlessMapRenderer {
    fn subscribe(
        &mut self,
        kind: MapEventKind,
        callback: EventCallback,
    ) -> Result<SubscriptionHandle, RendererError> {
        self.calls.push(RendererCall::Subscribe { kind });
        self.take_failure(HostOperation::Subscribe)?;
        let handle = SubscriptionHandle(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions
            .insert(handle, Subscription { kind, callback });
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), RendererError> {
        self.calls.push(RendererCall::Unsubscribe { handle });
        self.take_failure(HostOperation::Unsubscribe)?;
        self.subscriptions
            .shift_remove(&handle)
            .map(|_| ())
            .ok_or_else(|| RendererError::NotFound {
                kind: ResourceKind::Subscription,
                id: handle.0.to_string(),
            })
    }
}

impl FeatureQueryHost for HeadlessMapRenderer {
    fn query_features(
        &mut self,
        target: QueryTarget,
        layer_ids: &[String],
        callback: QueryCallback,
    ) {
        self.calls.push(RendererCall::QueryFeatures {
            target,
            layer_ids: layer_ids.to_vec(),
        });
        if let Err(error) = self.take_failure(HostOperation::QueryFeatures) {
            callback(Err(error));
            return;
        }
        self.pending_queries.push(PendingQuery {
            target,
            layer_ids: layer_ids.to_vec(),
            callback,
        });
    }

    fn coordinate_for(&self, point: ScreenPoint) -> Coordinate {
        let degrees_per_pixel = 360.0 / (512.0 * 2f64.powf(self.camera.zoom));
        Coordinate::new(
            self.camera.center.latitude - point.y * degrees_per_pixel,
            self.camera.center.longitude + point.x * degrees_per_pixel,
        )
    }
}
