//! Camera, viewport and map-option contracts.

use serde::{Deserialize, Serialize};

use crate::error::RendererError;
use crate::geometry::{Coordinate, CoordinateBounds, EdgeInsets, Geometry, ScreenPoint};

/// Full camera state as reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub center: Coordinate,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
    pub padding: EdgeInsets,
}

impl CameraSnapshot {
    /// Returns the snapshot with every field present in `options` overridden.
    pub fn applying(mut self, options: &CameraOptions) -> Self {
        if let Some(center) = options.center {
            self.center = center;
        }
        if let Some(zoom) = options.zoom {
            self.zoom = zoom;
        }
        if let Some(bearing) = options.bearing {
            self.bearing = bearing;
        }
        if let Some(pitch) = options.pitch {
            self.pitch = pitch;
        }
        if let Some(padding) = options.padding {
            self.padding = padding;
        }
        self
    }
}

/// Partial camera; absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraOptions {
    pub center: Option<Coordinate>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
    pub padding: Option<EdgeInsets>,
}

impl CameraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(mut self, center: Coordinate) -> Self {
        self.center = Some(center);
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn padding(mut self, padding: EdgeInsets) -> Self {
        self.padding = Some(padding);
        self
    }
}

impl From<CameraSnapshot> for CameraOptions {
    fn from(snapshot: CameraSnapshot) -> Self {
        Self {
            center: Some(snapshot.center),
            zoom: Some(snapshot.zoom),
            bearing: Some(snapshot.bearing),
            pitch: Some(snapshot.pitch),
            padding: Some(snapshot.padding),
        }
    }
}

/// Limits the camera may not leave.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraBounds {
    pub bounds: Option<CoordinateBounds>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub min_pitch: Option<f64>,
    pub max_pitch: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstrainMode {
    None,
    #[default]
    HeightOnly,
    WidthAndHeight,
}

/// How screen coordinates map onto the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewportMode {
    #[default]
    Default,
    FlippedY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NorthOrientation {
    #[default]
    Upwards,
    Rightwards,
    Downwards,
    Leftwards,
}

/// Map-level settings currently in effect inside the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapOptions {
    pub camera_bounds: CameraBounds,
    pub constrain_mode: ConstrainMode,
    pub viewport_mode: ViewportMode,
    pub orientation: NorthOrientation,
}

/// Bearing source while following the location puck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FollowBearing {
    Constant(f64),
    Heading,
    Course,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowPuckRequest {
    pub zoom: f64,
    pub bearing: FollowBearing,
    pub pitch: f64,
    pub padding: EdgeInsets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRequest {
    pub geometry: Geometry,
    pub geometry_padding: EdgeInsets,
    pub padding: EdgeInsets,
    pub bearing: f64,
    pub pitch: f64,
    pub max_zoom: Option<f64>,
    pub offset: Option<ScreenPoint>,
}

/// Concrete state the renderer's viewport machinery is asked to reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewportTarget {
    Camera(CameraOptions),
    Overview(OverviewRequest),
    FollowPuck(FollowPuckRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransitionAnimation {
    /// Renderer-chosen curve, optionally capped in duration.
    Default { max_duration_ms: Option<u64> },
    Easing { duration_ms: u64 },
    Fly { duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    Immediate,
    Animated(TransitionAnimation),
}

pub type TransitionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionOutcome {
    Completed,
    Canceled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportStatus {
    Idle,
    Transitioning,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportChangeReason {
    IdleRequested,
    TransitionStarted,
    TransitionSucceeded,
    TransitionFailed,
    UserInteraction,
}

/// Camera and viewport surface of the renderer.
pub trait CameraHost {
    fn camera_state(&self) -> CameraSnapshot;

    /// Jumps the camera without involving the viewport machinery.
    fn set_camera(&mut self, options: &CameraOptions) -> Result<(), RendererError>;

    /// Camera the loaded style declares as its default.
    fn style_default_camera(&self) -> CameraOptions;

    /// Moves the viewport towards `target`. Completion is reported through a
    /// [`MapEvent::TransitionFinished`](crate::MapEvent::TransitionFinished).
    fn transition_to(
        &mut self,
        target: &ViewportTarget,
        transition: &Transition,
    ) -> Result<TransitionId, RendererError>;

    /// Stops any running transition or viewport state.
    fn idle_viewport(&mut self);

    fn map_options(&self) -> MapOptions;

    fn set_camera_bounds(&mut self, bounds: &CameraBounds) -> Result<(), RendererError>;

    fn set_constrain_mode(&mut self, mode: ConstrainMode);

    fn set_viewport_mode(&mut self, mode: ViewportMode);

    fn set_north_orientation(&mut self, orientation: NorthOrientation);
}
