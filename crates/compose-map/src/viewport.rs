//! Declared camera intent.

use std::fmt;
use std::rc::Rc;

use compose_map_renderer::{
    CameraOptions, EdgeInsets, FollowBearing, FollowPuckRequest, Geometry, OverviewRequest,
    ScreenPoint, TransitionAnimation, ViewportTarget,
};
use serde::Serialize;

/// Camera/viewport goal declared by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Viewport {
    /// Leave the camera wherever it is.
    Idle,
    /// The camera declared by the loaded style.
    #[default]
    StyleDefault,
    Camera(CameraOptions),
    Overview(OverviewOptions),
    FollowPuck(FollowPuckOptions),
}

impl Viewport {
    pub fn camera(options: CameraOptions) -> Self {
        Viewport::Camera(options)
    }

    pub fn overview(geometry: Geometry) -> Self {
        Viewport::Overview(OverviewOptions::new(geometry))
    }

    pub fn follow_puck(zoom: f64) -> Self {
        Viewport::FollowPuck(FollowPuckOptions {
            zoom,
            ..FollowPuckOptions::default()
        })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Viewport::Idle)
    }

    /// Concrete renderer target, or `None` when the viewport should idle.
    pub fn target(&self, style_default: CameraOptions) -> Option<ViewportTarget> {
        match self {
            Viewport::Idle => None,
            Viewport::StyleDefault => Some(ViewportTarget::Camera(style_default)),
            Viewport::Camera(options) => Some(ViewportTarget::Camera(*options)),
            Viewport::Overview(options) => Some(ViewportTarget::Overview(options.request())),
            Viewport::FollowPuck(options) => Some(ViewportTarget::FollowPuck(options.request())),
        }
    }
}

/// Fits the camera to a geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewOptions {
    pub geometry: Geometry,
    pub geometry_padding: EdgeInsets,
    pub bearing: f64,
    pub pitch: f64,
    pub max_zoom: Option<f64>,
    pub offset: Option<ScreenPoint>,
}

impl OverviewOptions {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            geometry_padding: EdgeInsets::default(),
            bearing: 0.0,
            pitch: 0.0,
            max_zoom: None,
            offset: None,
        }
    }

    fn request(&self) -> OverviewRequest {
        OverviewRequest {
            geometry: self.geometry.clone(),
            geometry_padding: self.geometry_padding,
            padding: EdgeInsets::default(),
            bearing: self.bearing,
            pitch: self.pitch,
            max_zoom: self.max_zoom,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FollowPuckOptions {
    pub zoom: f64,
    pub bearing: FollowBearing,
    pub pitch: f64,
    pub padding: EdgeInsets,
}

impl Default for FollowPuckOptions {
    fn default() -> Self {
        Self {
            zoom: 16.35,
            bearing: FollowBearing::Heading,
            pitch: 45.0,
            padding: EdgeInsets::default(),
        }
    }
}

impl FollowPuckOptions {
    fn request(&self) -> FollowPuckRequest {
        FollowPuckRequest {
            zoom: self.zoom,
            bearing: self.bearing,
            pitch: self.pitch,
            padding: self.padding,
        }
    }
}

pub type TransitionCompletion = Rc<dyn Fn(bool)>;

/// Animation that accompanies a bound viewport change.
///
/// The completion receives `true` when the transition finished and `false`
/// when it was canceled or failed. It always runs on a later host turn.
#[derive(Clone)]
pub struct ViewportAnimation {
    pub curve: TransitionAnimation,
    completion: Option<TransitionCompletion>,
}

impl ViewportAnimation {
    pub fn default_curve(max_duration_ms: Option<u64>) -> Self {
        Self::with_curve(TransitionAnimation::Default { max_duration_ms })
    }

    pub fn easing(duration_ms: u64) -> Self {
        Self::with_curve(TransitionAnimation::Easing { duration_ms })
    }

    pub fn fly(duration_ms: u64) -> Self {
        Self::with_curve(TransitionAnimation::Fly { duration_ms })
    }

    fn with_curve(curve: TransitionAnimation) -> Self {
        Self {
            curve,
            completion: None,
        }
    }

    pub fn on_completion(mut self, completion: impl Fn(bool) + 'static) -> Self {
        self.completion = Some(Rc::new(completion));
        self
    }

    pub fn completion(&self) -> Option<&TransitionCompletion> {
        self.completion.as_ref()
    }
}

impl PartialEq for ViewportAnimation {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve
    }
}

impl fmt::Debug for ViewportAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportAnimation")
            .field("curve", &self.curve)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
