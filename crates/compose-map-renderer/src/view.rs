//! Native view overlays pinned to the map.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RendererError;
use crate::geometry::{Coordinate, ScreenPoint};

/// Host-created view object. The renderer only stores and positions it.
pub type NativeView = Box<dyn Any>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewAnchor {
    Coordinate(Coordinate),
    Feature { layer_id: String, feature_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnchorPosition {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub anchor: AnchorPosition,
    pub offset: ScreenPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewOptions {
    pub allow_overlap: bool,
    pub visible: bool,
    pub priority: i32,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub variable_anchors: Vec<AnchorConfig>,
    pub ignore_camera_padding: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            allow_overlap: false,
            visible: true,
            priority: 0,
            min_zoom: 0.0,
            max_zoom: 22.0,
            variable_anchors: vec![AnchorConfig::default()],
            ignore_camera_padding: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle(pub u64);

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Only the fields that changed since the last applied value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewUpdate {
    pub anchor: Option<ViewAnchor>,
    pub options: Option<ViewOptions>,
}

impl ViewUpdate {
    pub fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.options.is_none()
    }
}

pub trait ViewHost {
    fn add_view(
        &mut self,
        id: &str,
        view: NativeView,
        anchor: &ViewAnchor,
        options: &ViewOptions,
    ) -> Result<ViewHandle, RendererError>;

    fn update_view(&mut self, handle: ViewHandle, update: &ViewUpdate)
        -> Result<(), RendererError>;

    /// Detaches the view and hands it back to the caller for release.
    fn remove_view(&mut self, handle: ViewHandle) -> Result<NativeView, RendererError>;
}
