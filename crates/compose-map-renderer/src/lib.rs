//! Contracts between the compose-map reconcilers and a stateful map renderer.

pub mod camera;
pub mod error;
pub mod events;
pub mod geometry;
pub mod headless;
pub mod query;
pub mod style;
pub mod view;

pub use camera::{
    CameraBounds, CameraHost, CameraOptions, CameraSnapshot, ConstrainMode, FollowBearing,
    FollowPuckRequest, MapOptions, NorthOrientation, OverviewRequest, Transition,
    TransitionAnimation, TransitionId, TransitionOutcome, ViewportChangeReason, ViewportMode,
    ViewportStatus, ViewportTarget,
};
pub use error::{RendererError, ResourceKind};
pub use events::{EventCallback, EventHost, MapEvent, MapEventKind, SubscriptionHandle};
pub use geometry::{Coordinate, CoordinateBounds, EdgeInsets, Geometry, ScreenPoint, ScreenRect};
pub use headless::{
    HeadlessMapRenderer, HeadlessView, HostOperation, PuckLocation, RenderedFeature, RendererCall,
};
pub use query::{
    FeatureQueryHost, QueriedFeature, QueryCallback, QueryResult, QueryTarget, QueryToken,
};
pub use style::{
    Feature, LayerKind, LayerPosition, LayerSpec, LayerUpdate, Properties, SourceDiff, StyleHost,
};
pub use view::{
    AnchorConfig, AnchorPosition, NativeView, ViewAnchor, ViewHandle, ViewHost, ViewOptions,
    ViewUpdate,
};

/// Everything a map coordinator needs from the renderer.
pub trait MapRenderer: CameraHost + StyleHost + ViewHost + EventHost + FeatureQueryHost {}

impl<T> MapRenderer for T where
    T: CameraHost + StyleHost + ViewHost + EventHost + FeatureQueryHost + ?Sized
{
}

#[cfg(test)]
#[path = "tests/headless_tests.rs"]
mod tests;
