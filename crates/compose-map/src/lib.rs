//! Declarative map content on top of a stateful map renderer.
//!
//! A host builds a [`MapDeclaration`] on every update and hands it to a
//! [`MapCoordinator`], which reconciles style layers and sources, annotation
//! groups, view overlays, event subscriptions, camera settings and gesture
//! routes against the renderer with the fewest calls it can.

mod annotations;
mod camera_sync;
mod coordinator;
mod debug;
mod declaration;
mod error;
mod events;
mod gestures;
mod report;
mod style_content;
mod view_overlays;
mod viewport;

pub use annotations::{
    Annotation, AnnotationGroup, AnnotationGroupReconciler, AnnotationKind, AnnotationStats,
    BackingAnnotationManager, DeclaredGroup, ItemChanges, ManagedAnnotation,
};
pub use camera_sync::{
    CameraChangedHandler, CameraSynchronizer, MapSettings, SuppressionGate, ViewportSource,
};
pub use coordinator::{CoordinatorOptions, MapCoordinator};
pub use declaration::{
    annotations, overlay, style_layer, style_source, MapContent, MapContentNode, MapDeclaration,
};
pub use error::ApplyFailure;
pub use events::{EventHandler, EventSubscription, EventSubscriptionRegistry, SubscriptionKey};
pub use gestures::{
    AnnotationGestureHandler, ContentGestureDispatcher, GestureContext, GestureKind,
    GestureOutcome, LayerGestureHandler, MapGestureHandler,
};
pub use report::{CameraReport, CycleReport, ReconcileStats};
pub use style_content::{StyleContentReconciler, StyleLayer, StyleSource, StyleStats};
pub use view_overlays::{ViewFactory, ViewOverlay, ViewOverlayReconciler};
pub use viewport::{
    FollowPuckOptions, OverviewOptions, TransitionCompletion, Viewport, ViewportAnimation,
};

// Debug utilities
pub use debug::{
    format_content_tree, format_cycle_report, format_renderer_calls, log_content_tree,
    log_cycle_report,
};

pub use compose_map_core::{path, Binding, ContentError, ContentNode, ItemKey, ResolvedId};
pub use compose_map_renderer as renderer;
