//! Host-facing declaration of everything a map should show for one cycle.

use std::rc::Rc;

use compose_map_core::{Binding, ContentNode, ContentPayload};
use compose_map_renderer::{
    CameraBounds, CameraSnapshot, ConstrainMode, MapEvent, MapEventKind, NorthOrientation,
    QueriedFeature, ViewportMode,
};
use indexmap::IndexMap;

use crate::annotations::AnnotationGroup;
use crate::camera_sync::{CameraChangedHandler, MapSettings, ViewportSource};
use crate::events::EventSubscription;
use crate::gestures::{GestureContext, LayerGestureHandler, MapGestureHandler};
use crate::style_content::{StyleLayer, StyleSource};
use crate::view_overlays::ViewOverlay;
use crate::viewport::{Viewport, ViewportAnimation};

/// Leaf payload of the map content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MapContent {
    Annotations(AnnotationGroup),
    Overlay(ViewOverlay),
    Layer(StyleLayer),
    Source(StyleSource),
}

impl ContentPayload for MapContent {
    fn explicit_id(&self) -> Option<&str> {
        match self {
            MapContent::Annotations(group) => group.explicit_layer_id(),
            MapContent::Overlay(overlay) => Some(&overlay.id),
            MapContent::Layer(layer) => Some(&layer.id),
            MapContent::Source(source) => Some(&source.id),
        }
    }

    /// Renderer kind the explicit id names. Annotation groups and style
    /// layers both claim layer ids.
    fn id_namespace(&self) -> &'static str {
        match self {
            MapContent::Annotations(_) | MapContent::Layer(_) => "layer",
            MapContent::Source(_) => "source",
            MapContent::Overlay(_) => "view",
        }
    }
}

impl From<AnnotationGroup> for MapContent {
    fn from(group: AnnotationGroup) -> Self {
        MapContent::Annotations(group)
    }
}

impl From<ViewOverlay> for MapContent {
    fn from(overlay: ViewOverlay) -> Self {
        MapContent::Overlay(overlay)
    }
}

impl From<StyleLayer> for MapContent {
    fn from(layer: StyleLayer) -> Self {
        MapContent::Layer(layer)
    }
}

impl From<StyleSource> for MapContent {
    fn from(source: StyleSource) -> Self {
        MapContent::Source(source)
    }
}

pub type MapContentNode = ContentNode<MapContent>;

pub fn annotations(group: AnnotationGroup) -> MapContentNode {
    ContentNode::leaf(MapContent::Annotations(group))
}

pub fn overlay(overlay: ViewOverlay) -> MapContentNode {
    ContentNode::leaf(MapContent::Overlay(overlay))
}

pub fn style_layer(layer: StyleLayer) -> MapContentNode {
    ContentNode::leaf(MapContent::Layer(layer))
}

pub fn style_source(source: StyleSource) -> MapContentNode {
    ContentNode::leaf(MapContent::Source(source))
}

#[derive(Clone, Default)]
pub struct MapDeclaration {
    pub(crate) content: MapContentNode,
    pub(crate) viewport: ViewportSource,
    pub(crate) animation: Option<ViewportAnimation>,
    pub(crate) settings: MapSettings,
    pub(crate) camera_changed: Vec<CameraChangedHandler>,
    pub(crate) subscriptions: Vec<EventSubscription>,
    pub(crate) on_map_tap: Option<MapGestureHandler>,
    pub(crate) on_map_long_press: Option<MapGestureHandler>,
    pub(crate) layer_taps: IndexMap<String, LayerGestureHandler>,
    pub(crate) layer_long_presses: IndexMap<String, LayerGestureHandler>,
}

impl MapDeclaration {
    pub fn new(content: MapContentNode) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    pub fn content(&self) -> &MapContentNode {
        &self.content
    }

    /// Constant viewport, applied on the first cycle only.
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = ViewportSource::Constant(viewport);
        self
    }

    pub fn bound_viewport(mut self, binding: Binding<Viewport>) -> Self {
        self.viewport = ViewportSource::Bound(binding);
        self
    }

    /// Animates changes of a bound viewport made in this cycle.
    pub fn animation(mut self, animation: ViewportAnimation) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn camera_bounds(mut self, bounds: CameraBounds) -> Self {
        self.settings.camera_bounds = bounds;
        self
    }

    pub fn constrain_mode(mut self, mode: ConstrainMode) -> Self {
        self.settings.constrain_mode = mode;
        self
    }

    pub fn viewport_mode(mut self, mode: ViewportMode) -> Self {
        self.settings.viewport_mode = mode;
        self
    }

    pub fn orientation(mut self, orientation: NorthOrientation) -> Self {
        self.settings.orientation = orientation;
        self
    }

    /// Never invoked while the coordinator is inside `update`.
    pub fn on_camera_changed(mut self, handler: impl Fn(&CameraSnapshot) + 'static) -> Self {
        self.camera_changed.push(Rc::new(handler));
        self
    }

    pub fn on_event(mut self, kind: MapEventKind, handler: impl Fn(&MapEvent) + 'static) -> Self {
        self.subscriptions.push(EventSubscription::new(kind, handler));
        self
    }

    pub fn on_map_tap(mut self, handler: impl Fn(&GestureContext) + 'static) -> Self {
        self.on_map_tap = Some(Rc::new(handler));
        self
    }

    pub fn on_map_long_press(mut self, handler: impl Fn(&GestureContext) + 'static) -> Self {
        self.on_map_long_press = Some(Rc::new(handler));
        self
    }

    pub fn on_layer_tap(
        mut self,
        layer_id: impl Into<String>,
        handler: impl Fn(&QueriedFeature, &GestureContext) -> bool + 'static,
    ) -> Self {
        self.layer_taps.insert(layer_id.into(), Rc::new(handler));
        self
    }

    pub fn on_layer_long_press(
        mut self,
        layer_id: impl Into<String>,
        handler: impl Fn(&QueriedFeature, &GestureContext) -> bool + 'static,
    ) -> Self {
        self.layer_long_presses.insert(layer_id.into(), Rc::new(handler));
        self
    }
}
