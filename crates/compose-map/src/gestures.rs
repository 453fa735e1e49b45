//! Routes taps and long presses to annotation groups, layer handlers and
//! finally the map itself.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use compose_map_renderer::{
    Coordinate, FeatureQueryHost, QueriedFeature, QueryTarget, QueryToken, ScreenPoint,
};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GestureKind {
    Tap,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureContext {
    pub point: ScreenPoint,
    pub coordinate: Coordinate,
}

pub type MapGestureHandler = Rc<dyn Fn(&GestureContext)>;
pub type LayerGestureHandler = Rc<dyn Fn(&QueriedFeature, &GestureContext) -> bool>;
pub type AnnotationGestureHandler = Rc<dyn Fn(&str, &GestureContext) -> bool>;

#[derive(Clone)]
pub(crate) struct AnnotationRoute {
    pub layer_id: String,
    pub on_tap: Option<AnnotationGestureHandler>,
    pub on_long_press: Option<AnnotationGestureHandler>,
}

/// Handlers declared by the latest cycle.
#[derive(Clone, Default)]
pub(crate) struct GestureRoutes {
    pub annotations: Vec<AnnotationRoute>,
    pub layer_taps: IndexMap<String, LayerGestureHandler>,
    pub layer_long_presses: IndexMap<String, LayerGestureHandler>,
    pub on_map_tap: Option<MapGestureHandler>,
    pub on_map_long_press: Option<MapGestureHandler>,
}

impl GestureRoutes {
    fn layer_handlers(&self, kind: GestureKind) -> &IndexMap<String, LayerGestureHandler> {
        match kind {
            GestureKind::Tap => &self.layer_taps,
            GestureKind::LongPress => &self.layer_long_presses,
        }
    }

    /// Annotation layers first, then layers with declared handlers.
    fn query_layers(&self, kind: GestureKind) -> Vec<String> {
        let mut layers: Vec<String> = self
            .annotations
            .iter()
            .map(|route| route.layer_id.clone())
            .collect();
        for layer in self.layer_handlers(kind).keys() {
            if !layers.contains(layer) {
                layers.push(layer.clone());
            }
        }
        layers
    }

    /// Offers every hit to its annotation group, then its layer handler.
    /// Falls back to the map handler when nobody consumed the gesture.
    fn dispatch(
        &self,
        kind: GestureKind,
        hits: &[QueriedFeature],
        context: &GestureContext,
    ) -> GestureOutcome {
        for hit in hits {
            if let (Some(route), Some(feature_id)) = (
                self.annotations.iter().find(|route| route.layer_id == hit.layer_id),
                hit.feature_id.as_deref(),
            ) {
                let handler = match kind {
                    GestureKind::Tap => route.on_tap.as_ref(),
                    GestureKind::LongPress => route.on_long_press.as_ref(),
                };
                if handler.is_some_and(|handler| handler(feature_id, context)) {
                    return GestureOutcome::Annotation;
                }
            }
            if let Some(handler) = self.layer_handlers(kind).get(&hit.layer_id) {
                if handler(hit, context) {
                    return GestureOutcome::Layer;
                }
            }
        }
        let fallback = match kind {
            GestureKind::Tap => self.on_map_tap.as_ref(),
            GestureKind::LongPress => self.on_map_long_press.as_ref(),
        };
        if let Some(handler) = fallback {
            handler(context);
        }
        GestureOutcome::Map
    }
}

/// Which handler consumed a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GestureOutcome {
    Annotation,
    Layer,
    Map,
}

/// Issues one rendered-feature query per gesture. A new gesture cancels the
/// pending query of the same kind so stale results are never delivered.
#[derive(Default)]
pub struct ContentGestureDispatcher {
    routes: Rc<RefCell<GestureRoutes>>,
    tap_query: Option<QueryToken>,
    long_press_query: Option<QueryToken>,
    last_outcome: Rc<RefCell<Option<(GestureKind, GestureOutcome)>>>,
}

impl ContentGestureDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_routes(&mut self, routes: GestureRoutes) {
        *self.routes.borrow_mut() = routes;
    }

    /// The most recent gesture that finished dispatching.
    pub fn last_outcome(&self) -> Option<(GestureKind, GestureOutcome)> {
        *self.last_outcome.borrow()
    }

    pub fn handle<R: FeatureQueryHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        kind: GestureKind,
        point: ScreenPoint,
    ) {
        let context = GestureContext {
            point,
            coordinate: renderer.coordinate_for(point),
        };
        let layer_ids = self.routes.borrow().query_layers(kind);
        let routes: Weak<RefCell<GestureRoutes>> = Rc::downgrade(&self.routes);
        let last_outcome = Rc::downgrade(&self.last_outcome);

        let (token, callback) = QueryToken::wrap(move |result| {
            let Some(routes) = routes.upgrade() else {
                return;
            };
            let hits = match result {
                Ok(hits) => hits,
                Err(error) => {
                    log::warn!("feature query for {kind:?} failed: {error}");
                    Vec::new()
                }
            };
            // Routes may be replaced while handlers run.
            let snapshot = routes.borrow().clone();
            let outcome = snapshot.dispatch(kind, &hits, &context);
            if let Some(last) = last_outcome.upgrade() {
                *last.borrow_mut() = Some((kind, outcome));
            }
        });

        let slot = match kind {
            GestureKind::Tap => &mut self.tap_query,
            GestureKind::LongPress => &mut self.long_press_query,
        };
        if let Some(previous) = slot.replace(token) {
            previous.cancel();
        }

        if layer_ids.is_empty() {
            callback(Ok(Vec::new()));
        } else {
            renderer.query_features(QueryTarget::Point(point), &layer_ids, callback);
        }
    }

    pub fn cancel_all(&mut self) {
        self.tap_query = None;
        self.long_press_query = None;
    }
}

#[cfg(test)]
#[path = "tests/gestures_tests.rs"]
mod tests;
