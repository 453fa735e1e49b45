//! Native views pinned to the map, keyed by explicit id.

use std::fmt;
use std::rc::Rc;

use compose_map_core::collections::map::HashSet;
use compose_map_core::{BackingTable, ResolvedId};
use compose_map_renderer::{NativeView, ViewAnchor, ViewHandle, ViewHost, ViewOptions, ViewUpdate};

use crate::error::{record, ApplyFailure};
use crate::report::ReconcileStats;

pub type ViewFactory = Rc<dyn Fn() -> NativeView>;

#[derive(Clone)]
pub struct ViewOverlay {
    pub id: String,
    pub anchor: ViewAnchor,
    pub options: ViewOptions,
    factory: ViewFactory,
}

impl ViewOverlay {
    pub fn new(
        id: impl Into<String>,
        anchor: ViewAnchor,
        factory: impl Fn() -> NativeView + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            anchor,
            options: ViewOptions::default(),
            factory: Rc::new(factory),
        }
    }

    pub fn options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn allow_overlap(mut self, allow: bool) -> Self {
        self.options.allow_overlap = allow;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.options.visible = visible;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn make_view(&self) -> NativeView {
        (self.factory)()
    }
}

impl fmt::Debug for ViewOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOverlay")
            .field("id", &self.id)
            .field("anchor", &self.anchor)
            .field("options", &self.options)
            .finish()
    }
}

impl PartialEq for ViewOverlay {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.anchor == other.anchor && self.options == other.options
    }
}

/// What the renderer was last told about a live overlay.
#[derive(Debug)]
struct RealizedOverlay {
    handle: ViewHandle,
    anchor: ViewAnchor,
    options: ViewOptions,
}

#[derive(Default)]
pub struct ViewOverlayReconciler {
    realized: BackingTable<RealizedOverlay>,
}

impl ViewOverlayReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.realized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realized.is_empty()
    }

    pub fn handle(&self, id: &ResolvedId) -> Option<ViewHandle> {
        self.realized.get(id).map(|overlay| overlay.handle)
    }

    pub fn reconcile<R: ViewHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        overlays: &[(ResolvedId, &ViewOverlay)],
        failures: &mut Vec<ApplyFailure>,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let mut seen: HashSet<ResolvedId> = HashSet::default();

        for (id, overlay) in overlays {
            seen.insert(id.clone());
            match self.realized.get_mut(id) {
                Some(realized) => {
                    let update = ViewUpdate {
                        anchor: (realized.anchor != overlay.anchor).then(|| overlay.anchor.clone()),
                        options: (realized.options != overlay.options)
                            .then(|| overlay.options.clone()),
                    };
                    if update.is_empty() {
                        continue;
                    }
                    match renderer.update_view(realized.handle, &update) {
                        Ok(()) => {
                            if let Some(anchor) = update.anchor {
                                realized.anchor = anchor;
                            }
                            if let Some(options) = update.options {
                                realized.options = options;
                            }
                            stats.updated += 1;
                        }
                        Err(error) => {
                            record(failures, ApplyFailure::new(&overlay.id, "update_view", error))
                        }
                    }
                }
                None => {
                    let view = overlay.make_view();
                    match renderer.add_view(&overlay.id, view, &overlay.anchor, &overlay.options) {
                        Ok(handle) => {
                            self.realized.insert(
                                id.clone(),
                                RealizedOverlay {
                                    handle,
                                    anchor: overlay.anchor.clone(),
                                    options: overlay.options.clone(),
                                },
                            );
                            stats.created += 1;
                        }
                        Err(error) => {
                            record(failures, ApplyFailure::new(&overlay.id, "add_view", error))
                        }
                    }
                }
            }
        }

        for (id, realized) in self.realized.take_absent(&seen) {
            remove(renderer, &id, realized, failures);
            stats.destroyed += 1;
        }
        stats
    }

    pub fn teardown<R: ViewHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) -> usize {
        let drained = self.realized.drain();
        let count = drained.len();
        for (id, realized) in drained {
            remove(renderer, &id, realized, failures);
        }
        count
    }
}

fn remove<R: ViewHost + ?Sized>(
    renderer: &mut R,
    id: &ResolvedId,
    realized: RealizedOverlay,
    failures: &mut Vec<ApplyFailure>,
) {
    match renderer.remove_view(realized.handle) {
        Ok(view) => {
            log::trace!("released view {} for overlay {id}", realized.handle);
            drop(view);
        }
        Err(error) => record(failures, ApplyFailure::new(id.to_string(), "remove_view", error)),
    }
}

#[cfg(test)]
#[path = "tests/view_overlays_tests.rs"]
mod tests;
