use compose_map_renderer::CameraSnapshot;
use serde::Serialize;

use crate::annotations::AnnotationStats;
use crate::error::ApplyFailure;
use crate::style_content::StyleStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
}

impl ReconcileStats {
    pub fn is_empty(&self) -> bool {
        self.created + self.updated + self.destroyed == 0
    }
}

/// Outcome of the camera synchronizer for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CameraReport {
    /// A viewport intent reached the renderer this cycle.
    pub viewport_applied: bool,
    /// Number of map settings pushed past the equality guard.
    pub settings_applied: usize,
    /// The camera moved during the cycle; notification is deferred a turn.
    pub camera_changed: bool,
    pub camera: CameraSnapshot,
}

/// Summary of one `MapCoordinator::update` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub leaves: usize,
    pub camera: CameraReport,
    pub style: StyleStats,
    pub annotations: AnnotationStats,
    pub overlays: ReconcileStats,
    pub subscriptions_attached: usize,
    pub failures: Vec<ApplyFailure>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Backing objects created, updated or destroyed this cycle, across all
    /// reconcilers.
    pub fn total_changes(&self) -> usize {
        [
            self.style.sources,
            self.style.layers,
            self.annotations.groups,
            self.overlays,
        ]
        .iter()
        .map(|stats| stats.created + stats.updated + stats.destroyed)
        .sum()
    }
}
