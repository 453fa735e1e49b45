//! Renderer event stream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::{
    CameraSnapshot, TransitionId, TransitionOutcome, ViewportChangeReason, ViewportStatus,
};
use crate::error::RendererError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapEventKind {
    MapLoaded,
    MapLoadingError,
    StyleLoaded,
    SourceAdded,
    SourceRemoved,
    MapIdle,
    CameraChanged,
    ViewportStatusChanged,
    TransitionFinished,
    RenderFrameFinished,
}

impl fmt::Display for MapEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    MapLoaded,
    MapLoadingError { message: String },
    StyleLoaded,
    SourceAdded { source_id: String },
    SourceRemoved { source_id: String },
    MapIdle,
    CameraChanged(CameraSnapshot),
    ViewportStatusChanged {
        from: ViewportStatus,
        to: ViewportStatus,
        reason: ViewportChangeReason,
    },
    TransitionFinished {
        id: TransitionId,
        outcome: TransitionOutcome,
    },
    RenderFrameFinished,
}

impl MapEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::MapLoaded => MapEventKind::MapLoaded,
            MapEvent::MapLoadingError { .. } => MapEventKind::MapLoadingError,
            MapEvent::StyleLoaded => MapEventKind::StyleLoaded,
            MapEvent::SourceAdded { .. } => MapEventKind::SourceAdded,
            MapEvent::SourceRemoved { .. } => MapEventKind::SourceRemoved,
            MapEvent::MapIdle => MapEventKind::MapIdle,
            MapEvent::CameraChanged(_) => MapEventKind::CameraChanged,
            MapEvent::ViewportStatusChanged { .. } => MapEventKind::ViewportStatusChanged,
            MapEvent::TransitionFinished { .. } => MapEventKind::TransitionFinished,
            MapEvent::RenderFrameFinished => MapEventKind::RenderFrameFinished,
        }
    }
}

pub type EventCallback = Box<dyn FnMut(&MapEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(pub u64);

pub trait EventHost {
    /// Registers `callback` for every event of `kind`. Delivery happens on the
    /// host's serial context.
    fn subscribe(
        &mut self,
        kind: MapEventKind,
        callback: EventCallback,
    ) -> Result<SubscriptionHandle, RendererError>;

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), RendererError>;
}
