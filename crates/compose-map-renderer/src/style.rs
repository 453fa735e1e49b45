//! Style sources, layers and per-feature data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RendererError;
use crate::geometry::Geometry;

/// Opaque style property bag passed through to the renderer unchanged.
pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Symbol,
    Circle,
    Line,
    Fill,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Symbol => "symbol",
            LayerKind::Circle => "circle",
            LayerKind::Line => "line",
            LayerKind::Fill => "fill",
        }
    }
}

/// Where a new layer is inserted into the style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayerPosition {
    #[default]
    Top,
    Above(String),
    Below(String),
    At(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    pub position: LayerPosition,
    pub slot: Option<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerUpdate {
    pub slot: Option<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
    pub properties: Properties,
}

/// Incremental change to a GeoJSON source, keyed by feature id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceDiff {
    pub added: Vec<Feature>,
    pub updated: Vec<Feature>,
    pub removed: Vec<String>,
}

impl SourceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

pub trait StyleHost {
    /// Adds an empty GeoJSON source.
    fn add_source(&mut self, id: &str) -> Result<(), RendererError>;

    fn remove_source(&mut self, id: &str) -> Result<(), RendererError>;

    fn add_layer(&mut self, spec: &LayerSpec) -> Result<(), RendererError>;

    fn update_layer(&mut self, id: &str, update: &LayerUpdate) -> Result<(), RendererError>;

    /// Reinserts an existing layer at `position`, keeping its properties.
    fn move_layer(&mut self, id: &str, position: &LayerPosition) -> Result<(), RendererError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), RendererError>;

    fn apply_source_diff(&mut self, source_id: &str, diff: &SourceDiff)
        -> Result<(), RendererError>;
}
