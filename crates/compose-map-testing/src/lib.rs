//! Testing utilities and harness for compose-map

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use compose_map::renderer::{Coordinate, RendererCall, ScreenPoint};
    pub use compose_map::{
        annotations, overlay, Annotation, AnnotationGroup, AnnotationKind, ContentNode,
        MapDeclaration, ViewOverlay, Viewport,
    };
}
