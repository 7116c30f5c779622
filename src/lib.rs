#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Tessera: vertex-geometry storage and picking for retained-mode scene
//! graphs.
//!
//! This crate re-exports the workspace members:
//!
//! - [`foundation`]: errors, change tracking, tolerances and the scratch arena
//! - [`geometry`]: layouts, attribute storage, bounds, alpha copies and
//!   render snapshots
//! - [`pick`]: pick shapes, intersection predicates and the picker

pub use tessera_core as foundation;
pub use tessera_geometry as geometry;
pub use tessera_pick as pick;

/// The math library every public signature speaks.
pub use glam;

pub use tessera_core::{ChangeTracker, Result, TesseraError};
pub use tessera_geometry::{
    ArraySource, AttributeCategory, BoundingBox, DefinedSources, DirtyFlags, ElementType,
    ExternalBuffer, FlatBuffers, GeometryBuffer, GeometrySettings, IndexedGeometryBuffer,
    LayoutDesc, RefArray, RenderSink, RenderSnapshot, SceneLink, StorageMode, VertexFormat,
    VertexLayout,
};
pub use tessera_pick::{
    PickHit, PickSettings, PickShape, Picker, Plane, Polytope, PrimitiveKind, PrimitiveSource,
    triangles_intersect,
};

/// Picks `geometry` with `shape` using default settings.
///
/// Shorthand for [`Picker::pick_geometry`] when no custom tolerance is needed.
#[must_use]
pub fn pick(geometry: &GeometryBuffer, kind: &PrimitiveKind, shape: &PickShape) -> Option<PickHit> {
    let hit = Picker::default().pick_geometry(geometry, kind, shape);
    if let Some(hit) = &hit {
        log::trace!(
            "geometry {} picked: primitive {} at distance {}",
            geometry.id(),
            hit.primitive_index,
            hit.distance
        );
    }
    hit
}
