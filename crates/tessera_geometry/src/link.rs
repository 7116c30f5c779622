//! Seams to the scene graph and the renderer.

use crate::format::DirtyFlags;
use crate::geometry::GeometryBuffer;
use crate::snapshot::FlatBuffers;

/// Scene-graph side of a geometry.
///
/// A geometry holds at most one link. While the link reports
/// [`is_active_in_scene`](SceneLink::is_active_in_scene), every successful
/// mutation publishes a fresh render snapshot and calls
/// [`geometry_changed`](SceneLink::geometry_changed) after the geometry lock
/// has been released, so the callback may read the geometry back.
pub trait SceneLink: Send + Sync {
    fn is_active_in_scene(&self) -> bool;

    fn geometry_changed(&self, geometry: &GeometryBuffer, changed: DirtyFlags);
}

/// Rendering side: receives flat buffers ready for submission.
pub trait RenderSink {
    fn submit(&self, buffers: &FlatBuffers);
}
