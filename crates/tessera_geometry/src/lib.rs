//! Vertex attribute storage for the Tessera geometry core.
//!
//! - [`layout`]: format masks resolved into strides, offsets and a storage policy
//! - [`reference`] / [`source`]: caller-owned arrays and their representations
//! - [`geometry`]: [`GeometryBuffer`], the mutex-guarded attribute store
//! - [`indexed`]: [`IndexedGeometryBuffer`] and unindexing
//! - [`bounds`]: cached axis-aligned bounds
//! - [`snapshot`] / [`link`]: what the renderer and the scene graph see

mod access;
mod alpha;
mod mirror;
mod storage;
mod unindex;

pub mod bounds;
pub mod format;
pub mod geometry;
pub mod indexed;
pub mod layout;
pub mod link;
pub mod reference;
pub mod settings;
pub mod snapshot;
pub mod source;

pub use bounds::BoundingBox;
pub use format::{AttributeCategory, DefinedSources, DirtyFlags, VertexFormat};
pub use geometry::{CoordinateReader, CoordinateView, GeometryBuffer};
pub use indexed::{IndexedCoordinateReader, IndexedCoordinateView, IndexedGeometryBuffer};
pub use layout::{LayoutDesc, StorageMode, VertexLayout};
pub use link::{RenderSink, SceneLink};
pub use reference::{ElementType, ExternalBuffer, RefArray};
pub use settings::GeometrySettings;
pub use snapshot::{
    AlphaBuffer, AttributeStream, FlatBuffers, FloatStream, RenderSnapshot, RenderStreams,
    SeparateStreams,
};
pub use source::{ArraySource, SourceKind};
pub use storage::{PackedBuffer, VertexWindow};
