//! Immutable render snapshots.
//!
//! A [`RenderSnapshot`] is built under the geometry lock from cheap `Arc`
//! clones and published with a single pointer swap. The renderer reads it
//! without ever taking the geometry lock; writers that come later copy on
//! write instead of mutating what the snapshot holds.

use std::sync::Arc;

use uuid::Uuid;

use crate::format::{AttributeCategory, DefinedSources, DirtyFlags};
use crate::layout::VertexLayout;
use crate::reference::ElementType;
use crate::source::ArraySource;
use crate::storage::{MirrorSet, PackedBuffer, Storage, VertexWindow};

/// Float data handed to the renderer.
#[derive(Debug, Clone)]
pub enum FloatStream {
    /// Internally owned buffer or mirror.
    Owned(PackedBuffer),
    /// Caller-owned packed `f32` data, consumed directly.
    Borrowed(ArraySource),
}

impl FloatStream {
    /// Copies the stream into a plain vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        match self {
            Self::Owned(data) => data.as_ref().clone(),
            Self::Borrowed(ArraySource::Float(array)) => array.read().clone(),
            Self::Borrowed(ArraySource::External(buffer))
                if buffer.element() == ElementType::F32 =>
            {
                let mut out = vec![0.0; buffer.len()];
                buffer.read_into(0, &mut out);
                out
            }
            // Any other representation is mirrored before it reaches a stream.
            Self::Borrowed(_) => Vec::new(),
        }
    }
}

/// One attribute stream of a non-interleaved by-reference geometry.
#[derive(Debug, Clone)]
pub struct AttributeStream {
    pub data: FloatStream,
    /// Floats per vertex.
    pub width: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SeparateStreams {
    pub coordinate: Option<AttributeStream>,
    pub color: Option<AttributeStream>,
    pub normal: Option<AttributeStream>,
    /// Empty unless every texcoord set is populated.
    pub texcoords: Vec<AttributeStream>,
    /// Empty unless every vertex attribute is populated.
    pub vertex_attrs: Vec<AttributeStream>,
}

#[derive(Debug, Clone)]
pub enum RenderStreams {
    /// Nothing to draw (released, or interleaved reference not set).
    Empty,
    Packed { data: PackedBuffer, stride: usize },
    Interleaved { data: FloatStream, stride: usize },
    Separate(SeparateStreams),
}

/// Consistent, immutable view of a geometry for one frame.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub geometry_id: Uuid,
    /// Geometry version the snapshot was taken at.
    pub version: u64,
    pub layout: VertexLayout,
    pub window: VertexWindow,
    pub defined: DefinedSources,
    /// Dirty bits accumulated when the snapshot was taken.
    pub dirty: DirtyFlags,
    pub streams: RenderStreams,
}

impl RenderSnapshot {
    pub(crate) fn empty(geometry_id: Uuid, layout: &VertexLayout) -> Self {
        Self {
            geometry_id,
            version: 0,
            layout: layout.clone(),
            window: VertexWindow::for_layout(layout),
            defined: DefinedSources::empty(),
            dirty: DirtyFlags::empty(),
            streams: RenderStreams::Empty,
        }
    }

    pub(crate) fn capture(
        geometry_id: Uuid,
        layout: &VertexLayout,
        parts: SnapshotParts<'_>,
    ) -> Self {
        let streams = match parts.storage {
            Storage::Packed(data) => RenderStreams::Packed {
                data: Arc::clone(data),
                stride: layout.stride(),
            },
            Storage::Interleaved(Some(source)) => RenderStreams::Interleaved {
                data: FloatStream::Borrowed(source.clone()),
                stride: layout.stride(),
            },
            Storage::Separate(refs) => {
                let stream = |category: AttributeCategory| -> Option<AttributeStream> {
                    if let Some(mirror) = parts.mirrors.get(category) {
                        return Some(AttributeStream {
                            data: FloatStream::Owned(Arc::clone(mirror)),
                            width: layout.width_of(category),
                        });
                    }
                    let source = refs.get(category)?;
                    source.is_packed_float().then(|| AttributeStream {
                        data: FloatStream::Borrowed(source.clone()),
                        width: crate::access::declared_width(layout, category),
                    })
                };
                let texcoords = if parts.defined.contains(DefinedSources::TEXCOORD) {
                    (0..layout.texcoord_set_count())
                        .filter_map(|set| stream(AttributeCategory::TexCoord(set)))
                        .collect()
                } else {
                    Vec::new()
                };
                let vertex_attrs = if parts.defined.contains(DefinedSources::VERTEX_ATTR) {
                    (0..layout.vertex_attr_count())
                        .filter_map(|attr| stream(AttributeCategory::VertexAttr(attr)))
                        .collect()
                } else {
                    Vec::new()
                };
                RenderStreams::Separate(SeparateStreams {
                    coordinate: stream(AttributeCategory::Coordinate),
                    color: stream(AttributeCategory::Color),
                    normal: stream(AttributeCategory::Normal),
                    texcoords,
                    vertex_attrs,
                })
            }
            Storage::Interleaved(None) | Storage::Released => RenderStreams::Empty,
        };

        Self {
            geometry_id,
            version: parts.version,
            layout: layout.clone(),
            window: parts.window.clone(),
            defined: parts.defined,
            dirty: parts.dirty,
            streams,
        }
    }
}

/// Borrowed pieces of geometry state a snapshot is captured from.
pub(crate) struct SnapshotParts<'a> {
    pub storage: &'a Storage,
    pub mirrors: &'a MirrorSet,
    pub window: &'a VertexWindow,
    pub defined: DefinedSources,
    pub dirty: DirtyFlags,
    pub version: u64,
}

/// Per-screen alpha-tinted color data.
#[derive(Debug, Clone)]
pub struct AlphaBuffer {
    pub screen: usize,
    /// Alpha after clamping.
    pub alpha: f32,
    pub data: PackedBuffer,
    /// Floats per vertex in `data`.
    pub stride: usize,
    /// Offset of the 4-wide color inside one vertex of `data`.
    pub color_offset: usize,
}

/// What a [`RenderSink`](crate::RenderSink) receives on submission.
#[derive(Debug, Clone)]
pub struct FlatBuffers {
    pub snapshot: Arc<RenderSnapshot>,
    pub alpha: Option<AlphaBuffer>,
}
