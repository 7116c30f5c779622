//! Representation-agnostic attribute access.
//!
//! Every consumer that needs vertex values (accessors, bounds, mirrors, the
//! alpha cache, unindexing, picking) goes through a [`CategoryReader`], so the
//! storage policy and the caller's representation are resolved once per scan.

use crate::format::AttributeCategory;
use crate::layout::{PACKED_COLOR_WIDTH, VertexLayout};
use crate::source::{ArraySource, SourceView};
use crate::storage::{MirrorSet, Storage};

/// Width of `category` as the format declares it (colors 3 or 4).
pub(crate) fn declared_width(layout: &VertexLayout, category: AttributeCategory) -> usize {
    match category {
        AttributeCategory::Color => layout.color_components(),
        other => layout.width_of(other),
    }
}

/// Components per vertex actually stored for `category` under `storage`.
pub(crate) fn stored_width(
    layout: &VertexLayout,
    storage: &Storage,
    category: AttributeCategory,
) -> usize {
    match (storage, category) {
        (Storage::Packed(_), AttributeCategory::Color) => PACKED_COLOR_WIDTH,
        (Storage::Interleaved(_), AttributeCategory::Color) => layout.color_width(),
        (Storage::Separate(refs), _) => refs
            .get(category)
            .map_or(0, |source| source.stored_width(declared_width(layout, category))),
        _ => layout.width_of(category),
    }
}

/// Whole vertices `source` can supply for `category`.
pub(crate) fn source_capacity(
    layout: &VertexLayout,
    source: &ArraySource,
    category: AttributeCategory,
) -> usize {
    source.vertex_capacity(source.stored_width(declared_width(layout, category)))
}

/// Vertices addressable for `category` under `storage`, counted from 0.
pub(crate) fn capacity(layout: &VertexLayout, storage: &Storage, category: AttributeCategory) -> usize {
    match storage {
        Storage::Packed(_) => layout.vertex_count(),
        Storage::Interleaved(source) => source
            .as_ref()
            .map_or(0, |s| s.vertex_capacity(layout.stride())),
        Storage::Separate(refs) => refs
            .get(category)
            .map_or(0, |s| source_capacity(layout, s, category)),
        Storage::Released => 0,
    }
}

/// Read access to one category of one geometry.
pub(crate) enum CategoryReader<'a> {
    Packed {
        data: &'a [f32],
        stride: usize,
        offset: usize,
        width: usize,
        color: bool,
    },
    Interleaved {
        view: SourceView<'a>,
        stride: usize,
        offset: usize,
        width: usize,
        color: bool,
    },
    Separate {
        view: SourceView<'a>,
        width: usize,
        color: bool,
    },
    Missing,
}

impl<'a> CategoryReader<'a> {
    /// Reader over `category`. Separate references read through their packed
    /// mirror when one exists, so non-float representations are decoded once
    /// per synchronization instead of once per read.
    pub fn new(
        layout: &VertexLayout,
        storage: &'a Storage,
        mirrors: &'a MirrorSet,
        category: AttributeCategory,
    ) -> Self {
        let color = category == AttributeCategory::Color;
        let Some(offset) = layout.offset_of(category) else {
            return Self::Missing;
        };
        let width = stored_width(layout, storage, category);
        match storage {
            Storage::Packed(data) => Self::Packed {
                data: data.as_slice(),
                stride: layout.stride(),
                offset,
                width,
                color,
            },
            Storage::Interleaved(Some(source)) => Self::Interleaved {
                view: source.view(),
                stride: layout.stride(),
                offset,
                width,
                color,
            },
            Storage::Separate(refs) => match (mirrors.get(category), refs.get(category)) {
                (Some(mirror), Some(_)) => {
                    let width = layout.width_of(category);
                    Self::Packed {
                        data: mirror.as_slice(),
                        stride: width,
                        offset: 0,
                        width,
                        color,
                    }
                }
                (None, Some(source)) => Self::Separate {
                    view: source.view(),
                    width,
                    color,
                },
                (_, None) => Self::Missing,
            },
            Storage::Interleaved(None) | Storage::Released => Self::Missing,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Reads vertex `vertex` into `out`; returns the exposed component count.
    ///
    /// Colors are always exposed 4-wide, with alpha 1.0 synthesized for
    /// 3-component data. A missing category reads nothing and returns 0.
    pub fn read(&self, vertex: usize, out: &mut [f32; 4]) -> usize {
        *out = [0.0; 4];
        let (n, color) = match self {
            Self::Packed {
                data,
                stride,
                offset,
                width,
                color,
            } => {
                let base = vertex * stride + offset;
                if let Some(values) = data.get(base..base + width) {
                    out[..*width].copy_from_slice(values);
                }
                (*width, *color)
            }
            Self::Interleaved {
                view,
                stride,
                offset,
                width,
                color,
            } => (
                view.read_strided(vertex * stride + offset, *width, out),
                *color,
            ),
            Self::Separate { view, width, color } => (view.read(vertex, *width, out), *color),
            Self::Missing => return 0,
        };
        if color && n == 3 {
            out[3] = 1.0;
            4
        } else {
            n
        }
    }
}

/// Writes `count` vertices of `category` into a packed buffer, starting at
/// vertex `start`.
///
/// `values` holds `in_width` components per vertex. A 3-wide color written
/// into the 4-wide packed slot gets alpha 1.0.
pub(crate) fn write_packed(
    layout: &VertexLayout,
    buffer: &mut [f32],
    category: AttributeCategory,
    start: usize,
    values: &[f32],
    in_width: usize,
) {
    let Some(offset) = layout.offset_of(category) else {
        return;
    };
    let slot_width = match category {
        AttributeCategory::Color => PACKED_COLOR_WIDTH,
        other => layout.width_of(other),
    };
    let stride = layout.stride();
    let copy = in_width.min(slot_width);
    for (v, vertex) in values.chunks_exact(in_width).enumerate() {
        let base = (start + v) * stride + offset;
        buffer[base..base + copy].copy_from_slice(&vertex[..copy]);
        if category == AttributeCategory::Color && copy == 3 && slot_width == 4 {
            buffer[base + 3] = 1.0;
        }
    }
}
