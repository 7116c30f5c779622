//! Canonical and mirror storage.
//!
//! The canonical storage of a geometry is one of three shapes, picked by the
//! layout resolver's [`StorageMode`]. Mirrors are internally owned packed
//! copies built when a caller reference is not already packed `f32`.
//!
//! Every internally owned buffer is an `Arc<Vec<f32>>`. Writers go through
//! `Arc::make_mut`, so a published render snapshot that still holds the old
//! `Arc` keeps seeing the old contents while the writer works on a copy.

use std::sync::Arc;

use smallvec::{SmallVec, smallvec};

use tessera_core::errors::{Result, TesseraError};

use crate::format::AttributeCategory;
use crate::layout::{StorageMode, VertexLayout};
use crate::source::ArraySource;

/// Internally owned packed float buffer.
pub type PackedBuffer = Arc<Vec<f32>>;

/// Per-category caller references of a non-interleaved by-reference geometry.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReferenceSet {
    pub coordinate: Option<ArraySource>,
    pub color: Option<ArraySource>,
    pub normal: Option<ArraySource>,
    pub texcoords: SmallVec<[Option<ArraySource>; 4]>,
    pub vertex_attrs: SmallVec<[Option<ArraySource>; 4]>,
}

impl ReferenceSet {
    pub fn get(&self, category: AttributeCategory) -> Option<&ArraySource> {
        match category {
            AttributeCategory::Coordinate => self.coordinate.as_ref(),
            AttributeCategory::Color => self.color.as_ref(),
            AttributeCategory::Normal => self.normal.as_ref(),
            AttributeCategory::TexCoord(set) => self.texcoords.get(set).and_then(Option::as_ref),
            AttributeCategory::VertexAttr(attr) => {
                self.vertex_attrs.get(attr).and_then(Option::as_ref)
            }
        }
    }

    pub fn slot_mut(&mut self, category: AttributeCategory) -> Option<&mut Option<ArraySource>> {
        match category {
            AttributeCategory::Coordinate => Some(&mut self.coordinate),
            AttributeCategory::Color => Some(&mut self.color),
            AttributeCategory::Normal => Some(&mut self.normal),
            AttributeCategory::TexCoord(set) => self.texcoords.get_mut(set),
            AttributeCategory::VertexAttr(attr) => self.vertex_attrs.get_mut(attr),
        }
    }
}

/// Canonical storage of a geometry.
#[derive(Debug, Clone)]
pub(crate) enum Storage {
    /// By-copy: `vertex_count * stride` floats.
    Packed(PackedBuffer),
    /// Caller-owned interleaved array (or none yet).
    Interleaved(Option<ArraySource>),
    /// Caller-owned per-category arrays.
    Separate(ReferenceSet),
    /// Torn down; no further access.
    Released,
}

impl Storage {
    /// Allocates the canonical storage for `layout`.
    pub fn allocate(layout: &VertexLayout) -> Self {
        match layout.storage() {
            StorageMode::Packed => {
                Self::Packed(Arc::new(vec![0.0; layout.vertex_count() * layout.stride()]))
            }
            StorageMode::InterleavedRef => Self::Interleaved(None),
            StorageMode::SeparateRef => Self::Separate(ReferenceSet {
                texcoords: smallvec![None; layout.texcoord_set_count()],
                vertex_attrs: smallvec![None; layout.vertex_attr_count()],
                ..ReferenceSet::default()
            }),
        }
    }

    pub fn ensure_live(&self) -> Result<()> {
        if matches!(self, Self::Released) {
            Err(TesseraError::Released)
        } else {
            Ok(())
        }
    }
}

/// Lazily built packed copies of caller references.
#[derive(Debug, Clone, Default)]
pub(crate) struct MirrorSet {
    /// 3 floats per vertex.
    pub coordinate: Option<PackedBuffer>,
    /// Always 4 floats per vertex.
    pub color: Option<PackedBuffer>,
    /// 3 floats per vertex.
    pub normal: Option<PackedBuffer>,
    /// `texcoord_size` floats per vertex, one entry per set.
    pub texcoords: SmallVec<[Option<PackedBuffer>; 4]>,
}

impl MirrorSet {
    pub fn for_layout(layout: &VertexLayout) -> Self {
        Self {
            texcoords: smallvec![None; layout.texcoord_set_count()],
            ..Self::default()
        }
    }

    pub fn get(&self, category: AttributeCategory) -> Option<&PackedBuffer> {
        match category {
            AttributeCategory::Coordinate => self.coordinate.as_ref(),
            AttributeCategory::Color => self.color.as_ref(),
            AttributeCategory::Normal => self.normal.as_ref(),
            AttributeCategory::TexCoord(set) => self.texcoords.get(set).and_then(Option::as_ref),
            AttributeCategory::VertexAttr(_) => None,
        }
    }

    pub fn slot_mut(&mut self, category: AttributeCategory) -> Option<&mut Option<PackedBuffer>> {
        match category {
            AttributeCategory::Coordinate => Some(&mut self.coordinate),
            AttributeCategory::Color => Some(&mut self.color),
            AttributeCategory::Normal => Some(&mut self.normal),
            AttributeCategory::TexCoord(set) => self.texcoords.get_mut(set),
            AttributeCategory::VertexAttr(_) => None,
        }
    }

    pub fn clear(&mut self) {
        self.coordinate = None;
        self.color = None;
        self.normal = None;
        for slot in &mut self.texcoords {
            *slot = None;
        }
    }
}

/// Logical window of drawn vertices, with per-category starting offsets.
///
/// Packed and interleaved geometry keep every initial index equal; separate
/// by-reference geometry may move each category's window independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexWindow {
    pub valid_vertex_count: usize,
    pub coordinate: usize,
    pub color: usize,
    pub normal: usize,
    pub texcoords: SmallVec<[usize; 4]>,
    pub vertex_attrs: SmallVec<[usize; 4]>,
}

impl VertexWindow {
    pub(crate) fn for_layout(layout: &VertexLayout) -> Self {
        Self {
            valid_vertex_count: layout.vertex_count(),
            coordinate: 0,
            color: 0,
            normal: 0,
            texcoords: smallvec![0; layout.texcoord_set_count()],
            vertex_attrs: smallvec![0; layout.vertex_attr_count()],
        }
    }

    /// First vertex of `category`'s window.
    #[must_use]
    pub fn initial(&self, category: AttributeCategory) -> usize {
        match category {
            AttributeCategory::Coordinate => self.coordinate,
            AttributeCategory::Color => self.color,
            AttributeCategory::Normal => self.normal,
            AttributeCategory::TexCoord(set) => self.texcoords.get(set).copied().unwrap_or(0),
            AttributeCategory::VertexAttr(attr) => self.vertex_attrs.get(attr).copied().unwrap_or(0),
        }
    }

    pub(crate) fn set_initial(&mut self, category: AttributeCategory, value: usize) {
        match category {
            AttributeCategory::Coordinate => self.coordinate = value,
            AttributeCategory::Color => self.color = value,
            AttributeCategory::Normal => self.normal = value,
            AttributeCategory::TexCoord(set) => {
                if let Some(slot) = self.texcoords.get_mut(set) {
                    *slot = value;
                }
            }
            AttributeCategory::VertexAttr(attr) => {
                if let Some(slot) = self.vertex_attrs.get_mut(attr) {
                    *slot = value;
                }
            }
        }
    }

    pub(crate) fn set_all_initial(&mut self, value: usize) {
        self.coordinate = value;
        self.color = value;
        self.normal = value;
        self.texcoords.iter_mut().for_each(|slot| *slot = value);
        self.vertex_attrs.iter_mut().for_each(|slot| *slot = value);
    }
}
