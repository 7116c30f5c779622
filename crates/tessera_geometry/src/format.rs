//! Vertex format masks and change flags.
//!
//! [`VertexFormat`] is fixed when a geometry is created and decides which
//! attribute categories exist and how they are stored. [`DirtyFlags`] records
//! which categories changed since the rendering collaborator last consumed a
//! snapshot. [`DefinedSources`] is the composite "which categories currently
//! have data" tag computed by the synchronizer.

use bitflags::bitflags;

bitflags! {
    /// Capability mask describing the per-vertex layout of a geometry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexFormat: u32 {
        /// Per-vertex coordinates. Mandatory.
        const COORDINATES       = 1 << 0;
        /// Per-vertex normals.
        const NORMALS           = 1 << 1;
        /// Per-vertex colors (RGB).
        const COLOR             = 1 << 2;
        /// Colors carry an alpha channel. Only valid together with `COLOR`.
        const WITH_ALPHA        = 1 << 3;
        /// 2-component texture coordinates.
        const TEXCOORD_2        = 1 << 4;
        /// 3-component texture coordinates.
        const TEXCOORD_3        = 1 << 5;
        /// 4-component texture coordinates.
        const TEXCOORD_4        = 1 << 6;
        /// Generic vertex attributes.
        const VERTEX_ATTRIBUTES = 1 << 7;
        /// Attribute data is owned by the caller and read through references.
        const BY_REFERENCE      = 1 << 8;
        /// All attributes of a vertex are contiguous in one caller array.
        const INTERLEAVED       = 1 << 9;
        /// References are external contiguous byte buffers.
        const EXTERNAL_BUFFER   = 1 << 10;
        /// Indexed geometry reads every category through the coordinate indices.
        const COORD_INDEX_ONLY  = 1 << 11;

        /// RGB colors.
        const COLOR_3 = Self::COLOR.bits();
        /// RGBA colors.
        const COLOR_4 = Self::COLOR.bits() | Self::WITH_ALPHA.bits();
    }
}

impl VertexFormat {
    /// Mask of the three texcoord-size bits.
    pub const TEXCOORD_ANY: Self = Self::TEXCOORD_2
        .union(Self::TEXCOORD_3)
        .union(Self::TEXCOORD_4);

    /// Bits that select a storage policy rather than an attribute.
    pub const STORAGE_BITS: Self = Self::BY_REFERENCE
        .union(Self::INTERLEAVED)
        .union(Self::EXTERNAL_BUFFER);

    #[inline]
    #[must_use]
    pub fn has_normals(self) -> bool {
        self.contains(Self::NORMALS)
    }

    #[inline]
    #[must_use]
    pub fn has_color(self) -> bool {
        self.contains(Self::COLOR)
    }

    #[inline]
    #[must_use]
    pub fn has_alpha(self) -> bool {
        self.contains(Self::COLOR_4)
    }

    #[inline]
    #[must_use]
    pub fn has_texcoords(self) -> bool {
        self.intersects(Self::TEXCOORD_ANY)
    }

    #[inline]
    #[must_use]
    pub fn has_vertex_attrs(self) -> bool {
        self.contains(Self::VERTEX_ATTRIBUTES)
    }

    #[inline]
    #[must_use]
    pub fn is_by_reference(self) -> bool {
        self.contains(Self::BY_REFERENCE)
    }

    #[inline]
    #[must_use]
    pub fn is_interleaved(self) -> bool {
        self.contains(Self::INTERLEAVED)
    }

    #[inline]
    #[must_use]
    pub fn uses_external_buffers(self) -> bool {
        self.contains(Self::EXTERNAL_BUFFER)
    }

    /// Declared color width: 3, 4, or `None` without colors.
    #[must_use]
    pub fn color_components(self) -> Option<usize> {
        match (self.has_color(), self.contains(Self::WITH_ALPHA)) {
            (true, true) => Some(4),
            (true, false) => Some(3),
            _ => None,
        }
    }

    /// Texcoord components per set, or `None` without texcoords.
    ///
    /// Returns `None` as well when more than one size bit is set; the layout
    /// resolver rejects such masks before this matters.
    #[must_use]
    pub fn texcoord_size(self) -> Option<usize> {
        let sizes = self & Self::TEXCOORD_ANY;
        if sizes == Self::TEXCOORD_2 {
            Some(2)
        } else if sizes == Self::TEXCOORD_3 {
            Some(3)
        } else if sizes == Self::TEXCOORD_4 {
            Some(4)
        } else {
            None
        }
    }

    /// Attribute bits only, with storage and indexing policy stripped.
    #[must_use]
    pub fn attribute_bits(self) -> Self {
        self - Self::STORAGE_BITS - Self::COORD_INDEX_ONLY
    }
}

bitflags! {
    /// Categories modified since the renderer last consumed a snapshot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        const COORDINATE  = 1 << 0;
        const NORMAL      = 1 << 1;
        const COLOR       = 1 << 2;
        const TEXTURE     = 1 << 3;
        const INDEX       = 1 << 4;
        const STRIP_COUNT = 1 << 5;
        const VERTEX_ATTR = 1 << 6;

        const ALL_ATTRIBUTES = Self::COORDINATE.bits()
            | Self::NORMAL.bits()
            | Self::COLOR.bits()
            | Self::TEXTURE.bits()
            | Self::VERTEX_ATTR.bits();
    }
}

bitflags! {
    /// Composite tag of the categories that currently have usable data.
    ///
    /// For texcoords and vertex attributes the bit is set only when *every*
    /// set / attribute slot is populated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DefinedSources: u32 {
        const COORDINATE  = 1 << 0;
        const COLOR       = 1 << 1;
        const NORMAL      = 1 << 2;
        const TEXCOORD    = 1 << 3;
        const VERTEX_ATTR = 1 << 4;
        const INTERLEAVED = 1 << 5;
    }
}

/// One attribute category, with the slot number for multi-slot categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeCategory {
    Coordinate,
    Color,
    Normal,
    /// Texcoord set index.
    TexCoord(usize),
    /// Vertex attribute index.
    VertexAttr(usize),
}

impl AttributeCategory {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Coordinate => "coordinate",
            Self::Color => "color",
            Self::Normal => "normal",
            Self::TexCoord(_) => "texcoord",
            Self::VertexAttr(_) => "vertex attribute",
        }
    }

    /// The dirty bit raised when this category changes.
    #[must_use]
    pub fn dirty_flag(self) -> DirtyFlags {
        match self {
            Self::Coordinate => DirtyFlags::COORDINATE,
            Self::Color => DirtyFlags::COLOR,
            Self::Normal => DirtyFlags::NORMAL,
            Self::TexCoord(_) => DirtyFlags::TEXTURE,
            Self::VertexAttr(_) => DirtyFlags::VERTEX_ATTR,
        }
    }
}
