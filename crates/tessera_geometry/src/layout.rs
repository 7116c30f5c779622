//! Layout Resolver
//!
//! Turns a [`VertexFormat`] plus its counts into a [`VertexLayout`]: the packed
//! stride, per-category offsets, and the storage policy that decides how the
//! canonical storage is allocated.
//!
//! # Offset order
//!
//! Offsets are assigned in a fixed order, independent of which categories are
//! enabled:
//!
//! ```text
//! | vertex attrs | texcoords (all sets) | color | normal | coordinate |
//! 0 ───────────────────────────────────────────────────────────── stride
//! ```
//!
//! Coordinates (read every frame, rarely rewritten) sit last; colors (re-tinted
//! for transparency) sit next to the texcoords.
//!
//! # Color width
//!
//! Every internally owned packed layout stores color 4-wide so the alpha cache
//! can tint 3-component colors too. The caller-owned interleaved layout has to
//! match the caller's array, so its color slot uses the declared width.
//!
//! # Storage policies
//!
//! | by-ref | interleaved | external | policy                          |
//! |--------|-------------|----------|---------------------------------|
//! | no     | no          | no       | [`StorageMode::Packed`]         |
//! | yes    | no          | no / yes | [`StorageMode::SeparateRef`]    |
//! | yes    | yes         | no / yes | [`StorageMode::InterleavedRef`] |
//! | no     | any other combination  | configuration error             |

use smallvec::SmallVec;

use tessera_core::errors::{Result, TesseraError};

use crate::format::{AttributeCategory, VertexFormat};

/// Width of the coordinate slot.
pub const COORDINATE_WIDTH: usize = 3;
/// Width of the normal slot.
pub const NORMAL_WIDTH: usize = 3;
/// Width of the color slot in internally owned packed storage.
pub const PACKED_COLOR_WIDTH: usize = 4;

/// How the canonical storage of a geometry is organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// One internally owned interleaved `f32` buffer (by-copy).
    Packed,
    /// One caller-owned interleaved buffer.
    InterleavedRef,
    /// One caller-owned buffer per attribute category / slot.
    SeparateRef,
}

impl StorageMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Packed => "by-copy",
            Self::InterleavedRef => "interleaved by-reference",
            Self::SeparateRef => "by-reference",
        }
    }
}

/// Input to the layout resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDesc {
    pub format: VertexFormat,
    pub vertex_count: usize,
    pub texcoord_set_count: usize,
    /// Texture unit → texcoord set; `-1` leaves the unit without coordinates.
    pub texcoord_set_map: SmallVec<[i32; 4]>,
    /// Component count (1..=4) of every vertex attribute.
    pub vertex_attr_sizes: SmallVec<[usize; 4]>,
}

impl LayoutDesc {
    /// A descriptor with one texcoord set mapped to unit 0 when the format
    /// has texcoords, and no vertex attributes.
    #[must_use]
    pub fn new(format: VertexFormat, vertex_count: usize) -> Self {
        let (texcoord_set_count, texcoord_set_map) = if format.has_texcoords() {
            (1, SmallVec::from_slice(&[0]))
        } else {
            (0, SmallVec::new())
        };
        Self {
            format,
            vertex_count,
            texcoord_set_count,
            texcoord_set_map,
            vertex_attr_sizes: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_texcoord_sets(mut self, set_count: usize, set_map: &[i32]) -> Self {
        self.texcoord_set_count = set_count;
        self.texcoord_set_map = SmallVec::from_slice(set_map);
        self
    }

    #[must_use]
    pub fn with_vertex_attrs(mut self, sizes: &[usize]) -> Self {
        self.vertex_attr_sizes = SmallVec::from_slice(sizes);
        self
    }
}

/// Resolved memory layout of a geometry. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    format: VertexFormat,
    vertex_count: usize,
    storage: StorageMode,
    indexed: bool,

    stride: usize,
    coordinate_offset: usize,
    normal_offset: Option<usize>,
    color_offset: Option<usize>,
    color_width: usize,
    color_components: usize,

    texcoord_offset: Option<usize>,
    texcoord_size: usize,
    texcoord_set_count: usize,
    texcoord_stride: usize,
    texcoord_set_map: SmallVec<[i32; 4]>,

    vertex_attr_offsets: SmallVec<[usize; 4]>,
    vertex_attr_sizes: SmallVec<[usize; 4]>,
    vertex_attr_stride: usize,
}

impl VertexLayout {
    /// Resolves the layout of a plain (non-indexed) geometry.
    pub fn resolve(desc: &LayoutDesc) -> Result<Self> {
        Self::resolve_with(desc, false)
    }

    /// Resolves the layout of an indexed geometry; `COORD_INDEX_ONLY` is
    /// admissible here.
    pub fn resolve_indexed(desc: &LayoutDesc) -> Result<Self> {
        Self::resolve_with(desc, true)
    }

    fn resolve_with(desc: &LayoutDesc, indexed: bool) -> Result<Self> {
        let format = desc.format;
        let storage = validate_format(format, indexed)?;

        // Texcoord sets must agree with the size bits.
        let texcoord_size = format.texcoord_size().unwrap_or(0);
        if format.has_texcoords() {
            if desc.texcoord_set_count == 0 {
                return Err(TesseraError::CountMismatch {
                    what: "texcoord sets",
                    expected: 1,
                    actual: 0,
                });
            }
            for &set in &desc.texcoord_set_map {
                if set < -1 || set >= desc.texcoord_set_count as i32 {
                    return Err(TesseraError::InvalidFormat(format!(
                        "texcoord set map entry {set} outside 0..{}",
                        desc.texcoord_set_count
                    )));
                }
            }
        } else if desc.texcoord_set_count != 0 {
            return Err(TesseraError::CountMismatch {
                what: "texcoord sets",
                expected: 0,
                actual: desc.texcoord_set_count,
            });
        }

        // Vertex attributes must agree with their bit and have sane sizes.
        if format.has_vertex_attrs() {
            if desc.vertex_attr_sizes.is_empty() {
                return Err(TesseraError::CountMismatch {
                    what: "vertex attributes",
                    expected: 1,
                    actual: 0,
                });
            }
            if let Some(&bad) = desc.vertex_attr_sizes.iter().find(|s| !(1..=4).contains(*s)) {
                return Err(TesseraError::InvalidFormat(format!(
                    "vertex attribute size {bad} outside 1..=4"
                )));
            }
        } else if !desc.vertex_attr_sizes.is_empty() {
            return Err(TesseraError::CountMismatch {
                what: "vertex attributes",
                expected: 0,
                actual: desc.vertex_attr_sizes.len(),
            });
        }

        let mut stride = 0;

        let mut vertex_attr_offsets = SmallVec::new();
        for &size in &desc.vertex_attr_sizes {
            vertex_attr_offsets.push(stride);
            stride += size;
        }
        let vertex_attr_stride = stride;

        let texcoord_stride = desc.texcoord_set_count * texcoord_size;
        let texcoord_offset = format.has_texcoords().then_some(stride);
        stride += texcoord_stride;

        let color_components = format.color_components().unwrap_or(0);
        let color_width = match (format.has_color(), storage) {
            (false, _) => 0,
            (true, StorageMode::InterleavedRef) => color_components,
            (true, _) => PACKED_COLOR_WIDTH,
        };
        let color_offset = format.has_color().then_some(stride);
        stride += color_width;

        let normal_offset = format.has_normals().then_some(stride);
        if format.has_normals() {
            stride += NORMAL_WIDTH;
        }

        let coordinate_offset = stride;
        stride += COORDINATE_WIDTH;

        Ok(Self {
            format,
            vertex_count: desc.vertex_count,
            storage,
            indexed,
            stride,
            coordinate_offset,
            normal_offset,
            color_offset,
            color_width,
            color_components,
            texcoord_offset,
            texcoord_size,
            texcoord_set_count: desc.texcoord_set_count,
            texcoord_stride,
            texcoord_set_map: desc.texcoord_set_map.clone(),
            vertex_attr_offsets,
            vertex_attr_sizes: desc.vertex_attr_sizes.clone(),
            vertex_attr_stride,
        })
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> VertexFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn storage(&self) -> StorageMode {
        self.storage
    }

    #[inline]
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    #[inline]
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.format.uses_external_buffers()
    }

    /// Floats per vertex in the packed / interleaved layout.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    #[must_use]
    pub fn coordinate_offset(&self) -> usize {
        self.coordinate_offset
    }

    #[inline]
    #[must_use]
    pub fn normal_offset(&self) -> Option<usize> {
        self.normal_offset
    }

    #[inline]
    #[must_use]
    pub fn color_offset(&self) -> Option<usize> {
        self.color_offset
    }

    /// Width of the color slot in this layout (0 without colors).
    #[inline]
    #[must_use]
    pub fn color_width(&self) -> usize {
        self.color_width
    }

    /// Declared color components (3 or 4, 0 without colors).
    #[inline]
    #[must_use]
    pub fn color_components(&self) -> usize {
        self.color_components
    }

    #[inline]
    #[must_use]
    pub fn texcoord_offset(&self) -> Option<usize> {
        self.texcoord_offset
    }

    /// Components per texcoord set (0 without texcoords).
    #[inline]
    #[must_use]
    pub fn texcoord_size(&self) -> usize {
        self.texcoord_size
    }

    #[inline]
    #[must_use]
    pub fn texcoord_set_count(&self) -> usize {
        self.texcoord_set_count
    }

    #[inline]
    #[must_use]
    pub fn texcoord_stride(&self) -> usize {
        self.texcoord_stride
    }

    #[must_use]
    pub fn texcoord_set_map(&self) -> &[i32] {
        &self.texcoord_set_map
    }

    /// Texcoord set feeding texture `unit`, if any.
    #[must_use]
    pub fn texcoord_set_for_unit(&self, unit: usize) -> Option<usize> {
        self.texcoord_set_map
            .get(unit)
            .and_then(|&set| usize::try_from(set).ok())
    }

    #[must_use]
    pub fn vertex_attr_count(&self) -> usize {
        self.vertex_attr_sizes.len()
    }

    #[must_use]
    pub fn vertex_attr_offsets(&self) -> &[usize] {
        &self.vertex_attr_offsets
    }

    #[must_use]
    pub fn vertex_attr_sizes(&self) -> &[usize] {
        &self.vertex_attr_sizes
    }

    #[inline]
    #[must_use]
    pub fn vertex_attr_stride(&self) -> usize {
        self.vertex_attr_stride
    }

    /// Components per vertex of `category` as exposed by accessors.
    ///
    /// Colors are always exposed 4-wide.
    #[must_use]
    pub fn width_of(&self, category: AttributeCategory) -> usize {
        match category {
            AttributeCategory::Coordinate => COORDINATE_WIDTH,
            AttributeCategory::Normal => NORMAL_WIDTH,
            AttributeCategory::Color => PACKED_COLOR_WIDTH,
            AttributeCategory::TexCoord(_) => self.texcoord_size,
            AttributeCategory::VertexAttr(attr) => {
                self.vertex_attr_sizes.get(attr).copied().unwrap_or(0)
            }
        }
    }

    /// Offset of `category` inside one packed / interleaved vertex.
    #[must_use]
    pub fn offset_of(&self, category: AttributeCategory) -> Option<usize> {
        match category {
            AttributeCategory::Coordinate => Some(self.coordinate_offset),
            AttributeCategory::Normal => self.normal_offset,
            AttributeCategory::Color => self.color_offset,
            AttributeCategory::TexCoord(set) if set < self.texcoord_set_count => self
                .texcoord_offset
                .map(|offset| offset + set * self.texcoord_size),
            AttributeCategory::TexCoord(_) => None,
            AttributeCategory::VertexAttr(attr) => self.vertex_attr_offsets.get(attr).copied(),
        }
    }

    /// Checks that `category` exists in this layout.
    pub fn require(&self, category: AttributeCategory) -> Result<()> {
        let present = match category {
            AttributeCategory::Coordinate => true,
            AttributeCategory::Normal => self.format.has_normals(),
            AttributeCategory::Color => self.format.has_color(),
            AttributeCategory::TexCoord(set) => {
                if !self.format.has_texcoords() {
                    return Err(TesseraError::MissingAttribute("texcoord"));
                }
                return tessera_core::errors::check_index(
                    "texcoord set",
                    set,
                    self.texcoord_set_count,
                );
            }
            AttributeCategory::VertexAttr(attr) => {
                if !self.format.has_vertex_attrs() {
                    return Err(TesseraError::MissingAttribute("vertex attribute"));
                }
                return tessera_core::errors::check_index(
                    "vertex attribute",
                    attr,
                    self.vertex_attr_sizes.len(),
                );
            }
        };
        if present {
            Ok(())
        } else {
            Err(TesseraError::MissingAttribute(category.name()))
        }
    }

    /// All categories enabled by the format, in offset order.
    #[must_use]
    pub fn categories(&self) -> SmallVec<[AttributeCategory; 8]> {
        let mut out = SmallVec::new();
        for attr in 0..self.vertex_attr_sizes.len() {
            out.push(AttributeCategory::VertexAttr(attr));
        }
        if self.format.has_texcoords() {
            for set in 0..self.texcoord_set_count {
                out.push(AttributeCategory::TexCoord(set));
            }
        }
        if self.format.has_color() {
            out.push(AttributeCategory::Color);
        }
        if self.format.has_normals() {
            out.push(AttributeCategory::Normal);
        }
        out.push(AttributeCategory::Coordinate);
        out
    }

    /// Returns `true` when two layouts carry the same attribute categories
    /// with the same widths, regardless of storage policy.
    #[must_use]
    pub fn attributes_match(&self, other: &Self) -> bool {
        self.format.attribute_bits() == other.format.attribute_bits()
            && self.texcoord_set_count == other.texcoord_set_count
            && self.vertex_attr_sizes == other.vertex_attr_sizes
    }
}

/// Checks the self-consistency of a format mask and returns its storage policy.
fn validate_format(format: VertexFormat, indexed: bool) -> Result<StorageMode> {
    if !format.contains(VertexFormat::COORDINATES) {
        return Err(TesseraError::InvalidFormat(
            "format must include COORDINATES".into(),
        ));
    }
    if format.contains(VertexFormat::WITH_ALPHA) && !format.has_color() {
        return Err(TesseraError::InvalidFormat(
            "WITH_ALPHA requires COLOR".into(),
        ));
    }
    if (format & VertexFormat::TEXCOORD_ANY).bits().count_ones() > 1 {
        return Err(TesseraError::InvalidFormat(
            "at most one of TEXCOORD_2 / TEXCOORD_3 / TEXCOORD_4 may be set".into(),
        ));
    }
    if format.contains(VertexFormat::COORD_INDEX_ONLY) && !indexed {
        return Err(TesseraError::InvalidFormat(
            "COORD_INDEX_ONLY is only valid for indexed geometry".into(),
        ));
    }

    let by_ref = format.is_by_reference();
    let interleaved = format.is_interleaved();
    let external = format.uses_external_buffers();

    match (by_ref, interleaved, external) {
        (false, false, false) => Ok(StorageMode::Packed),
        (false, true, _) => Err(TesseraError::InvalidFormat(
            "INTERLEAVED requires BY_REFERENCE".into(),
        )),
        (false, false, true) => Err(TesseraError::InvalidFormat(
            "EXTERNAL_BUFFER requires BY_REFERENCE".into(),
        )),
        (true, true, _) if format.has_vertex_attrs() => Err(TesseraError::InvalidFormat(
            "INTERLEAVED geometry cannot carry vertex attributes".into(),
        )),
        (true, true, _) => Ok(StorageMode::InterleavedRef),
        (true, false, _) => Ok(StorageMode::SeparateRef),
    }
}
