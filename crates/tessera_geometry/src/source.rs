//! Attribute data representations.
//!
//! A by-reference attribute category is supplied in exactly one of a closed set
//! of representations, modelled as the [`ArraySource`] sum type. Readers go
//! through a [`SourceView`], which holds the caller's read lock for the whole
//! scan instead of re-locking per vertex.

use parking_lot::RwLockReadGuard;

use tessera_core::errors::{Result, TesseraError};

use crate::format::{AttributeCategory, VertexFormat};
use crate::reference::{ElementType, ExternalBuffer, RefArray};

/// One caller-owned representation of an attribute category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArraySource {
    /// Packed `f32` components.
    Float(RefArray<f32>),
    /// Packed `f64` components.
    Double(RefArray<f64>),
    /// Packed bytes, normalized to `[0, 1]` (colors).
    Byte(RefArray<u8>),
    /// One 2-component tuple per vertex.
    Tuple2(RefArray<[f32; 2]>),
    /// One 3-component tuple per vertex.
    Tuple3(RefArray<[f32; 3]>),
    /// One double-precision 3-component tuple per vertex.
    Tuple3d(RefArray<[f64; 3]>),
    /// One 4-component tuple per vertex.
    Tuple4(RefArray<[f32; 4]>),
    /// External contiguous buffer.
    External(ExternalBuffer),
}

/// Tag of an [`ArraySource`] variant, used in diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Float,
    Double,
    Byte,
    Tuple2,
    Tuple3,
    Tuple3d,
    Tuple4,
    External(ElementType),
}

impl ArraySource {
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Float(_) => SourceKind::Float,
            Self::Double(_) => SourceKind::Double,
            Self::Byte(_) => SourceKind::Byte,
            Self::Tuple2(_) => SourceKind::Tuple2,
            Self::Tuple3(_) => SourceKind::Tuple3,
            Self::Tuple3d(_) => SourceKind::Tuple3d,
            Self::Tuple4(_) => SourceKind::Tuple4,
            Self::External(buffer) => SourceKind::External(buffer.element()),
        }
    }

    /// Components per tuple for tuple variants, `None` for packed variants.
    #[must_use]
    pub fn tuple_width(&self) -> Option<usize> {
        match self {
            Self::Tuple2(_) => Some(2),
            Self::Tuple3(_) | Self::Tuple3d(_) => Some(3),
            Self::Tuple4(_) => Some(4),
            _ => None,
        }
    }

    /// `true` for the packed-float forms a renderer can consume directly.
    #[must_use]
    pub fn is_packed_float(&self) -> bool {
        matches!(self, Self::Float(_))
            || matches!(self, Self::External(buffer) if buffer.element() == ElementType::F32)
    }

    /// Whole vertices available when each vertex occupies `width` components.
    #[must_use]
    pub fn vertex_capacity(&self, width: usize) -> usize {
        if width == 0 {
            return 0;
        }
        match self {
            Self::Float(a) => a.len() / width,
            Self::Double(a) => a.len() / width,
            Self::Byte(a) => a.len() / width,
            Self::Tuple2(a) => a.len(),
            Self::Tuple3(a) => a.len(),
            Self::Tuple3d(a) => a.len(),
            Self::Tuple4(a) => a.len(),
            Self::External(b) => b.len() / width,
        }
    }

    /// Version of the underlying caller array.
    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            Self::Float(a) => a.version(),
            Self::Double(a) => a.version(),
            Self::Byte(a) => a.version(),
            Self::Tuple2(a) => a.version(),
            Self::Tuple3(a) => a.version(),
            Self::Tuple3d(a) => a.version(),
            Self::Tuple4(a) => a.version(),
            Self::External(b) => b.bytes().version(),
        }
    }

    /// Locks the caller's array for reading.
    #[must_use]
    pub fn view(&self) -> SourceView<'_> {
        match self {
            Self::Float(a) => SourceView::Float(a.read()),
            Self::Double(a) => SourceView::Double(a.read()),
            Self::Byte(a) => SourceView::Byte(a.read()),
            Self::Tuple2(a) => SourceView::Tuple2(a.read()),
            Self::Tuple3(a) => SourceView::Tuple3(a.read()),
            Self::Tuple3d(a) => SourceView::Tuple3d(a.read()),
            Self::Tuple4(a) => SourceView::Tuple4(a.read()),
            Self::External(b) => SourceView::External(b.bytes().read(), b.element()),
        }
    }

    /// Components per vertex this source stores for `category`.
    ///
    /// `declared` is the width the format declares for the category (color
    /// components, texcoord size, attribute size).
    #[must_use]
    pub fn stored_width(&self, declared: usize) -> usize {
        self.tuple_width().unwrap_or(declared)
    }

    /// Checks that this representation is admissible for `category` under
    /// `format`, where `declared` is the category's declared width.
    pub fn admit(
        &self,
        category: AttributeCategory,
        format: VertexFormat,
        declared: usize,
    ) -> Result<()> {
        let external_format = format.uses_external_buffers();
        let is_external = matches!(self, Self::External(_));
        if external_format != is_external {
            return Err(mismatch(
                category,
                if external_format {
                    "format uses EXTERNAL_BUFFER; an external buffer is required".to_string()
                } else {
                    "external buffers require the EXTERNAL_BUFFER format bit".to_string()
                },
            ));
        }

        let admitted = match (category, self.kind()) {
            (
                AttributeCategory::Coordinate,
                SourceKind::Float
                | SourceKind::Double
                | SourceKind::Tuple3
                | SourceKind::Tuple3d
                | SourceKind::External(ElementType::F32 | ElementType::F64),
            ) => true,
            (
                AttributeCategory::Color,
                SourceKind::Float | SourceKind::Byte | SourceKind::External(ElementType::F32 | ElementType::U8),
            ) => true,
            (AttributeCategory::Color, SourceKind::Tuple3) => declared == 3,
            (AttributeCategory::Color, SourceKind::Tuple4) => declared == 4,
            (
                AttributeCategory::Normal,
                SourceKind::Float | SourceKind::Tuple3 | SourceKind::External(ElementType::F32),
            ) => true,
            (
                AttributeCategory::TexCoord(_),
                SourceKind::Float | SourceKind::External(ElementType::F32),
            ) => true,
            (AttributeCategory::TexCoord(_), SourceKind::Tuple2) => declared == 2,
            (AttributeCategory::TexCoord(_), SourceKind::Tuple3) => declared == 3,
            (AttributeCategory::TexCoord(_), SourceKind::Tuple4) => declared == 4,
            (
                AttributeCategory::VertexAttr(_),
                SourceKind::Float | SourceKind::External(ElementType::F32),
            ) => true,
            _ => false,
        };

        if admitted {
            Ok(())
        } else {
            Err(mismatch(
                category,
                format!("{:?} is not admissible (declared width {declared})", self.kind()),
            ))
        }
    }

    /// Checks that this representation can back an interleaved layout.
    pub fn admit_interleaved(&self, format: VertexFormat) -> Result<()> {
        let ok = if format.uses_external_buffers() {
            matches!(self, Self::External(b) if b.element() == ElementType::F32)
        } else {
            matches!(self, Self::Float(_))
        };
        if ok {
            Ok(())
        } else {
            Err(TesseraError::RepresentationMismatch {
                category: "interleaved",
                detail: format!("{:?} cannot back an interleaved array", self.kind()),
            })
        }
    }
}

fn mismatch(category: AttributeCategory, detail: String) -> TesseraError {
    TesseraError::RepresentationMismatch {
        category: category.name(),
        detail,
    }
}

/// Read-locked view of an [`ArraySource`].
pub enum SourceView<'a> {
    Float(RwLockReadGuard<'a, Vec<f32>>),
    Double(RwLockReadGuard<'a, Vec<f64>>),
    Byte(RwLockReadGuard<'a, Vec<u8>>),
    Tuple2(RwLockReadGuard<'a, Vec<[f32; 2]>>),
    Tuple3(RwLockReadGuard<'a, Vec<[f32; 3]>>),
    Tuple3d(RwLockReadGuard<'a, Vec<[f64; 3]>>),
    Tuple4(RwLockReadGuard<'a, Vec<[f32; 4]>>),
    External(RwLockReadGuard<'a, Vec<u8>>, ElementType),
}

impl SourceView<'_> {
    /// Reads vertex `vertex` into `out` and returns the number of components
    /// written.
    ///
    /// Packed variants read `width` components starting at `vertex * width`;
    /// tuple variants ignore `width` and write their own arity. Components
    /// beyond the end of the data read as zero.
    pub fn read(&self, vertex: usize, width: usize, out: &mut [f32]) -> usize {
        self.read_at(vertex * width, width, vertex, out)
    }

    /// Reads `width` packed components starting at component `first`
    /// (interleaved access). Tuple variants read tuple `first / width`.
    pub fn read_strided(&self, first: usize, width: usize, out: &mut [f32]) -> usize {
        let tuple = first.checked_div(width).unwrap_or(0);
        self.read_at(first, width, tuple, out)
    }

    fn read_at(&self, first: usize, width: usize, tuple: usize, out: &mut [f32]) -> usize {
        match self {
            Self::Float(data) => packed(out, width, |k| data.get(first + k).copied()),
            Self::Double(data) => packed(out, width, |k| data.get(first + k).map(|&v| v as f32)),
            Self::Byte(data) => {
                packed(out, width, |k| data.get(first + k).map(|&v| f32::from(v) / 255.0))
            }
            Self::Tuple2(data) => tuple_into(out, data.get(tuple).copied()),
            Self::Tuple3(data) => tuple_into(out, data.get(tuple).copied()),
            Self::Tuple3d(data) => {
                tuple_into(out, data.get(tuple).map(|t| [t[0] as f32, t[1] as f32, t[2] as f32]))
            }
            Self::Tuple4(data) => tuple_into(out, data.get(tuple).copied()),
            Self::External(bytes, element) => {
                let size = element.size();
                packed(out, width, |k| {
                    let start = (first + k) * size;
                    bytes.get(start..start + size).map(|raw| decode(*element, raw))
                })
            }
        }
    }
}

fn packed(out: &mut [f32], width: usize, mut fetch: impl FnMut(usize) -> Option<f32>) -> usize {
    let n = width.min(out.len());
    for (k, slot) in out.iter_mut().take(n).enumerate() {
        *slot = fetch(k).unwrap_or(0.0);
    }
    n
}

fn tuple_into<const N: usize>(out: &mut [f32], tuple: Option<[f32; N]>) -> usize {
    let tuple = tuple.unwrap_or([0.0; N]);
    let n = N.min(out.len());
    out[..n].copy_from_slice(&tuple[..n]);
    n
}

pub(crate) fn decode(element: ElementType, raw: &[u8]) -> f32 {
    match element {
        ElementType::F32 => bytemuck::pod_read_unaligned::<f32>(raw),
        ElementType::F64 => bytemuck::pod_read_unaligned::<f64>(raw) as f32,
        ElementType::U8 => f32::from(raw[0]) / 255.0,
    }
}
