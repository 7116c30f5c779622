//! Primitive assembly.
//!
//! A [`PrimitiveSource`] yields vertex positions in window order; a
//! [`PrimitiveKind`] says how consecutive positions group into primitives.

use std::ops::ControlFlow;

use glam::{DVec3, Vec3};
use smallvec::SmallVec;

use tessera_geometry::{
    CoordinateReader, GeometryBuffer, IndexedCoordinateReader, IndexedGeometryBuffer,
};

/// Vertex positions a picker walks, indexed from the start of the valid
/// window.
pub trait PrimitiveSource {
    fn vertex_count(&self) -> usize;

    fn vertex(&self, i: usize) -> Option<DVec3>;
}

impl PrimitiveSource for CoordinateReader<'_> {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        self.get(i).map(Vec3::as_dvec3)
    }
}

impl PrimitiveSource for IndexedCoordinateReader<'_> {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        self.get(i).map(Vec3::as_dvec3)
    }
}

/// Locks the geometry per vertex; prefer a [`CoordinateReader`] for large
/// queries.
impl PrimitiveSource for GeometryBuffer {
    fn vertex_count(&self) -> usize {
        self.valid_vertex_count()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        let window = self.window();
        if i >= window.valid_vertex_count {
            return None;
        }
        self.coordinate(window.coordinate + i)
            .ok()
            .map(Vec3::as_dvec3)
    }
}

/// Walks the valid index window through the coordinate indices.
impl PrimitiveSource for IndexedGeometryBuffer {
    fn vertex_count(&self) -> usize {
        self.valid_index_count()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        if i >= self.valid_index_count() {
            return None;
        }
        let index = self.coordinate_index(self.initial_index_index() + i).ok()?;
        self.geometry()
            .coordinate(index as usize)
            .ok()
            .map(Vec3::as_dvec3)
    }
}

impl PrimitiveSource for [DVec3] {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        self.get(i).copied()
    }
}

impl PrimitiveSource for [Vec3] {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn vertex(&self, i: usize) -> Option<DVec3> {
        self.get(i).map(|v| v.as_dvec3())
    }
}

/// How vertices group into primitives. Strip and fan variants carry the
/// vertex count of each strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    Triangles,
    Quads,
    LineStrips(SmallVec<[usize; 4]>),
    TriangleStrips(SmallVec<[usize; 4]>),
    TriangleFans(SmallVec<[usize; 4]>),
}

impl PrimitiveKind {
    /// One strip or fan covering the first `count` vertices.
    #[must_use]
    pub fn line_strip(count: usize) -> Self {
        Self::LineStrips(SmallVec::from_elem(count, 1))
    }

    #[must_use]
    pub fn triangle_strip(count: usize) -> Self {
        Self::TriangleStrips(SmallVec::from_elem(count, 1))
    }

    #[must_use]
    pub fn triangle_fan(count: usize) -> Self {
        Self::TriangleFans(SmallVec::from_elem(count, 1))
    }
}

/// Calls `visit(primitive_index, points)` for every complete primitive,
/// reusing `points` as the assembly buffer. Stops at the first `Break`, or
/// at the first vertex the source cannot produce.
pub(crate) fn for_each_primitive<S, F>(
    source: &S,
    kind: &PrimitiveKind,
    points: &mut Vec<DVec3>,
    mut visit: F,
) -> ControlFlow<()>
where
    S: PrimitiveSource + ?Sized,
    F: FnMut(usize, &[DVec3]) -> ControlFlow<()>,
{
    let total = source.vertex_count();
    let mut primitive = 0;
    let mut emit = |points: &mut Vec<DVec3>, vertices: &[usize]| -> ControlFlow<()> {
        points.clear();
        for &v in vertices {
            match source.vertex(v) {
                Some(p) => points.push(p),
                None => return ControlFlow::Break(()),
            }
        }
        let index = primitive;
        primitive += 1;
        visit(index, points.as_slice())
    };

    match kind {
        PrimitiveKind::Points => {
            for v in 0..total {
                emit(points, &[v])?;
            }
        }
        PrimitiveKind::Lines => {
            for v in (0..total / 2).map(|i| i * 2) {
                emit(points, &[v, v + 1])?;
            }
        }
        PrimitiveKind::Triangles => {
            for v in (0..total / 3).map(|i| i * 3) {
                emit(points, &[v, v + 1, v + 2])?;
            }
        }
        PrimitiveKind::Quads => {
            for v in (0..total / 4).map(|i| i * 4) {
                emit(points, &[v, v + 1, v + 2, v + 3])?;
            }
        }
        PrimitiveKind::LineStrips(counts) => {
            let mut start = 0;
            for &count in counts {
                for v in start..(start + count).saturating_sub(1) {
                    emit(points, &[v, v + 1])?;
                }
                start += count;
            }
        }
        PrimitiveKind::TriangleStrips(counts) => {
            let mut start = 0;
            for &count in counts {
                for v in start..(start + count).saturating_sub(2) {
                    emit(points, &[v, v + 1, v + 2])?;
                }
                start += count;
            }
        }
        PrimitiveKind::TriangleFans(counts) => {
            let mut start = 0;
            for &count in counts {
                for v in start + 1..(start + count).saturating_sub(1) {
                    emit(points, &[start, v, v + 1])?;
                }
                start += count;
            }
        }
    }
    ControlFlow::Continue(())
}
