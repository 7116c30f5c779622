use glam::{Affine3A, Vec3};

use crate::access::CategoryReader;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box; the identity for [`BoundingBox::union`].
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// The `[-1, 1]` cube reported for by-reference geometry without coordinates.
    pub const UNIT: Self = Self {
        min: Vec3::splat(-1.0),
        max: Vec3::splat(1.0),
    };

    #[must_use]
    pub fn infinite() -> Self {
        Self {
            min: Vec3::splat(f32::NEG_INFINITY),
            max: Vec3::splat(f32::INFINITY),
        }
    }

    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bbox, p| {
            bbox.expand_to(p);
            bbox
        })
    }

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vec3 { self.max - self.min }

    #[inline]
    pub fn expand_to(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        Self::from_points(corners.into_iter().map(|p| matrix.transform_point3(p)))
    }

    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// `true` when no point has been added (min > max on some axis).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Cached bounds of a geometry's valid window.
#[derive(Debug, Clone)]
pub(crate) struct BoundsCache {
    bbox: BoundingBox,
    centroid: Vec3,
    dirty: bool,
}

impl Default for BoundsCache {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::EMPTY,
            centroid: Vec3::ZERO,
            dirty: true,
        }
    }
}

impl BoundsCache {
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self) -> (BoundingBox, Vec3) {
        (self.bbox, self.centroid)
    }

    /// Recomputes over vertices `[start, start + count)` of `reader`.
    ///
    /// A missing coordinate source yields the unit cube; an empty window
    /// yields [`BoundingBox::EMPTY`]. The centroid is the box center, or the
    /// origin when the box is empty.
    pub fn recompute(&mut self, reader: &CategoryReader<'_>, start: usize, count: usize) {
        self.bbox = if reader.is_missing() {
            BoundingBox::UNIT
        } else {
            let mut bbox = BoundingBox::EMPTY;
            let mut v = [0.0; 4];
            for vertex in start..start + count {
                reader.read(vertex, &mut v);
                bbox.expand_to(Vec3::new(v[0], v[1], v[2]));
            }
            bbox
        };
        self.centroid = if self.bbox.is_empty() {
            Vec3::ZERO
        } else {
            self.bbox.center()
        };
        self.dirty = false;
        log::trace!("bounds recomputed over {count} vertices: {:?}", self.bbox);
    }
}
