//! Pick shapes.
//!
//! Every shape lives in double precision. Rays extend from their origin to
//! infinity; segments and their cylinder/cone variants end at `end`. Cones
//! widen from the apex (the origin) by `spread_angle` radians.

use glam::{DMat4, DVec3, DVec4};
use smallvec::SmallVec;

use tessera_core::epsilon::{DETERMINANT_EPSILON, GEOMETRY_EPSILON};

use crate::line::Line;

/// Half-space `normal · x <= d`, with `normal` of unit length unless the
/// plane was built from a zero vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub d: f64,
}

impl Plane {
    /// Builds the half-space `normal · x <= d`, normalizing both sides.
    #[must_use]
    pub fn new(normal: DVec3, d: f64) -> Self {
        let length = normal.length();
        if length > 0.0 {
            Self {
                normal: normal / length,
                d: d / length,
            }
        } else {
            Self { normal, d }
        }
    }

    /// Half-space bounded by the plane through `point`, with `normal`
    /// pointing outwards.
    #[must_use]
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self::new(normal, normal.dot(point))
    }

    /// Positive outside, negative inside.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.d
    }
}

/// Convex region bounded by half-spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Polytope {
    planes: SmallVec<[Plane; 8]>,
}

impl Polytope {
    #[must_use]
    pub fn new(planes: impl IntoIterator<Item = Plane>) -> Self {
        Self {
            planes: planes.into_iter().collect(),
        }
    }

    /// The axis-aligned box `[min, max]` as six half-spaces.
    #[must_use]
    pub fn from_box(min: DVec3, max: DVec3) -> Self {
        Self::new([
            Plane::new(DVec3::NEG_X, -min.x),
            Plane::new(DVec3::X, max.x),
            Plane::new(DVec3::NEG_Y, -min.y),
            Plane::new(DVec3::Y, max.y),
            Plane::new(DVec3::NEG_Z, -min.z),
            Plane::new(DVec3::Z, max.z),
        ])
    }

    /// Extracts the view frustum of a view-projection matrix (Gribb-Hartmann,
    /// 0..1 depth range).
    #[must_use]
    pub fn from_view_projection(m: DMat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        // Each combination `p` keeps `p · (x, 1) >= 0` inside.
        let inside: [DVec4; 6] = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];
        Self::new(inside.iter().map(|p| Plane::new(-p.truncate(), p.w)))
    }

    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[must_use]
    pub fn contains_point(&self, point: DVec3, epsilon: f64) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) <= epsilon)
    }

    /// Corners of the polytope: every point where three planes meet inside
    /// all the others.
    #[must_use]
    pub fn vertices(&self) -> Vec<DVec3> {
        let mut corners: Vec<DVec3> = Vec::new();
        let planes = &self.planes;
        for i in 0..planes.len() {
            for j in i + 1..planes.len() {
                for k in j + 1..planes.len() {
                    let (a, b, c) = (planes[i], planes[j], planes[k]);
                    let bc = b.normal.cross(c.normal);
                    let det = a.normal.dot(bc);
                    if det.abs() < DETERMINANT_EPSILON {
                        continue;
                    }
                    let point = (bc * a.d
                        + c.normal.cross(a.normal) * b.d
                        + a.normal.cross(b.normal) * c.d)
                        / det;
                    if self.contains_point(point, GEOMETRY_EPSILON)
                        && !corners
                            .iter()
                            .any(|q| q.distance_squared(point) < GEOMETRY_EPSILON)
                    {
                        corners.push(point);
                    }
                }
            }
        }
        corners
    }

    /// Average of [`Self::vertices`]; the origin for an unbounded polytope.
    #[must_use]
    pub fn centroid(&self) -> DVec3 {
        let corners = self.vertices();
        if corners.is_empty() {
            return DVec3::ZERO;
        }
        corners.iter().copied().sum::<DVec3>() / corners.len() as f64
    }
}

/// What a primitive is picked against.
#[derive(Debug, Clone, PartialEq)]
pub enum PickShape {
    Point {
        point: DVec3,
    },
    Ray {
        origin: DVec3,
        direction: DVec3,
    },
    Segment {
        start: DVec3,
        end: DVec3,
    },
    Sphere {
        center: DVec3,
        radius: f64,
    },
    CylinderRay {
        origin: DVec3,
        direction: DVec3,
        radius: f64,
    },
    CylinderSegment {
        start: DVec3,
        end: DVec3,
        radius: f64,
    },
    ConeRay {
        origin: DVec3,
        direction: DVec3,
        spread_angle: f64,
    },
    ConeSegment {
        start: DVec3,
        end: DVec3,
        spread_angle: f64,
    },
    Box {
        min: DVec3,
        max: DVec3,
    },
    Polytope(Polytope),
}

impl PickShape {
    /// Point hit distances are measured from: the origin or start of linear
    /// shapes, the center of a sphere or box, the centroid of a polytope.
    #[must_use]
    pub fn reference_point(&self) -> DVec3 {
        match self {
            Self::Point { point } => *point,
            Self::Ray { origin, .. }
            | Self::CylinderRay { origin, .. }
            | Self::ConeRay { origin, .. } => *origin,
            Self::Segment { start, .. }
            | Self::CylinderSegment { start, .. }
            | Self::ConeSegment { start, .. } => *start,
            Self::Sphere { center, .. } => *center,
            Self::Box { min, max } => (*min + *max) * 0.5,
            Self::Polytope(polytope) => polytope.centroid(),
        }
    }

    /// Axis of the linear shapes.
    pub(crate) fn axis(&self) -> Option<Line> {
        match *self {
            Self::Ray {
                origin, direction, ..
            }
            | Self::CylinderRay {
                origin, direction, ..
            }
            | Self::ConeRay {
                origin, direction, ..
            } => Some(Line::ray(origin, direction)),
            Self::Segment { start, end }
            | Self::CylinderSegment { start, end, .. }
            | Self::ConeSegment { start, end, .. } => Some(Line::segment(start, end)),
            _ => None,
        }
    }
}
