//! Picking queries over whole geometries.

use std::ops::ControlFlow;

use glam::DVec3;

use tessera_core::scratch::{Scratch, with_scratch};
use tessera_geometry::{GeometryBuffer, IndexedGeometryBuffer};

use crate::polygon::{polygon_line, polygon_point, polygon_polygon};
use crate::polytope::{polygon_polytope, segment_polytope};
use crate::primitive::{PrimitiveKind, PrimitiveSource, for_each_primitive};
use crate::settings::PickSettings;
use crate::shape::PickShape;
use crate::triangle::{Triangle, triangles_intersect};
use crate::volume::{polygon_box, polygon_cone, polygon_cylinder, polygon_sphere};

/// Closest primitive hit by a pick shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Euclidean distance from the shape's reference point to `point`.
    pub distance: f64,
    pub point: DVec3,
    /// Position of the primitive in assembly order.
    pub primitive_index: usize,
}

/// First pair of overlapping primitives found between two geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitivePair {
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Picker {
    settings: PickSettings,
}

impl Picker {
    #[must_use]
    pub fn new(settings: PickSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &PickSettings {
        &self.settings
    }

    /// Tests every primitive of `source` against `shape` and returns the
    /// hit closest to the shape's reference point.
    pub fn intersect<S>(&self, source: &S, kind: &PrimitiveKind, shape: &PickShape) -> Option<PickHit>
    where
        S: PrimitiveSource + ?Sized,
    {
        let reference = shape.reference_point();
        with_scratch(|scratch| {
            let Scratch {
                points,
                scalars,
                indices,
                ..
            } = scratch;
            let mut closest: Option<PickHit> = None;
            let _ = for_each_primitive(source, kind, points, |primitive_index, primitive| {
                if let Some(point) = self.primitive_hit(primitive, shape, scalars, indices) {
                    let distance = point.distance(reference);
                    if closest.is_none_or(|best| distance < best.distance) {
                        closest = Some(PickHit {
                            distance,
                            point,
                            primitive_index,
                        });
                    }
                }
                ControlFlow::Continue(())
            });
            closest
        })
    }

    /// Whether any primitive of `source` touches `shape`. Stops at the first
    /// hit.
    pub fn intersects<S>(&self, source: &S, kind: &PrimitiveKind, shape: &PickShape) -> bool
    where
        S: PrimitiveSource + ?Sized,
    {
        with_scratch(|scratch| {
            let Scratch {
                points,
                scalars,
                indices,
                ..
            } = scratch;
            let flow = for_each_primitive(source, kind, points, |_, primitive| {
                match self.primitive_hit(primitive, shape, scalars, indices) {
                    Some(_) => ControlFlow::Break(()),
                    None => ControlFlow::Continue(()),
                }
            });
            flow.is_break()
        })
    }

    /// [`Self::intersect`] over the valid window of `geometry`.
    pub fn pick_geometry(
        &self,
        geometry: &GeometryBuffer,
        kind: &PrimitiveKind,
        shape: &PickShape,
    ) -> Option<PickHit> {
        let view = geometry.coordinate_view();
        let reader = view.reader();
        self.intersect(&reader, kind, shape)
    }

    /// [`Self::intersect`] over the valid index window of `geometry`.
    pub fn pick_indexed(
        &self,
        geometry: &IndexedGeometryBuffer,
        kind: &PrimitiveKind,
        shape: &PickShape,
    ) -> Option<PickHit> {
        let view = geometry.coordinate_view();
        let reader = view.reader();
        self.intersect(&reader, kind, shape)
    }

    /// Finds a primitive of `a` overlapping a primitive of `b`.
    pub fn intersect_geometries<A, B>(
        &self,
        a: &A,
        kind_a: &PrimitiveKind,
        b: &B,
        kind_b: &PrimitiveKind,
    ) -> Option<PrimitivePair>
    where
        A: PrimitiveSource + ?Sized,
        B: PrimitiveSource + ?Sized,
    {
        let epsilon = self.settings.epsilon;
        with_scratch(|scratch| {
            let Scratch {
                points,
                other_points,
                ..
            } = scratch;
            let mut found = None;
            let _ = for_each_primitive(a, kind_a, points, |first, pa| {
                let _ = for_each_primitive(b, kind_b, other_points, |second, pb| {
                    if primitives_intersect(pa, pb, epsilon) {
                        found = Some(PrimitivePair { first, second });
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                });
                if found.is_some() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
            found
        })
    }

    /// A point of `points` inside `shape`, if any.
    fn primitive_hit(
        &self,
        points: &[DVec3],
        shape: &PickShape,
        cells: &mut Vec<f64>,
        basis: &mut Vec<usize>,
    ) -> Option<DVec3> {
        let epsilon = self.settings.epsilon;
        match shape {
            PickShape::Point { point } => polygon_point(points, *point, epsilon).then_some(*point),
            PickShape::Ray { .. } | PickShape::Segment { .. } => {
                let axis = shape.axis()?;
                polygon_line(points, &axis, epsilon).map(|s| axis.at(s))
            }
            PickShape::Sphere { center, radius } => polygon_sphere(points, *center, *radius, epsilon),
            PickShape::CylinderRay { radius, .. } | PickShape::CylinderSegment { radius, .. } => {
                polygon_cylinder(points, &shape.axis()?, *radius, epsilon)
            }
            PickShape::ConeRay { spread_angle, .. } | PickShape::ConeSegment { spread_angle, .. } => {
                polygon_cone(points, &shape.axis()?, *spread_angle, epsilon)
            }
            PickShape::Box { min, max } => polygon_box(points, *min, *max, epsilon),
            PickShape::Polytope(polytope) => match points {
                [] => None,
                [vertex] => polytope.contains_point(*vertex, epsilon).then_some(*vertex),
                [a, b] => segment_polytope(*a, *b, polytope, epsilon),
                _ => polygon_polytope(points, polytope, &self.settings, cells, basis),
            },
        }
    }
}

fn primitives_intersect(a: &[DVec3], b: &[DVec3], epsilon: f64) -> bool {
    if let (Ok(ta), Ok(tb)) = (<&Triangle>::try_from(a), <&Triangle>::try_from(b)) {
        return triangles_intersect(ta, tb, epsilon);
    }
    polygon_polygon(a, b, epsilon).is_some()
}
