//! Volume predicates: spheres, cylinders, cones and boxes.
//!
//! Each returns a point of the primitive that lies inside the volume; the
//! picker measures hit distances to it.

use glam::DVec3;

use crate::line::{Line, closest_to_point, closest_to_segment};
use crate::polygon::{edges, point_in_polygon, polygon_line, polygon_normal, polygon_polygon};

pub(crate) fn polygon_sphere(
    points: &[DVec3],
    center: DVec3,
    radius: f64,
    epsilon: f64,
) -> Option<DVec3> {
    let radius_sq = radius * radius;
    let nearest = points
        .iter()
        .copied()
        .map(|v| (v.distance_squared(center), v))
        .filter(|(distance_sq, _)| *distance_sq <= radius_sq)
        .min_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((_, vertex)) = nearest {
        return Some(vertex);
    }

    for (a, b) in edges(points) {
        let edge = Line::segment(a, b);
        let (distance_sq, t) = closest_to_point(&edge, center);
        if distance_sq <= radius_sq {
            return Some(edge.at(t));
        }
    }

    if points.len() >= 3
        && let Some(normal) = polygon_normal(points, epsilon)
    {
        let height = normal.dot(center - points[0]);
        let foot = center - normal * height;
        if height.abs() <= radius && point_in_polygon(points, normal, foot, epsilon) {
            return Some(foot);
        }
    }
    None
}

/// Cylinder of `radius` around `axis`.
pub(crate) fn polygon_cylinder(
    points: &[DVec3],
    axis: &Line,
    radius: f64,
    epsilon: f64,
) -> Option<DVec3> {
    if let Some(s) = polygon_line(points, axis, epsilon) {
        return Some(axis.at(s));
    }
    let radius_sq = radius * radius;
    if let [vertex] = points {
        let (distance_sq, _) = closest_to_point(axis, *vertex);
        return (distance_sq <= radius_sq).then_some(*vertex);
    }
    edges(points).find_map(|(a, b)| {
        let (distance_sq, _, point) = closest_to_segment(axis, a, b);
        (distance_sq <= radius_sq).then_some(point)
    })
}

/// Cone with its apex at the axis origin. The radius is re-evaluated per
/// edge at the axis parameter of closest approach.
pub(crate) fn polygon_cone(
    points: &[DVec3],
    axis: &Line,
    spread_angle: f64,
    epsilon: f64,
) -> Option<DVec3> {
    if let Some(s) = polygon_line(points, axis, epsilon) {
        return Some(axis.at(s));
    }
    let slope = spread_angle.tan() * axis.direction.length();
    let inside = |distance_sq: f64, s: f64| {
        let radius = slope * s;
        distance_sq <= radius * radius
    };
    if let [vertex] = points {
        let (distance_sq, s) = closest_to_point(axis, *vertex);
        return inside(distance_sq, s).then_some(*vertex);
    }
    edges(points).find_map(|(a, b)| {
        let (distance_sq, s, point) = closest_to_segment(axis, a, b);
        inside(distance_sq, s).then_some(point)
    })
}

/// Corner indices of each face, as a closed loop. Bit 0 of a corner index
/// selects `max.x`, bit 1 `max.y`, bit 2 `max.z`.
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 2, 6, 4],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 1, 3, 2],
    [4, 5, 7, 6],
];

fn box_faces(min: DVec3, max: DVec3) -> [[DVec3; 4]; 6] {
    let corner = |i: usize| {
        DVec3::new(
            if i & 1 != 0 { max.x } else { min.x },
            if i & 2 != 0 { max.y } else { min.y },
            if i & 4 != 0 { max.z } else { min.z },
        )
    };
    BOX_FACES.map(|face| face.map(corner))
}

/// Axis-aligned box `[min, max]`: vertex containment, then a per-axis
/// trivial reject, then the primitive against each face quad.
pub(crate) fn polygon_box(
    points: &[DVec3],
    min: DVec3,
    max: DVec3,
    epsilon: f64,
) -> Option<DVec3> {
    let lo = min - DVec3::splat(epsilon);
    let hi = max + DVec3::splat(epsilon);
    if let Some(&vertex) = points
        .iter()
        .find(|p| p.cmpge(lo).all() && p.cmple(hi).all())
    {
        return Some(vertex);
    }
    for axis in 0..3 {
        if points.iter().all(|p| p[axis] < lo[axis]) || points.iter().all(|p| p[axis] > hi[axis]) {
            return None;
        }
    }
    if points.len() < 2 {
        return None;
    }
    box_faces(min, max)
        .iter()
        .find_map(|face| polygon_polygon(points, face, epsilon))
}
