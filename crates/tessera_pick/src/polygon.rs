//! Convex polygon predicates (points, segments, triangles and quads).
//!
//! Primitives arrive as point lists of one to four vertices. Inside tests
//! project onto the coordinate plane that drops the normal's dominant axis.

use glam::{DVec2, DVec3};

use crate::line::{Line, point_on_line, segment_on_line};

/// Edges of a primitive: none for a point, one for a segment, the closed
/// loop otherwise.
pub(crate) fn edges(points: &[DVec3]) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
    let count = match points.len() {
        0 | 1 => 0,
        2 => 1,
        n => n,
    };
    (0..count).map(move |i| (points[i], points[(i + 1) % points.len()]))
}

/// Unit normal by Newell's method; `None` when the polygon has no area.
pub(crate) fn polygon_normal(points: &[DVec3], epsilon: f64) -> Option<DVec3> {
    let mut normal = DVec3::ZERO;
    for (a, b) in edges(points) {
        normal += DVec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    let length = normal.length();
    (length > epsilon * epsilon).then(|| normal / length)
}

fn dominant_axis(normal: DVec3) -> usize {
    let n = normal.abs();
    if n.x >= n.y && n.x >= n.z {
        0
    } else if n.y >= n.z {
        1
    } else {
        2
    }
}

#[inline]
fn drop_axis(p: DVec3, axis: usize) -> DVec2 {
    match axis {
        0 => DVec2::new(p.y, p.z),
        1 => DVec2::new(p.z, p.x),
        _ => DVec2::new(p.x, p.y),
    }
}

/// Whether `point`, assumed to lie in the polygon's plane, is inside it.
///
/// Points on an edge count as inside. Zero-length edges are skipped.
pub(crate) fn point_in_polygon(points: &[DVec3], normal: DVec3, point: DVec3, epsilon: f64) -> bool {
    let axis = dominant_axis(normal);
    let p = drop_axis(point, axis);
    let mut side = 0.0_f64;
    let mut any_edge = false;
    for (a, b) in edges(points) {
        let (a, b) = (drop_axis(a, axis), drop_axis(b, axis));
        let edge = b - a;
        let len_sq = edge.length_squared();
        if len_sq <= epsilon * epsilon {
            continue;
        }
        any_edge = true;
        let rel = p - a;
        let cross = rel.perp_dot(edge);
        if cross.abs() <= epsilon * len_sq.sqrt() {
            // On the edge's line: inside exactly when within the edge.
            let t = rel.dot(edge) / len_sq;
            return (-epsilon..=1.0 + epsilon).contains(&t);
        }
        if side == 0.0 {
            side = cross.signum();
        } else if cross.signum() != side {
            return false;
        }
    }
    if !any_edge {
        return points
            .first()
            .is_some_and(|&v| drop_axis(v, axis).distance_squared(p) <= epsilon * epsilon);
    }
    true
}

/// Whether `point` lies on the primitive.
pub(crate) fn polygon_point(points: &[DVec3], point: DVec3, epsilon: f64) -> bool {
    match points {
        [] => false,
        [v] => v.distance_squared(point) <= epsilon * epsilon,
        [a, b] => point_on_line(&Line::segment(*a, *b), point, epsilon).is_some(),
        _ => match polygon_normal(points, epsilon) {
            Some(normal) => {
                normal.dot(point - points[0]).abs() <= epsilon
                    && point_in_polygon(points, normal, point, epsilon)
            }
            None => edges(points)
                .any(|(a, b)| point_on_line(&Line::segment(a, b), point, epsilon).is_some()),
        },
    }
}

fn edges_on_line(points: &[DVec3], line: &Line, epsilon: f64) -> Option<f64> {
    edges(points)
        .filter_map(|(a, b)| segment_on_line(a, b, line, epsilon))
        .min_by(f64::total_cmp)
}

/// First parameter along `line` at which it touches the primitive.
///
/// A line parallel to the polygon's plane only hits when it lies in that
/// plane, and is then tested against the edges.
pub(crate) fn polygon_line(points: &[DVec3], line: &Line, epsilon: f64) -> Option<f64> {
    match points {
        [] => None,
        [v] => point_on_line(line, *v, epsilon),
        [a, b] => segment_on_line(*a, *b, line, epsilon),
        _ => {
            let Some(normal) = polygon_normal(points, epsilon) else {
                return edges_on_line(points, line, epsilon);
            };
            let facing = normal.dot(line.direction);
            let offset = normal.dot(points[0] - line.origin);
            if facing.abs() <= epsilon * line.direction.length() {
                if offset.abs() > epsilon {
                    return None;
                }
                if point_in_polygon(points, normal, line.origin, epsilon) {
                    return Some(0.0);
                }
                return edges_on_line(points, line, epsilon);
            }
            let s = offset / facing;
            if !line.accepts(s, epsilon) {
                return None;
            }
            let s = line.clamp(s);
            point_in_polygon(points, normal, line.at(s), epsilon).then_some(s)
        }
    }
}

/// A point shared by two primitives, found through edge crossings or, for
/// nested coplanar primitives, containment of a vertex.
pub(crate) fn polygon_polygon(a: &[DVec3], b: &[DVec3], epsilon: f64) -> Option<DVec3> {
    let crossing = |from: &[DVec3], into: &[DVec3]| {
        edges(from).find_map(|(p, q)| {
            let edge = Line::segment(p, q);
            polygon_line(into, &edge, epsilon).map(|s| edge.at(s))
        })
    };
    if let Some(point) = crossing(a, b).or_else(|| crossing(b, a)) {
        return Some(point);
    }
    if let Some(&v) = a.first()
        && polygon_point(b, v, epsilon)
    {
        return Some(v);
    }
    b.first().copied().filter(|&v| polygon_point(a, v, epsilon))
}
