//! Triangle-triangle overlap (Möller's interval test).
//!
//! Each triangle's vertices are classified against the other's plane, with
//! distances under the tolerance snapped to zero. If neither triangle lies
//! wholly on one side, both cross the line where the planes meet; they
//! overlap when their intervals on that line do. Coplanar pairs are tested
//! in 2D by edge crossings and vertex containment.

use glam::{DVec2, DVec3};

use tessera_core::epsilon::snap_to_zero;

pub type Triangle = [DVec3; 3];

#[must_use]
pub fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let n2 = (t2[1] - t2[0]).cross(t2[2] - t2[0]);
    let d2 = -n2.dot(t2[0]);
    let du = t1.map(|u| snap_to_zero(n2.dot(u) + d2, epsilon));
    if same_side(du) {
        return false;
    }

    let n1 = (t1[1] - t1[0]).cross(t1[2] - t1[0]);
    let d1 = -n1.dot(t1[0]);
    let dv = t2.map(|v| snap_to_zero(n1.dot(v) + d1, epsilon));
    if same_side(dv) {
        return false;
    }

    let direction = n1.cross(n2);
    let axis = dominant_axis(direction);
    let project = |t: &Triangle| t.map(|p| p[axis]);

    let (Some(a), Some(b)) = (interval(project(t1), du), interval(project(t2), dv)) else {
        return coplanar_intersect(&n1, t1, t2, epsilon);
    };
    a.1 >= b.0 && b.1 >= a.0
}

/// All three distances strictly positive or strictly negative.
fn same_side(d: [f64; 3]) -> bool {
    d[0] * d[1] > 0.0 && d[0] * d[2] > 0.0
}

fn dominant_axis(v: DVec3) -> usize {
    let v = v.abs();
    if v.x >= v.y && v.x >= v.z {
        0
    } else if v.y >= v.z {
        1
    } else {
        2
    }
}

/// Sorted interval where the triangle crosses the plane line; `None` when
/// the triangle lies in the other plane.
fn interval(p: [f64; 3], d: [f64; 3]) -> Option<(f64, f64)> {
    let lone = if d[0] * d[1] > 0.0 {
        2
    } else if d[0] * d[2] > 0.0 {
        1
    } else if d[1] * d[2] > 0.0 || d[0] != 0.0 {
        0
    } else if d[1] != 0.0 {
        1
    } else if d[2] != 0.0 {
        2
    } else {
        return None;
    };
    let (i, j) = ((lone + 1) % 3, (lone + 2) % 3);
    let cross = |k: usize| p[lone] + (p[k] - p[lone]) * d[lone] / (d[lone] - d[k]);
    let (x, y) = (cross(i), cross(j));
    Some(if x <= y { (x, y) } else { (y, x) })
}

fn drop_axis(p: DVec3, axis: usize) -> DVec2 {
    match axis {
        0 => DVec2::new(p.y, p.z),
        1 => DVec2::new(p.x, p.z),
        _ => DVec2::new(p.x, p.y),
    }
}

fn coplanar_intersect(normal: &DVec3, t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let axis = dominant_axis(*normal);
    let a = t1.map(|p| drop_axis(p, axis));
    let b = t2.map(|p| drop_axis(p, axis));
    for i in 0..3 {
        for j in 0..3 {
            if segments_cross(a[i], a[(i + 1) % 3], b[j], b[(j + 1) % 3], epsilon) {
                return true;
            }
        }
    }
    point_in_triangle(a[0], &b, epsilon) || point_in_triangle(b[0], &a, epsilon)
}

fn orientation(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn segments_cross(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2, epsilon: f64) -> bool {
    let o1 = snap_to_zero(orientation(p1, p2, q1), epsilon);
    let o2 = snap_to_zero(orientation(p1, p2, q2), epsilon);
    let o3 = snap_to_zero(orientation(q1, q2, p1), epsilon);
    let o4 = snap_to_zero(orientation(q1, q2, p2), epsilon);
    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }
    let within = |a: DVec2, b: DVec2, p: DVec2| {
        p.x >= a.x.min(b.x) - epsilon
            && p.x <= a.x.max(b.x) + epsilon
            && p.y >= a.y.min(b.y) - epsilon
            && p.y <= a.y.max(b.y) + epsilon
    };
    (o1 == 0.0 && within(p1, p2, q1))
        || (o2 == 0.0 && within(p1, p2, q2))
        || (o3 == 0.0 && within(q1, q2, p1))
        || (o4 == 0.0 && within(q1, q2, p2))
}

fn point_in_triangle(p: DVec2, t: &[DVec2; 3], epsilon: f64) -> bool {
    let s = [
        snap_to_zero(orientation(t[0], t[1], p), epsilon),
        snap_to_zero(orientation(t[1], t[2], p), epsilon),
        snap_to_zero(orientation(t[2], t[0], p), epsilon),
    ];
    let negative = s.iter().any(|&v| v < 0.0);
    let positive = s.iter().any(|&v| v > 0.0);
    !(negative && positive)
}
