//! Polytope predicates.
//!
//! A polygon meets a polytope when some convex combination of its vertices
//! lies inside every half-space. With `a_ij` the signed distance of vertex
//! `j` to plane `i` and `T0 = max a_ij`, the linear program
//!
//! ```text
//! maximize  s
//! subject   sum_j a_ij * l_j + s <= T0   for every plane i
//!           sum_j l_j = 1
//!           l_j >= 0, s >= 0
//! ```
//!
//! finds the point whose worst plane distance, `T0 - s`, is smallest. The
//! polygon intersects when that distance is within the tolerance.

use glam::DVec3;

use crate::line::Line;
use crate::settings::PickSettings;
use crate::shape::Polytope;
use crate::simplex::{SimplexOutcome, Tableau};

/// Clips the segment `[a, b]` against every half-space and returns the
/// first point that survives.
pub(crate) fn segment_polytope(
    a: DVec3,
    b: DVec3,
    polytope: &Polytope,
    epsilon: f64,
) -> Option<DVec3> {
    let segment = Line::segment(a, b);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);
    for plane in polytope.planes() {
        let outside = plane.signed_distance(a);
        let rate = plane.normal.dot(segment.direction);
        if rate.abs() <= f64::EPSILON {
            if outside > epsilon {
                return None;
            }
            continue;
        }
        let t = (epsilon - outside) / rate;
        if rate > 0.0 {
            exit = exit.min(t);
        } else {
            enter = enter.max(t);
        }
        if enter > exit {
            return None;
        }
    }
    Some(segment.at(enter))
}

/// Polygon of three or more vertices against `polytope`.
///
/// `cells` and `basis` are tableau storage borrowed from the scratch arena.
pub(crate) fn polygon_polytope(
    points: &[DVec3],
    polytope: &Polytope,
    settings: &PickSettings,
    cells: &mut Vec<f64>,
    basis: &mut Vec<usize>,
) -> Option<DVec3> {
    let epsilon = settings.epsilon;
    if let Some(&vertex) = points
        .iter()
        .find(|&&p| polytope.contains_point(p, epsilon))
    {
        return Some(vertex);
    }

    let planes = polytope.planes();
    let mut worst = f64::NEG_INFINITY;
    for plane in planes {
        let nearest = points
            .iter()
            .map(|&p| plane.signed_distance(p))
            .fold(f64::INFINITY, f64::min);
        // Every vertex beyond one plane: the whole polygon is.
        if nearest > epsilon {
            return None;
        }
        for &p in points {
            worst = worst.max(plane.signed_distance(p));
        }
    }
    if planes.is_empty() || worst <= 0.0 {
        return points.first().copied();
    }

    let vertex_count = points.len();
    let slack_var = vertex_count;
    let mut tableau = Tableau::new(cells, basis, vertex_count + 1, planes.len(), 1, epsilon);
    for (row, plane) in planes.iter().enumerate() {
        for (j, &p) in points.iter().enumerate() {
            tableau.set(row, j, plane.signed_distance(p));
        }
        tableau.set(row, slack_var, 1.0);
        tableau.set_rhs(row, worst);
    }
    let weight_row = planes.len();
    for j in 0..vertex_count {
        tableau.set(weight_row, j, 1.0);
    }
    tableau.set_rhs(weight_row, 1.0);

    let outcome = tableau.solve(
        |var| if var == slack_var { -1.0 } else { 0.0 },
        settings.simplex_iteration_limit,
    );
    if outcome != SimplexOutcome::Optimal {
        log::debug!("polytope test ended {outcome:?}; treating the polygon as a miss");
        return None;
    }
    let separation = worst - tableau.value(slack_var);
    if separation > epsilon {
        return None;
    }
    let point: DVec3 = points
        .iter()
        .enumerate()
        .map(|(j, &p)| p * tableau.value(j))
        .sum();
    Some(point)
}
