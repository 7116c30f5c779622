//! Lines, rays and segments.
//!
//! A [`Line`] is `origin + s * direction`. Rays accept `s >= 0`, segments
//! `0 <= s <= 1`; both are widened by the picking tolerance at the ends.

use glam::DVec3;

use tessera_core::epsilon::DETERMINANT_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Line {
    pub origin: DVec3,
    pub direction: DVec3,
    pub bounded: bool,
}

impl Line {
    pub fn ray(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction,
            bounded: false,
        }
    }

    pub fn segment(start: DVec3, end: DVec3) -> Self {
        Self {
            origin: start,
            direction: end - start,
            bounded: true,
        }
    }

    #[inline]
    pub fn at(&self, s: f64) -> DVec3 {
        self.origin + self.direction * s
    }

    #[inline]
    fn upper(&self) -> f64 {
        if self.bounded { 1.0 } else { f64::INFINITY }
    }

    /// Whether parameter `s` lies on the line's range, within `epsilon`.
    #[inline]
    pub fn accepts(&self, s: f64, epsilon: f64) -> bool {
        s >= -epsilon && (!self.bounded || s <= 1.0 + epsilon)
    }

    #[inline]
    pub fn clamp(&self, s: f64) -> f64 {
        s.clamp(0.0, self.upper())
    }
}

/// Parameter at which `point` lies on `line`.
pub(crate) fn point_on_line(line: &Line, point: DVec3, epsilon: f64) -> Option<f64> {
    let (distance_sq, s) = closest_to_point(line, point);
    (distance_sq <= epsilon * epsilon).then_some(s)
}

/// Parameter along `line` where it meets the segment `[a, b]`.
///
/// Solves the 2x2 normal equations of `a + t (b - a) = origin + s direction`
/// through the explicit inverse. A singular system (parallel or degenerate
/// input) falls back to testing the segment's endpoints against the line.
pub(crate) fn segment_on_line(a: DVec3, b: DVec3, line: &Line, epsilon: f64) -> Option<f64> {
    let u = b - a;
    let d = line.direction;
    if u.length_squared() <= epsilon * epsilon {
        return point_on_line(line, a, epsilon);
    }
    let w = line.origin - a;
    let (uu, ud, dd) = (u.dot(u), u.dot(d), d.dot(d));
    let det = ud * ud - uu * dd;
    if det.abs() <= DETERMINANT_EPSILON * (uu * dd).max(1.0) {
        return collinear_hit(a, b, line, epsilon);
    }

    let (wu, wd) = (w.dot(u), w.dot(d));
    let t = (-dd * wu + ud * wd) / det;
    let s = (-ud * wu + uu * wd) / det;
    if t < -epsilon || t > 1.0 + epsilon || !line.accepts(s, epsilon) {
        return None;
    }
    let s = line.clamp(s);
    let on_segment = a + u * t.clamp(0.0, 1.0);
    (on_segment.distance_squared(line.at(s)) <= epsilon * epsilon).then_some(s)
}

fn collinear_hit(a: DVec3, b: DVec3, line: &Line, epsilon: f64) -> Option<f64> {
    let segment = Line::segment(a, b);
    if point_on_line(&segment, line.origin, epsilon).is_some() {
        return Some(0.0);
    }
    [a, b]
        .into_iter()
        .filter_map(|p| point_on_line(line, p, epsilon))
        .min_by(f64::total_cmp)
}

/// Squared distance from `point` to `line` and the parameter of the closest
/// point, clamped to the line's range.
pub(crate) fn closest_to_point(line: &Line, point: DVec3) -> (f64, f64) {
    let len_sq = line.direction.length_squared();
    let s = if len_sq > 0.0 {
        line.clamp((point - line.origin).dot(line.direction) / len_sq)
    } else {
        0.0
    };
    (line.at(s).distance_squared(point), s)
}

/// Closest approach between `line` and the segment `[a, b]`: squared
/// distance, line parameter and the point on the segment.
pub(crate) fn closest_to_segment(line: &Line, a: DVec3, b: DVec3) -> (f64, f64, DVec3) {
    let d1 = line.direction;
    let d2 = b - a;
    let r = line.origin - a;
    let (len1, len2) = (d1.dot(d1), d2.dot(d2));
    let f = d2.dot(r);

    let (s, t) = if len1 <= f64::EPSILON && len2 <= f64::EPSILON {
        (0.0, 0.0)
    } else if len1 <= f64::EPSILON {
        (0.0, (f / len2).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if len2 <= f64::EPSILON {
            (line.clamp(-c / len1), 0.0)
        } else {
            let cross = d1.dot(d2);
            let denom = len1 * len2 - cross * cross;
            let s = if denom > 0.0 {
                line.clamp((cross * f - c * len2) / denom)
            } else {
                0.0
            };
            let t = (cross * s + f) / len2;
            if t < 0.0 {
                (line.clamp(-c / len1), 0.0)
            } else if t > 1.0 {
                (line.clamp((cross - c) / len1), 1.0)
            } else {
                (s, t)
            }
        }
    };

    let on_segment = a + d2 * t;
    (line.at(s).distance_squared(on_segment), s, on_segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn crossing_segment_reports_ray_parameter() {
        let ray = Line::ray(DVec3::new(0.0, 0.0, -2.0), DVec3::Z);
        let s = segment_on_line(DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0), &ray, EPS);
        assert!((s.unwrap() - 2.0).abs() < EPS);
    }

    #[test]
    fn skew_lines_do_not_meet() {
        let ray = Line::ray(DVec3::new(0.0, 1.0, -2.0), DVec3::Z);
        let hit = segment_on_line(DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0), &ray, EPS);
        assert!(hit.is_none());
    }

    #[test]
    fn collinear_segment_falls_back_to_endpoints() {
        let ray = Line::ray(DVec3::ZERO, DVec3::X);
        let s = segment_on_line(DVec3::new(3.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0), &ray, EPS);
        assert!((s.unwrap() - 3.0).abs() < EPS);

        let behind = segment_on_line(DVec3::new(-5.0, 0.0, 0.0), DVec3::new(-3.0, 0.0, 0.0), &ray, EPS);
        assert!(behind.is_none());
    }

    #[test]
    fn segment_rejects_points_past_its_end() {
        let segment = Line::segment(DVec3::ZERO, DVec3::X);
        assert!(point_on_line(&segment, DVec3::new(0.5, 0.0, 0.0), EPS).is_some());
        assert!(point_on_line(&segment, DVec3::new(1.5, 0.0, 0.0), EPS).is_none());
    }

    #[test]
    fn closest_approach_of_parallel_offset_lines() {
        let ray = Line::ray(DVec3::ZERO, DVec3::X);
        let (distance_sq, _, _) =
            closest_to_segment(&ray, DVec3::new(1.0, 2.0, 0.0), DVec3::new(3.0, 2.0, 0.0));
        assert!((distance_sq - 4.0).abs() < EPS);
    }
}
