//! Shared numeric thresholds.
//!
//! Geometry predicates never compare floating-point values against exact zero
//! except where a value has first been snapped; everything else goes through
//! one of these thresholds.

/// Default geometric tolerance for picking predicates (f64 space).
pub const GEOMETRY_EPSILON: f64 = 1.0e-5;

/// Default tolerance for the alpha-blend cache. Alphas at or below this value
/// are clamped to it, and two alphas closer than this are considered equal.
pub const ALPHA_EPSILON: f32 = 1.0e-5;

/// Tolerance under which a determinant is treated as singular.
pub const DETERMINANT_EPSILON: f64 = 1.0e-12;

/// Returns `true` when `|a - b| < eps`.
#[inline]
#[must_use]
pub fn nearly_equal(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// Snaps values with magnitude below `eps` to exactly zero.
#[inline]
#[must_use]
pub fn snap_to_zero(value: f64, eps: f64) -> f64 {
    if value.abs() < eps { 0.0 } else { value }
}
