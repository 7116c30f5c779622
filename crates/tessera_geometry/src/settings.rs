use serde::{Deserialize, Serialize};

use tessera_core::epsilon::ALPHA_EPSILON;

/// Per-geometry configuration, consumed once at construction.
///
/// # Fields
///
/// | Field           | Description                                          | Default  |
/// |-----------------|------------------------------------------------------|----------|
/// | `alpha_epsilon` | Alpha clamp floor and equality tolerance             | `1e-5`   |
/// | `eager_bounds`  | Recompute bounds inside setters while live           | `true`   |
/// | `max_screens`   | Number of screens the alpha cache can track (≤ 64)   | `64`     |
///
/// # Example
///
/// ```rust,ignore
/// use tessera_geometry::{GeometryBuffer, GeometrySettings, LayoutDesc, VertexFormat};
///
/// // Large, frequently edited meshes: defer bounds to the first query
/// let settings = GeometrySettings {
///     eager_bounds: false,
///     ..Default::default()
/// };
/// let geometry = GeometryBuffer::with_settings(
///     LayoutDesc::new(VertexFormat::COORDINATES, 1024),
///     settings,
/// )?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Alpha values at or below this are clamped to it; two alphas closer than
    /// this are treated as equal by the per-screen alpha cache.
    pub alpha_epsilon: f32,

    /// When `true`, a live geometry recomputes its bounding box inside the
    /// coordinate setter (under the geometry lock). When `false`, bounds are
    /// always recomputed lazily on the next query.
    pub eager_bounds: bool,

    /// Number of distinct screen indices accepted by
    /// [`GeometryBuffer::update_alpha_for`](crate::GeometryBuffer::update_alpha_for).
    /// Clamped to 64, the width of the per-screen changed mask.
    pub max_screens: usize,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            alpha_epsilon: ALPHA_EPSILON,
            eager_bounds: true,
            max_screens: 64,
        }
    }
}

impl GeometrySettings {
    /// Effective screen limit after clamping to the mask width.
    #[inline]
    #[must_use]
    pub fn screen_limit(&self) -> usize {
        self.max_screens.clamp(1, 64)
    }
}
