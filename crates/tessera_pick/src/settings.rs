use serde::{Deserialize, Serialize};

use tessera_core::epsilon::GEOMETRY_EPSILON;

/// Picking configuration, passed to [`Picker::new`](crate::Picker::new).
///
/// # Fields
///
/// | Field                     | Description                                   | Default |
/// |---------------------------|-----------------------------------------------|---------|
/// | `epsilon`                 | Geometric tolerance of every predicate        | `1e-5`  |
/// | `simplex_iteration_limit` | Pivot limit of the polytope linear program    | `256`   |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickSettings {
    /// Distances, parameters and determinants within this of a boundary are
    /// treated as on it.
    pub epsilon: f64,

    /// Pivots allowed per polytope test before the solver gives up and the
    /// primitive is reported as not intersecting.
    pub simplex_iteration_limit: usize,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            epsilon: GEOMETRY_EPSILON,
            simplex_iteration_limit: 256,
        }
    }
}
