//! Picking for the Tessera geometry core.
//!
//! - [`shape`]: rays, segments, volumes and polytopes to pick with
//! - [`primitive`]: how vertex streams group into points, lines and polygons
//! - [`picker`]: [`Picker`], closest-hit and geometry-vs-geometry queries
//! - [`triangle`]: triangle-triangle overlap
//! - [`simplex`]: the small linear-program solver behind polytope tests
//!
//! All predicates run in double precision on the thread's scratch arena.

mod line;
mod polygon;
mod polytope;
mod volume;

pub mod picker;
pub mod primitive;
pub mod settings;
pub mod shape;
pub mod simplex;
pub mod triangle;

pub use picker::{PickHit, Picker, PrimitivePair};
pub use primitive::{PrimitiveKind, PrimitiveSource};
pub use settings::PickSettings;
pub use shape::{PickShape, Plane, Polytope};
pub use simplex::{SimplexOutcome, Tableau};
pub use triangle::{Triangle, triangles_intersect};
