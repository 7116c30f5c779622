//! Foundational types shared by every Tessera crate.
//!
//! - [`errors`]: the error taxonomy and `Result` alias
//! - [`version_tracker`]: monotonically increasing change versions
//! - [`epsilon`]: numeric thresholds
//! - [`scratch`]: the thread-local scratch arena used on the picking path

pub mod epsilon;
pub mod errors;
pub mod scratch;
pub mod version_tracker;

pub use errors::{Result, TesseraError};
pub use scratch::{Scratch, scratch_stats, with_scratch};
pub use version_tracker::ChangeTracker;
