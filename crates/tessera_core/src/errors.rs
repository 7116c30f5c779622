//! Error Types
//!
//! This module defines the error types used throughout the geometry core.
//!
//! # Overview
//!
//! The main error type [`TesseraError`] covers the failure modes a caller can
//! trigger through the public API:
//! - Configuration errors: a format mask that contradicts the supplied counts,
//!   or a data representation the format does not admit
//! - Range errors: indices or windows that exceed the declared capacity
//! - Lifecycle errors: mutation after the geometry has been released
//!
//! Degenerate geometry (zero-length edges, zero-area polygons) and numeric edge
//! cases (alpha near zero, near-singular determinants) are *not* errors; the
//! predicates that meet them fall back to a lower-dimensional test or report
//! "no intersection".
//!
//! Every operation that returns an error leaves the prior state unchanged.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tessera_core::errors::{Result, TesseraError};
//!
//! fn write_color(geometry: &GeometryBuffer) -> Result<()> {
//!     geometry.set_color4(0, glam::Vec4::ONE)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Tessera geometry core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TesseraError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The vertex format mask is inconsistent with itself or with the
    /// operation that was attempted.
    #[error("Invalid vertex format: {0}")]
    InvalidFormat(String),

    /// A count supplied alongside the format does not match what the format
    /// declares (texcoord sets, vertex attributes, component widths).
    #[error("Count mismatch for {what}: expected {expected}, got {actual}")]
    CountMismatch {
        /// What was being counted
        what: &'static str,
        /// The count implied by the format
        expected: usize,
        /// The count actually supplied
        actual: usize,
    },

    /// A data representation was supplied that the attribute category or the
    /// format does not admit (e.g. a 4-wide color on a 3-wide format).
    #[error("Representation mismatch for {category}: {detail}")]
    RepresentationMismatch {
        /// Attribute category name
        category: &'static str,
        /// Human-readable description of the mismatch
        detail: String,
    },

    /// A by-copy mutator was called on by-reference storage, or the reverse.
    #[error("Operation `{operation}` is not available for {mode} storage")]
    StorageModeMismatch {
        /// Name of the rejected operation
        operation: &'static str,
        /// Storage mode of the geometry
        mode: &'static str,
    },

    /// The attribute category is not part of the vertex format.
    #[error("Attribute not present in vertex format: {0}")]
    MissingAttribute(&'static str),

    // ========================================================================
    // Range Errors
    // ========================================================================
    /// A single index exceeds the declared capacity.
    #[error("Index out of range: {context} (index: {index}, limit: {limit})")]
    IndexOutOfRange {
        /// Description of what was being accessed
        context: &'static str,
        /// The invalid index
        index: usize,
        /// The exclusive upper bound
        limit: usize,
    },

    /// A window `[start, start + len)` exceeds the declared capacity.
    #[error("Range exceeded: {context} (start: {start}, len: {len}, capacity: {capacity})")]
    RangeExceeded {
        /// Description of what was being accessed
        context: &'static str,
        /// First element of the window
        start: usize,
        /// Length of the window
        len: usize,
        /// Capacity the window must fit into
        capacity: usize,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The geometry was released; its storage is gone.
    #[error("Geometry has been released")]
    Released,
}

impl TesseraError {
    /// Returns `true` for configuration errors.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::CountMismatch { .. }
                | Self::RepresentationMismatch { .. }
                | Self::StorageModeMismatch { .. }
                | Self::MissingAttribute(_)
        )
    }

    /// Returns `true` for range errors.
    #[must_use]
    pub fn is_range(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. } | Self::RangeExceeded { .. })
    }
}

/// Checks `index < limit`.
#[inline]
pub fn check_index(context: &'static str, index: usize, limit: usize) -> Result<()> {
    if index < limit {
        Ok(())
    } else {
        Err(TesseraError::IndexOutOfRange { context, index, limit })
    }
}

/// Checks `start + len <= capacity` without overflowing.
#[inline]
pub fn check_range(context: &'static str, start: usize, len: usize, capacity: usize) -> Result<()> {
    match start.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(TesseraError::RangeExceeded { context, start, len, capacity }),
    }
}

/// Alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
