//! Unindexer
//!
//! Gathers the index streams of an [`IndexedGeometryBuffer`] into a flat,
//! directly addressed by-copy [`GeometryBuffer`]. Output vertex `i` (for `i`
//! in the valid index window) receives, per category, the source value at
//! `indices[category][i]`. Runs once per structural change, not per frame.

use std::sync::Arc;

use smallvec::SmallVec;

use tessera_core::errors::{Result, TesseraError, check_index, check_range};

use crate::access;
use crate::geometry::GeometryBuffer;
use crate::indexed::IndexedGeometryBuffer;
use crate::layout::{LayoutDesc, StorageMode};
use crate::storage::Storage;

impl IndexedGeometryBuffer {
    /// Writes the unindexed attributes into `dst`.
    ///
    /// `dst` must use by-copy storage, carry the same attribute categories
    /// (texcoord sets and vertex attribute sizes included) and hold at least
    /// `initial_index_index + valid_index_count` vertices. Colors land in the
    /// 4-wide packed slot, with alpha 1.0 when the source has none.
    pub fn unindex_into(&self, dst: &GeometryBuffer) -> Result<()> {
        let src = self.geometry();
        if std::ptr::eq(src, dst) {
            return Err(TesseraError::InvalidFormat(
                "cannot unindex a geometry into its own vertex data".into(),
            ));
        }
        let dst_layout = dst.layout();
        if dst_layout.storage() != StorageMode::Packed {
            return Err(TesseraError::StorageModeMismatch {
                operation: "unindex_into",
                mode: dst_layout.storage().name(),
            });
        }
        if !src.layout().attributes_match(dst_layout) {
            return Err(TesseraError::InvalidFormat(format!(
                "destination format {:?} does not match source format {:?}",
                dst_layout.format().attribute_bits(),
                src.layout().format().attribute_bits(),
            )));
        }

        let (first, count, streams) = self.with_index_state(|state| {
            let streams: SmallVec<[_; 8]> = src
                .layout()
                .categories()
                .into_iter()
                .map(|category| {
                    (
                        category,
                        state.indices(category).map(Arc::clone),
                        state.max_index(category).unwrap_or(0),
                    )
                })
                .collect();
            (state.initial_index_index, state.valid_index_count, streams)
        });
        check_range("unindex destination", first, count, dst.vertex_count())?;

        let stride = dst_layout.stride();
        let gathered = src.with_state(|layout, state| {
            let mut out = vec![0.0_f32; count * stride];
            let mut value = [0.0; 4];
            for (category, indices, max_index) in &streams {
                let category = *category;
                let Some(indices) = indices else {
                    return Err(TesseraError::MissingAttribute(category.name()));
                };
                let reader = state.reader(layout, category);
                if reader.is_missing() {
                    return Err(TesseraError::MissingAttribute(category.name()));
                }
                if count > 0 {
                    check_index(
                        category.name(),
                        *max_index as usize,
                        access::capacity(layout, &state.storage, category),
                    )?;
                }
                let Some(offset) = dst_layout.offset_of(category) else {
                    continue;
                };
                let width = dst_layout.width_of(category);
                for i in 0..count {
                    reader.read(indices[first + i] as usize, &mut value);
                    let base = i * stride + offset;
                    out[base..base + width].copy_from_slice(&value[..width]);
                }
            }
            Ok(out)
        })?;

        dst.commit(dst.present_flags(), |_, state| {
            let Storage::Packed(buffer) = &mut state.storage else {
                return Err(TesseraError::StorageModeMismatch {
                    operation: "unindex_into",
                    mode: "by-reference",
                });
            };
            let start = first * stride;
            Arc::make_mut(buffer)[start..start + gathered.len()].copy_from_slice(&gathered);
            Ok(())
        })?;
        log::debug!(
            "unindexed {count} vertices from geometry {} into {}",
            src.id(),
            dst.id()
        );
        Ok(())
    }

    /// Builds a by-copy geometry of `index_count` vertices holding the
    /// unindexed attributes, with its valid window matching the index window.
    pub fn to_unindexed(&self) -> Result<GeometryBuffer> {
        let layout = self.geometry().layout();
        let desc = LayoutDesc {
            format: layout.format().attribute_bits(),
            vertex_count: self.index_count(),
            texcoord_set_count: layout.texcoord_set_count(),
            texcoord_set_map: SmallVec::from_slice(layout.texcoord_set_map()),
            vertex_attr_sizes: SmallVec::from_slice(layout.vertex_attr_sizes()),
        };
        let dst = GeometryBuffer::with_settings(desc, *self.geometry().settings())?;
        dst.set_valid_vertex_count(self.valid_index_count())?;
        dst.set_initial_vertex_index(self.initial_index_index())?;
        self.unindex_into(&dst)?;
        Ok(dst)
    }
}
