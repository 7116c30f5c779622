//! Reference Synchronizer
//!
//! Keeps the internally owned mirrors consistent with whichever caller
//! representation is currently set for each category, and computes the
//! composite [`DefinedSources`] tag the renderer is gated on.
//!
//! Mirrors are built only where the renderer cannot consume the caller's
//! data directly:
//!
//! | Category   | Mirrored when the source is        | Mirror width    |
//! |------------|------------------------------------|-----------------|
//! | coordinate | not packed `f32`                   | 3               |
//! | color      | not packed `f32`                   | 4 (alpha = 1.0) |
//! | normal     | a tuple array                      | 3               |
//! | texcoord   | a tuple array                      | texcoord size   |
//!
//! Vertex attributes only admit packed `f32` forms and are never mirrored.

use std::sync::Arc;

use crate::access::declared_width;
use crate::format::{AttributeCategory, DefinedSources, DirtyFlags};
use crate::layout::VertexLayout;
use crate::source::ArraySource;
use crate::storage::{MirrorSet, PackedBuffer, Storage};

fn needs_mirror(category: AttributeCategory, source: &ArraySource) -> bool {
    match category {
        AttributeCategory::VertexAttr(_) => false,
        _ => !source.is_packed_float(),
    }
}

/// Converts `source` into a packed `f32` copy covering every vertex it holds.
pub(crate) fn build_mirror(
    layout: &VertexLayout,
    source: &ArraySource,
    category: AttributeCategory,
) -> PackedBuffer {
    let stored = source.stored_width(declared_width(layout, category));
    let out_width = layout.width_of(category);
    let capacity = source.vertex_capacity(stored);
    let is_color = category == AttributeCategory::Color;

    let view = source.view();
    let mut data = Vec::with_capacity(capacity * out_width);
    for vertex in 0..capacity {
        let mut tmp = [0.0_f32; 4];
        let n = view.read(vertex, stored, &mut tmp);
        if is_color && n == 3 {
            tmp[3] = 1.0;
        }
        data.extend_from_slice(&tmp[..out_width]);
    }
    Arc::new(data)
}

/// Rebuilds (or drops) the mirror of one category.
pub(crate) fn sync_category(
    layout: &VertexLayout,
    storage: &Storage,
    mirrors: &mut MirrorSet,
    category: AttributeCategory,
) {
    let Storage::Separate(refs) = storage else {
        return;
    };
    let Some(slot) = mirrors.slot_mut(category) else {
        return;
    };
    *slot = refs
        .get(category)
        .filter(|source| needs_mirror(category, source))
        .map(|source| {
            log::debug!("building {} mirror from {:?}", category.name(), source.kind());
            build_mirror(layout, source, category)
        });
}

/// Rebuilds the mirrors of every category whose dirty bit is in `changed`.
pub(crate) fn sync_changed(
    layout: &VertexLayout,
    storage: &Storage,
    mirrors: &mut MirrorSet,
    changed: DirtyFlags,
) {
    for category in layout.categories() {
        if changed.intersects(category.dirty_flag()) {
            sync_category(layout, storage, mirrors, category);
        }
    }
}

/// Computes which categories currently have usable data.
///
/// Texcoords and vertex attributes are all-or-nothing: a partially populated
/// set is reported as undefined (and logged), so the renderer draws without
/// that category instead of reading a missing slot.
pub(crate) fn defined_sources(layout: &VertexLayout, storage: &Storage) -> DefinedSources {
    let format = layout.format();
    let mut all = DefinedSources::COORDINATE;
    all.set(DefinedSources::COLOR, format.has_color());
    all.set(DefinedSources::NORMAL, format.has_normals());
    all.set(DefinedSources::TEXCOORD, format.has_texcoords());
    all.set(DefinedSources::VERTEX_ATTR, format.has_vertex_attrs());

    match storage {
        Storage::Packed(_) => all,
        Storage::Interleaved(Some(_)) => all | DefinedSources::INTERLEAVED,
        Storage::Interleaved(None) | Storage::Released => DefinedSources::empty(),
        Storage::Separate(refs) => {
            let mut defined = DefinedSources::empty();
            defined.set(DefinedSources::COORDINATE, refs.coordinate.is_some());
            defined.set(DefinedSources::COLOR, refs.color.is_some());
            defined.set(DefinedSources::NORMAL, refs.normal.is_some());
            defined.set(
                DefinedSources::TEXCOORD,
                all_populated("texcoord sets", &refs.texcoords),
            );
            defined.set(
                DefinedSources::VERTEX_ATTR,
                all_populated("vertex attributes", &refs.vertex_attrs),
            );
            defined & all
        }
    }
}

fn all_populated(what: &str, slots: &[Option<ArraySource>]) -> bool {
    let populated = slots.iter().filter(|slot| slot.is_some()).count();
    if populated > 0 && populated < slots.len() {
        log::warn!(
            "{populated} of {} {what} populated; the category is not rendered until all are set",
            slots.len()
        );
    }
    !slots.is_empty() && populated == slots.len()
}
