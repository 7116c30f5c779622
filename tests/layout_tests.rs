//! Vertex Layout Tests
//!
//! Tests for:
//! - Offset order and stride of by-copy layouts
//! - Color slot width per storage mode
//! - Texcoord sets and vertex attributes
//! - Format validation

use tessera::geometry::AttributeCategory;
use tessera::{LayoutDesc, StorageMode, TesseraError, VertexFormat, VertexLayout};

fn resolve(format: VertexFormat, count: usize) -> VertexLayout {
    VertexLayout::resolve(&LayoutDesc::new(format, count)).unwrap()
}

// ============================================================================
// Offsets and Strides
// ============================================================================

#[test]
fn full_packed_layout_orders_texcoords_color_normal_coordinate() {
    let layout = resolve(
        VertexFormat::COORDINATES
            | VertexFormat::NORMALS
            | VertexFormat::COLOR_4
            | VertexFormat::TEXCOORD_2,
        8,
    );

    assert_eq!(layout.storage(), StorageMode::Packed);
    assert_eq!(layout.texcoord_offset(), Some(0));
    assert_eq!(layout.color_offset(), Some(2));
    assert_eq!(layout.normal_offset(), Some(6));
    assert_eq!(layout.coordinate_offset(), 9);
    assert_eq!(layout.stride(), 12, "2 texcoord + 4 color + 3 normal + 3 coordinate");
}

#[test]
fn every_valid_mask_packs_categories_back_to_back() {
    let mut valid = 0;
    for bits in 0..VertexFormat::COORD_INDEX_ONLY.bits() {
        let format = VertexFormat::from_bits_truncate(bits);
        let mut desc = LayoutDesc::new(format, 4);
        if format.has_texcoords() {
            desc = desc.with_texcoord_sets(2, &[0, 1]);
        }
        if format.has_vertex_attrs() {
            desc = desc.with_vertex_attrs(&[1, 3]);
        }
        let Ok(layout) = VertexLayout::resolve(&desc) else {
            continue;
        };
        valid += 1;

        let mut next = 0;
        for category in layout.categories() {
            let slot = match category {
                AttributeCategory::Color => layout.color_width(),
                other => layout.width_of(other),
            };
            assert!(slot > 0, "{format:?}: empty {category:?}");
            assert_eq!(layout.offset_of(category), Some(next), "{format:?}: {category:?}");
            next += slot;
        }
        assert_eq!(layout.stride(), next, "{format:?}");
    }
    assert!(valid > 0);
}

#[test]
fn packed_three_component_color_still_takes_four_slots() {
    let layout = resolve(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 4);
    assert_eq!(layout.color_components(), 3);
    assert_eq!(layout.color_width(), 4, "packed colors always reserve an alpha slot");
    assert_eq!(layout.stride(), 7);
}

#[test]
fn interleaved_color_uses_declared_width() {
    let layout = resolve(
        VertexFormat::COORDINATES
            | VertexFormat::COLOR_3
            | VertexFormat::BY_REFERENCE
            | VertexFormat::INTERLEAVED,
        4,
    );
    assert_eq!(layout.storage(), StorageMode::InterleavedRef);
    assert_eq!(layout.color_width(), 3);
    assert_eq!(layout.stride(), 6);
}

#[test]
fn vertex_attributes_lead_the_vertex() {
    let desc = LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::VERTEX_ATTRIBUTES, 2)
        .with_vertex_attrs(&[1, 4]);
    let layout = VertexLayout::resolve(&desc).unwrap();
    assert_eq!(layout.vertex_attr_offsets(), &[0, 1]);
    assert_eq!(layout.vertex_attr_stride(), 5);
    assert_eq!(layout.coordinate_offset(), 5);
    assert_eq!(layout.width_of(AttributeCategory::VertexAttr(1)), 4);
}

#[test]
fn multiple_texcoord_sets_are_contiguous() {
    let desc = LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::TEXCOORD_3, 2)
        .with_texcoord_sets(2, &[1, 0, -1]);
    let layout = VertexLayout::resolve(&desc).unwrap();
    assert_eq!(layout.texcoord_stride(), 6);
    assert_eq!(layout.offset_of(AttributeCategory::TexCoord(1)), Some(3));
    assert_eq!(layout.texcoord_set_for_unit(0), Some(1));
    assert_eq!(layout.texcoord_set_for_unit(2), None, "-1 maps a unit to no set");
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn coordinates_are_mandatory() {
    let err = VertexLayout::resolve(&LayoutDesc::new(VertexFormat::NORMALS, 3)).unwrap_err();
    assert!(matches!(err, TesseraError::InvalidFormat(_)), "got {err:?}");
}

#[test]
fn at_most_one_texcoord_size() {
    let format = VertexFormat::COORDINATES | VertexFormat::TEXCOORD_2 | VertexFormat::TEXCOORD_3;
    let err = VertexLayout::resolve(&LayoutDesc::new(format, 3)).unwrap_err();
    assert!(err.is_configuration(), "got {err:?}");
}

#[test]
fn interleaved_requires_by_reference() {
    let format = VertexFormat::COORDINATES | VertexFormat::INTERLEAVED;
    assert!(VertexLayout::resolve(&LayoutDesc::new(format, 3)).is_err());
}

#[test]
fn coord_index_only_is_for_indexed_geometry() {
    let desc = LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::COORD_INDEX_ONLY, 3);
    assert!(VertexLayout::resolve(&desc).is_err());
    assert!(VertexLayout::resolve_indexed(&desc).is_ok());
}

#[test]
fn attribute_match_ignores_storage_bits() {
    let packed = resolve(VertexFormat::COORDINATES | VertexFormat::NORMALS, 3);
    let by_ref = resolve(
        VertexFormat::COORDINATES | VertexFormat::NORMALS | VertexFormat::BY_REFERENCE,
        3,
    );
    assert!(packed.attributes_match(&by_ref));
}
