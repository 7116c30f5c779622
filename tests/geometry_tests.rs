//! Geometry Buffer Tests
//!
//! Tests for:
//! - By-copy attribute round trips
//! - Color widening and strict color setters
//! - Valid vertex windows
//! - Bounds, dirty bits and versions
//! - Duplication and release

use glam::{DVec3, Vec3, Vec4};

use tessera::geometry::{DirtyFlags, RenderStreams};
use tessera::{GeometryBuffer, LayoutDesc, TesseraError, VertexFormat};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn triangle() -> GeometryBuffer {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 3)).unwrap();
    geometry
        .set_coordinates(0, &[Vec3::ZERO, Vec3::X, Vec3::Y])
        .unwrap();
    geometry
}

// ============================================================================
// Attribute Round Trips
// ============================================================================

#[test]
fn coordinates_round_trip() {
    let geometry = triangle();
    let points = geometry.coordinates(0, 3).unwrap();
    assert_eq!(points, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert_eq!(geometry.coordinate(2).unwrap(), Vec3::Y);
}

#[test]
fn double_precision_coordinates_are_narrowed() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 1)).unwrap();
    geometry
        .set_coordinates_f64(0, &[DVec3::new(0.5, -1.25, 3.0)])
        .unwrap();
    assert_eq!(geometry.coordinate(0).unwrap(), Vec3::new(0.5, -1.25, 3.0));
}

#[test]
fn all_attributes_live_in_one_vertex() {
    let format = VertexFormat::COORDINATES
        | VertexFormat::NORMALS
        | VertexFormat::COLOR_4
        | VertexFormat::TEXCOORD_2;
    let geometry = GeometryBuffer::new(LayoutDesc::new(format, 2)).unwrap();
    geometry.set_coordinate(1, Vec3::new(1.0, 2.0, 3.0)).unwrap();
    geometry.set_normal(1, Vec3::Z).unwrap();
    geometry.set_color4(1, Vec4::new(0.1, 0.2, 0.3, 0.4)).unwrap();
    geometry.set_texcoord(0, 1, &[0.25, 0.75]).unwrap();

    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(geometry.normal(1).unwrap(), Vec3::Z);
    assert_eq!(geometry.color(1).unwrap(), Vec4::new(0.1, 0.2, 0.3, 0.4));
    assert_eq!(geometry.texcoord(0, 1).unwrap(), Vec4::new(0.25, 0.75, 0.0, 0.0));
    assert_eq!(geometry.coordinate(0).unwrap(), Vec3::ZERO, "untouched vertex stays zeroed");
}

#[test]
fn byte_colors_are_normalized() {
    let geometry =
        GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 1))
            .unwrap();
    geometry.set_colors_u8(0, &[255, 0, 51]).unwrap();
    let color = geometry.color(0).unwrap();
    assert!((color.x - 1.0).abs() < EPSILON);
    assert!((color.z - 0.2).abs() < EPSILON);
}

// ============================================================================
// Colors
// ============================================================================

#[test]
fn three_component_color_reads_back_with_opaque_alpha() {
    let geometry =
        GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 2))
            .unwrap();
    geometry.set_color3(0, Vec3::new(0.2, 0.4, 0.6)).unwrap();
    assert_eq!(geometry.color(0).unwrap(), Vec4::new(0.2, 0.4, 0.6, 1.0));
}

#[test]
fn color_setters_are_strict_about_width() {
    let rgb =
        GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 1))
            .unwrap();
    let err = rgb.set_color4(0, Vec4::ONE).unwrap_err();
    assert!(matches!(err, TesseraError::RepresentationMismatch { .. }), "got {err:?}");

    let rgba =
        GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES | VertexFormat::COLOR_4, 1))
            .unwrap();
    assert!(rgba.set_color3(0, Vec3::ONE).is_err());
}

#[test]
fn missing_category_is_reported() {
    let err = triangle().set_normal(0, Vec3::Z).unwrap_err();
    assert!(matches!(err, TesseraError::MissingAttribute(_)), "got {err:?}");
}

#[test]
fn writes_past_the_end_are_rejected() {
    let geometry = triangle();
    let err = geometry.set_coordinates(2, &[Vec3::ONE, Vec3::ONE]).unwrap_err();
    assert!(err.is_range(), "got {err:?}");
    assert_eq!(geometry.coordinate(2).unwrap(), Vec3::Y, "failed write must not land");
}

// ============================================================================
// Windows and Bounds
// ============================================================================

#[test]
fn bounding_box_of_unit_triangle() {
    let bounds = triangle().bounding_box();
    assert!(approx_vec3(bounds.min, Vec3::ZERO));
    assert!(approx_vec3(bounds.max, Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn bounds_follow_the_valid_window() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 3)).unwrap();
    geometry
        .set_coordinates(0, &[Vec3::splat(5.0), Vec3::X, Vec3::Y])
        .unwrap();
    geometry.set_valid_vertex_count(2).unwrap();
    geometry.set_initial_vertex_index(1).unwrap();

    let bounds = geometry.bounding_box();
    assert!(approx_vec3(bounds.min, Vec3::ZERO), "got {bounds:?}");
    assert!(approx_vec3(bounds.max, Vec3::new(1.0, 1.0, 0.0)), "got {bounds:?}");
    assert!(approx_vec3(geometry.centroid(), Vec3::new(0.5, 0.5, 0.0)));
}

#[test]
fn window_cannot_exceed_vertex_count() {
    let geometry = triangle();
    geometry.set_valid_vertex_count(2).unwrap();
    assert!(geometry.set_initial_vertex_index(2).unwrap_err().is_range());
    assert_eq!(geometry.window().coordinate, 0);
}

#[test]
fn per_category_initial_index_needs_separate_storage() {
    let err = triangle().set_initial_coordinate_index(1).unwrap_err();
    assert!(matches!(err, TesseraError::StorageModeMismatch { .. }), "got {err:?}");
}

// ============================================================================
// Dirty Bits and Versions
// ============================================================================

#[test]
fn writes_raise_dirty_bits_and_bump_version() {
    let geometry = triangle();
    let before = geometry.version();
    geometry.take_dirty();

    geometry.set_coordinate(0, Vec3::NEG_ONE).unwrap();
    assert!(geometry.version() > before);
    assert_eq!(geometry.dirty(), DirtyFlags::COORDINATE);
    assert_eq!(geometry.take_dirty(), DirtyFlags::COORDINATE);
    assert!(geometry.dirty().is_empty());
}

#[test]
fn changed_since_compares_against_a_seen_version() {
    let geometry = triangle();
    let seen = geometry.version();
    assert!(!geometry.changed_since(seen));

    geometry.set_coordinate(1, Vec3::ZERO).unwrap();
    assert!(geometry.changed_since(seen));
    assert!(!geometry.changed_since(geometry.version()));
}

#[test]
fn unattached_geometry_publishes_nothing() {
    let geometry = triangle();
    let snapshot = geometry.render_snapshot();
    assert_eq!(snapshot.version, 0);
    assert!(matches!(snapshot.streams, RenderStreams::Empty));
}

// ============================================================================
// Duplication and Release
// ============================================================================

#[test]
fn duplicate_is_copy_on_write() {
    let original = triangle();
    let copy = original.duplicate().unwrap();
    assert_ne!(original.id(), copy.id());

    original.set_coordinate(0, Vec3::splat(9.0)).unwrap();
    assert_eq!(copy.coordinate(0).unwrap(), Vec3::ZERO);
    assert_eq!(original.coordinate(0).unwrap(), Vec3::splat(9.0));
}

#[test]
fn released_geometry_rejects_mutation() {
    let geometry = triangle();
    geometry.release();
    assert!(geometry.is_released());
    let err = geometry.set_coordinate(0, Vec3::ONE).unwrap_err();
    assert!(matches!(err, TesseraError::Released), "got {err:?}");
    assert!(geometry.coordinate(0).is_err());
}
