//! Picking Tests
//!
//! Tests for:
//! - Linear shapes against triangle and line geometry
//! - Volumetric shapes (sphere, cylinder, cone, box)
//! - Polytopes built from boxes and camera matrices
//! - Indexed geometry and primitive assembly
//! - Geometry-against-geometry overlap

use std::f64::consts::FRAC_PI_4;

use glam::{DMat4, DVec3, Vec3};

use tessera::pick::PrimitivePair;
use tessera::{
    GeometryBuffer, IndexedGeometryBuffer, LayoutDesc, PickShape, Picker, Polytope, PrimitiveKind,
    VertexFormat, triangles_intersect,
};

const EPSILON: f64 = 1e-6;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_dvec3(a: DVec3, b: DVec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn geometry(points: &[Vec3]) -> GeometryBuffer {
    let geometry =
        GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, points.len())).unwrap();
    geometry.set_coordinates(0, points).unwrap();
    geometry
}

/// Triangle around the origin in the z = `z` plane.
fn triangle_at(z: f32) -> [Vec3; 3] {
    [
        Vec3::new(-1.0, -1.0, z),
        Vec3::new(1.0, -1.0, z),
        Vec3::new(0.0, 1.0, z),
    ]
}

fn ray_down_z(x: f64, y: f64) -> PickShape {
    PickShape::Ray {
        origin: DVec3::new(x, y, -5.0),
        direction: DVec3::Z,
    }
}

// ============================================================================
// Linear Shapes
// ============================================================================

#[test]
fn ray_hits_triangle_at_its_plane() {
    init_logging();
    let mesh = geometry(&triangle_at(0.0));
    let hit = tessera::pick(&mesh, &PrimitiveKind::Triangles, &ray_down_z(0.0, 0.0))
        .expect("ray through the middle must hit");

    assert!(approx(hit.distance, 5.0), "distance {}", hit.distance);
    assert!(approx_dvec3(hit.point, DVec3::ZERO));
    assert_eq!(hit.primitive_index, 0);
}

#[test]
fn ray_beside_triangle_misses() {
    let mesh = geometry(&triangle_at(0.0));
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &ray_down_z(2.0, 0.0)).is_none());
}

#[test]
fn ray_pointing_away_misses() {
    let mesh = geometry(&triangle_at(0.0));
    let away = PickShape::Ray {
        origin: DVec3::new(0.0, 0.0, -5.0),
        direction: DVec3::NEG_Z,
    };
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &away).is_none());
}

#[test]
fn segment_must_reach_the_triangle() {
    let mesh = geometry(&triangle_at(0.0));
    let short = PickShape::Segment {
        start: DVec3::new(0.0, 0.0, -5.0),
        end: DVec3::new(0.0, 0.0, -1.0),
    };
    let long = PickShape::Segment {
        start: DVec3::new(0.0, 0.0, -5.0),
        end: DVec3::new(0.0, 0.0, 1.0),
    };
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &short).is_none());
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &long).is_some());
}

#[test]
fn closest_primitive_is_reported() {
    let mut points = triangle_at(0.0).to_vec();
    points.extend_from_slice(&triangle_at(2.0));
    let mesh = geometry(&points);

    let from_below = tessera::pick(&mesh, &PrimitiveKind::Triangles, &ray_down_z(0.0, 0.0)).unwrap();
    assert_eq!(from_below.primitive_index, 0);

    let from_above = PickShape::Ray {
        origin: DVec3::new(0.0, 0.0, 5.0),
        direction: DVec3::NEG_Z,
    };
    let hit = tessera::pick(&mesh, &PrimitiveKind::Triangles, &from_above).unwrap();
    assert_eq!(hit.primitive_index, 1);
    assert!(approx(hit.distance, 3.0));
}

#[test]
fn point_shape_picks_a_vertex() {
    let mesh = geometry(&[Vec3::ZERO, Vec3::ONE]);
    let on_vertex = PickShape::Point { point: DVec3::ONE };
    let hit = tessera::pick(&mesh, &PrimitiveKind::Points, &on_vertex).unwrap();
    assert_eq!(hit.primitive_index, 1);
    let elsewhere = PickShape::Point {
        point: DVec3::splat(0.5),
    };
    assert!(tessera::pick(&mesh, &PrimitiveKind::Points, &elsewhere).is_none());
}

// ============================================================================
// Volumetric Shapes
// ============================================================================

#[test]
fn sphere_touching_the_face_hits() {
    let mesh = geometry(&triangle_at(0.0));
    let touching = PickShape::Sphere {
        center: DVec3::new(0.0, 0.0, 0.3),
        radius: 0.5,
    };
    let hovering = PickShape::Sphere {
        center: DVec3::new(0.0, 0.0, 0.3),
        radius: 0.2,
    };
    let hit = tessera::pick(&mesh, &PrimitiveKind::Triangles, &touching).unwrap();
    assert!(approx(hit.distance, 0.3), "nearest point is the plane foot");
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &hovering).is_none());
}

#[test]
fn cylinder_picks_a_nearby_line() {
    let mesh = geometry(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
    let wide = PickShape::CylinderRay {
        origin: DVec3::new(0.0, 0.05, -5.0),
        direction: DVec3::Z,
        radius: 0.1,
    };
    let thin = PickShape::CylinderRay {
        origin: DVec3::new(0.0, 0.05, -5.0),
        direction: DVec3::Z,
        radius: 0.01,
    };
    assert!(tessera::pick(&mesh, &PrimitiveKind::Lines, &wide).is_some());
    assert!(tessera::pick(&mesh, &PrimitiveKind::Lines, &thin).is_none());
}

#[test]
fn cone_widens_with_distance() {
    let mesh = geometry(&[Vec3::new(0.3, 0.0, 0.0)]);
    let cone = |spread_angle| PickShape::ConeRay {
        origin: DVec3::new(0.0, 0.0, -5.0),
        direction: DVec3::Z,
        spread_angle,
    };
    // tan(0.1) * 5 is about 0.5, tan(0.01) * 5 about 0.05.
    assert!(tessera::pick(&mesh, &PrimitiveKind::Points, &cone(0.1)).is_some());
    assert!(tessera::pick(&mesh, &PrimitiveKind::Points, &cone(0.01)).is_none());
}

#[test]
fn box_cutting_the_triangle_hits() {
    let mesh = geometry(&triangle_at(0.0));
    let around_center = PickShape::Box {
        min: DVec3::splat(-0.1),
        max: DVec3::splat(0.1),
    };
    let off_to_the_side = PickShape::Box {
        min: DVec3::new(3.0, 3.0, -1.0),
        max: DVec3::new(4.0, 4.0, 1.0),
    };
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &around_center).is_some());
    assert!(tessera::pick(&mesh, &PrimitiveKind::Triangles, &off_to_the_side).is_none());
}

// ============================================================================
// Polytopes
// ============================================================================

#[test]
fn box_polytope_contains_a_small_triangle() {
    let cube = PickShape::Polytope(Polytope::from_box(DVec3::splat(-2.0), DVec3::splat(2.0)));
    let inside = geometry(&triangle_at(0.0));
    let outside = geometry(&triangle_at(5.0));
    assert!(tessera::pick(&inside, &PrimitiveKind::Triangles, &cube).is_some());
    assert!(tessera::pick(&outside, &PrimitiveKind::Triangles, &cube).is_none());
}

#[test]
fn polytope_crossing_a_large_triangle_hits() {
    // No vertex of the triangle lies inside the cube.
    let big = geometry(&[
        Vec3::new(-10.0, -10.0, 0.0),
        Vec3::new(10.0, -10.0, 0.0),
        Vec3::new(0.0, 10.0, 0.0),
    ]);
    let cube = PickShape::Polytope(Polytope::from_box(DVec3::splat(-1.0), DVec3::ONE));
    assert!(Picker::default().intersects(
        &big.coordinate_view().reader(),
        &PrimitiveKind::Triangles,
        &cube
    ));
}

#[test]
fn camera_frustum_sees_what_is_in_front() {
    let view = DMat4::look_at_rh(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y);
    let projection = DMat4::perspective_rh(FRAC_PI_4, 1.0, 0.1, 100.0);
    let frustum = PickShape::Polytope(Polytope::from_view_projection(projection * view));

    let in_front = geometry(&triangle_at(0.0));
    let behind = geometry(&triangle_at(10.0));
    assert!(tessera::pick(&in_front, &PrimitiveKind::Triangles, &frustum).is_some());
    assert!(tessera::pick(&behind, &PrimitiveKind::Triangles, &frustum).is_none());
}

// ============================================================================
// Indexed Geometry and Assembly
// ============================================================================

#[test]
fn indexed_quad_reports_the_triangle_hit() {
    let indexed =
        IndexedGeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 4), 6).unwrap();
    indexed
        .geometry()
        .set_coordinates(
            0,
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap();
    indexed
        .set_coordinate_indices(0, &[0, 1, 2, 0, 2, 3])
        .unwrap();

    let picker = Picker::default();
    let lower = picker
        .pick_indexed(&indexed, &PrimitiveKind::Triangles, &ray_down_z(0.75, 0.25))
        .unwrap();
    let upper = picker
        .pick_indexed(&indexed, &PrimitiveKind::Triangles, &ray_down_z(0.25, 0.75))
        .unwrap();
    assert_eq!(lower.primitive_index, 0);
    assert_eq!(upper.primitive_index, 1);
    assert_eq!(
        picker.intersect(&indexed, &PrimitiveKind::Triangles, &ray_down_z(0.25, 0.75)),
        Some(upper),
        "the buffer itself walks the same index window"
    );
    assert!(
        picker
            .pick_indexed(&indexed, &PrimitiveKind::Triangles, &ray_down_z(1.5, 0.5))
            .is_none()
    );
}

#[test]
fn triangle_strip_assembles_every_window() {
    let strip = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
    ];
    let mesh = geometry(&strip);
    let kind = PrimitiveKind::triangle_strip(strip.len());
    let hit = tessera::pick(&mesh, &kind, &ray_down_z(1.75, 0.2)).unwrap();
    assert_eq!(hit.primitive_index, 2);
}

#[test]
fn window_limits_what_is_picked() {
    let mut points = triangle_at(0.0).to_vec();
    points.extend_from_slice(&triangle_at(2.0));
    let mesh = geometry(&points);
    mesh.set_valid_vertex_count(3).unwrap();
    mesh.set_initial_vertex_index(3).unwrap();

    let hit = tessera::pick(&mesh, &PrimitiveKind::Triangles, &ray_down_z(0.0, 0.0)).unwrap();
    assert!(approx(hit.distance, 7.0), "only the z = 2 triangle is in the window");
}

// ============================================================================
// Geometry Against Geometry
// ============================================================================

#[test]
fn triangle_pairs() {
    let base = triangle_at(0.0).map(|v| v.as_dvec3());
    let far = base.map(|v| v + DVec3::new(3.0, 0.0, 0.0));
    let piercing = [
        DVec3::new(0.0, -0.5, -1.0),
        DVec3::new(0.0, -0.5, 1.0),
        DVec3::new(0.0, 0.5, 0.0),
    ];
    assert!(!triangles_intersect(&base, &far, EPSILON));
    assert!(triangles_intersect(&base, &piercing, EPSILON));
}

#[test]
fn coplanar_unit_triangles_by_offset() {
    let unit = |dx: f64| {
        [DVec3::ZERO, DVec3::X, DVec3::Y].map(|v| v + DVec3::new(dx, 0.0, 0.0))
    };
    assert!(!triangles_intersect(&unit(0.0), &unit(2.0), EPSILON));
    assert!(triangles_intersect(&unit(0.0), &unit(0.5), EPSILON));
    // Sharing only the vertex (1, 0, 0) still counts.
    assert!(triangles_intersect(&unit(0.0), &unit(1.0), EPSILON));
}

#[test]
fn geometry_buffers_report_the_first_overlapping_pair_or_none() {
    let mut a_points = triangle_at(5.0).to_vec();
    a_points.extend_from_slice(&triangle_at(0.0));
    let a = geometry(&a_points);
    let b = geometry(&[
        Vec3::new(0.0, -0.5, -1.0),
        Vec3::new(0.0, -0.5, 1.0),
        Vec3::new(0.0, 0.5, 0.0),
    ]);

    let picker = Picker::default();
    let pair = picker.intersect_geometries(
        &a,
        &PrimitiveKind::Triangles,
        &b,
        &PrimitiveKind::Triangles,
    );
    assert_eq!(pair, Some(PrimitivePair { first: 1, second: 0 }));

    let apart = geometry(&triangle_at(9.0));
    assert!(
        picker
            .intersect_geometries(&apart, &PrimitiveKind::Triangles, &b, &PrimitiveKind::Triangles)
            .is_none()
    );
}
