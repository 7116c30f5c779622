//! By-Reference Geometry Tests
//!
//! Tests for:
//! - Separate caller arrays and their representations
//! - Interleaved caller arrays
//! - Null references and defined sources
//! - Caller writes announced through update_data
//! - Scene-link notification and snapshot publication

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Vec3, Vec4};
use parking_lot::Mutex;

use tessera::geometry::{DefinedSources, DirtyFlags, RenderStreams};
use tessera::{
    ArraySource, GeometryBuffer, LayoutDesc, RefArray, SceneLink, TesseraError, VertexFormat,
};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn separate(format: VertexFormat, count: usize) -> GeometryBuffer {
    GeometryBuffer::new(LayoutDesc::new(format | VertexFormat::BY_REFERENCE, count)).unwrap()
}

fn float_source(values: &[f32]) -> (RefArray<f32>, ArraySource) {
    let array = RefArray::from_slice(values);
    let source = ArraySource::Float(array.clone());
    (array, source)
}

/// Records every notification together with what the geometry looked like
/// from inside the callback.
struct Recorder {
    active: AtomicBool,
    events: Mutex<Vec<(DirtyFlags, Vec3)>>,
}

impl Recorder {
    fn new(active: bool) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(active),
            events: Mutex::new(Vec::new()),
        })
    }
}

impl SceneLink for Recorder {
    fn is_active_in_scene(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn geometry_changed(&self, geometry: &GeometryBuffer, changed: DirtyFlags) {
        // Reading back takes the geometry lock; this only returns when the
        // notification runs after the lock was released.
        let first = geometry.coordinate(0).unwrap_or(Vec3::NAN);
        self.events.lock().push((changed, first));
    }
}

// ============================================================================
// Separate References
// ============================================================================

#[test]
fn float_coordinates_are_read_through() {
    let geometry = separate(VertexFormat::COORDINATES, 2);
    let (_, source) = float_source(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    geometry.set_coordinate_ref(Some(source)).unwrap();

    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::new(4.0, 5.0, 6.0));
    assert!(geometry.defined_sources().contains(DefinedSources::COORDINATE));
}

#[test]
fn double_tuples_are_accepted_for_coordinates() {
    let geometry = separate(VertexFormat::COORDINATES, 2);
    let array = RefArray::new(vec![[0.5_f64, 0.0, 0.0], [0.0, 0.25, 1.0]]);
    geometry
        .set_coordinate_ref(Some(ArraySource::Tuple3d(array)))
        .unwrap();
    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::new(0.0, 0.25, 1.0));
    assert!(approx_vec3(geometry.bounding_box().max, Vec3::new(0.5, 0.25, 1.0)));
}

#[test]
fn byte_colors_gain_opaque_alpha() {
    let geometry = separate(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 1);
    let bytes = RefArray::new(vec![255_u8, 0, 0]);
    geometry.set_color_ref(Some(ArraySource::Byte(bytes))).unwrap();
    assert_eq!(geometry.color(0).unwrap(), Vec4::new(1.0, 0.0, 0.0, 1.0));
}

#[test]
fn tuple_width_must_match_declared_color() {
    let geometry = separate(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 1);
    let rgba = RefArray::new(vec![[1.0_f32, 1.0, 1.0, 1.0]]);
    let err = geometry
        .set_color_ref(Some(ArraySource::Tuple4(rgba)))
        .unwrap_err();
    assert!(matches!(err, TesseraError::RepresentationMismatch { .. }), "got {err:?}");
}

#[test]
fn short_array_is_rejected_against_the_window() {
    let geometry = separate(VertexFormat::COORDINATES, 3);
    let (_, source) = float_source(&[0.0; 6]);
    let err = geometry.set_coordinate_ref(Some(source)).unwrap_err();
    assert!(err.is_range(), "got {err:?}");
    assert!(geometry.reference(tessera::AttributeCategory::Coordinate).is_none());
}

#[test]
fn by_copy_setters_are_refused() {
    let geometry = separate(VertexFormat::COORDINATES, 1);
    let err = geometry.set_coordinate(0, Vec3::ONE).unwrap_err();
    assert!(matches!(err, TesseraError::StorageModeMismatch { .. }), "got {err:?}");
}

#[test]
fn per_category_windows_are_independent() {
    let geometry = separate(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 4);
    geometry.set_valid_vertex_count(2).unwrap();
    geometry.set_initial_coordinate_index(2).unwrap();
    assert_eq!(geometry.window().coordinate, 2);
    assert_eq!(geometry.window().color, 0);
    assert!(geometry.set_initial_vertex_index(1).is_err());
}

// ============================================================================
// Null References and Defined Sources
// ============================================================================

#[test]
fn null_coordinates_center_bounds_on_origin() {
    let geometry = separate(VertexFormat::COORDINATES, 2);
    let (_, source) = float_source(&[2.0, 2.0, 2.0, 4.0, 4.0, 4.0]);
    geometry.set_coordinate_ref(Some(source)).unwrap();
    assert!(approx_vec3(geometry.centroid(), Vec3::splat(3.0)));

    geometry.set_coordinate_ref(None).unwrap();
    assert!(approx_vec3(geometry.centroid(), Vec3::ZERO));
    assert!(!geometry.defined_sources().contains(DefinedSources::COORDINATE));
    assert!(matches!(
        geometry.coordinate(0).unwrap_err(),
        TesseraError::MissingAttribute(_)
    ));
}

#[test]
fn texcoords_are_defined_only_when_every_set_is_present() {
    let desc = LayoutDesc::new(
        VertexFormat::COORDINATES | VertexFormat::TEXCOORD_2 | VertexFormat::BY_REFERENCE,
        3,
    )
    .with_texcoord_sets(2, &[0, 1]);
    let geometry = GeometryBuffer::new(desc).unwrap();
    geometry
        .set_coordinate_ref(Some(float_source(&[0.0; 9]).1))
        .unwrap();
    geometry
        .set_texcoord_ref(0, Some(float_source(&[0.0; 6]).1))
        .unwrap();
    assert!(
        !geometry.defined_sources().contains(DefinedSources::TEXCOORD),
        "one of two sets must not count as defined"
    );

    geometry
        .set_texcoord_ref(1, Some(float_source(&[0.5; 6]).1))
        .unwrap();
    assert!(geometry.defined_sources().contains(DefinedSources::TEXCOORD));
    assert_eq!(geometry.texcoord(1, 2).unwrap(), Vec4::new(0.5, 0.5, 0.0, 0.0));
}

// ============================================================================
// Caller Writes
// ============================================================================

#[test]
fn caller_writes_show_after_update_data() {
    let geometry = separate(VertexFormat::COORDINATES, 1);
    let (array, source) = float_source(&[1.0, 1.0, 1.0]);
    geometry.set_coordinate_ref(Some(source)).unwrap();
    assert!(approx_vec3(geometry.bounding_box().max, Vec3::ONE));

    array.write().copy_from_slice(&[3.0, 3.0, 3.0]);
    geometry.update_data(DirtyFlags::COORDINATE).unwrap();
    assert!(approx_vec3(geometry.bounding_box().max, Vec3::splat(3.0)));
}

#[test]
fn converted_arrays_read_from_their_last_announced_state() {
    let geometry = separate(VertexFormat::COORDINATES | VertexFormat::COLOR_3, 2);
    let coords = RefArray::new(vec![[0.5_f64, 0.0, 0.0], [0.0, 0.25, 1.0]]);
    let bytes = RefArray::new(vec![255_u8, 0, 0, 0, 255, 0]);
    geometry
        .set_coordinate_ref(Some(ArraySource::Tuple3d(coords.clone())))
        .unwrap();
    geometry
        .set_color_ref(Some(ArraySource::Byte(bytes.clone())))
        .unwrap();

    coords.write()[1] = [2.0, 2.0, 2.0];
    bytes.write()[4] = 0;
    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::new(0.0, 0.25, 1.0));
    assert_eq!(geometry.color(1).unwrap(), Vec4::new(0.0, 1.0, 0.0, 1.0));

    geometry
        .update_data(DirtyFlags::COORDINATE | DirtyFlags::COLOR)
        .unwrap();
    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::splat(2.0));
    assert_eq!(geometry.color(1).unwrap(), Vec4::new(0.0, 0.0, 0.0, 1.0));
}

#[test]
fn update_data_is_for_caller_arrays() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 1)).unwrap();
    assert!(geometry.update_data(DirtyFlags::COORDINATE).is_err());
}

// ============================================================================
// Interleaved References
// ============================================================================

#[test]
fn interleaved_vertices_read_color_then_coordinate() {
    let format = VertexFormat::COORDINATES
        | VertexFormat::COLOR_3
        | VertexFormat::BY_REFERENCE
        | VertexFormat::INTERLEAVED;
    let geometry = GeometryBuffer::new(LayoutDesc::new(format, 2)).unwrap();
    let (_, source) = float_source(&[
        1.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 5.0, 6.0, 7.0,
    ]);
    geometry.set_interleaved_ref(Some(source)).unwrap();

    assert_eq!(geometry.coordinate(1).unwrap(), Vec3::new(5.0, 6.0, 7.0));
    assert_eq!(geometry.color(1).unwrap(), Vec4::new(0.0, 1.0, 0.0, 1.0));
    assert!(geometry.defined_sources().contains(DefinedSources::INTERLEAVED));
}

// ============================================================================
// Scene Link
// ============================================================================

#[test]
fn live_geometry_notifies_after_unlocking() {
    let geometry = separate(VertexFormat::COORDINATES, 1);
    let (array, source) = float_source(&[0.0, 0.0, 0.0]);
    geometry.set_coordinate_ref(Some(source)).unwrap();
    let recorder = Recorder::new(true);
    geometry.attach(recorder.clone()).unwrap();
    assert!(geometry.is_live());

    array.write().copy_from_slice(&[1.0, 2.0, 3.0]);
    geometry.update_data(DirtyFlags::COORDINATE).unwrap();

    let events = recorder.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, DirtyFlags::COORDINATE);
    assert_eq!(events[0].1, Vec3::new(1.0, 2.0, 3.0), "callback sees the new data");

    let snapshot = geometry.render_snapshot();
    assert_eq!(snapshot.version, geometry.version());
    assert!(matches!(snapshot.streams, RenderStreams::Separate(_)));
}

#[test]
fn inactive_link_defers_publication() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 1)).unwrap();
    let recorder = Recorder::new(false);
    geometry.attach(recorder.clone()).unwrap();
    let published = geometry.render_snapshot().version;

    geometry.set_coordinate(0, Vec3::ONE).unwrap();
    assert!(recorder.events.lock().is_empty(), "inactive links are not notified");
    assert_eq!(geometry.render_snapshot().version, published);

    recorder.active.store(true, Ordering::SeqCst);
    geometry.set_coordinate(0, Vec3::splat(2.0)).unwrap();
    assert_eq!(recorder.events.lock().len(), 1);
    assert!(geometry.render_snapshot().version > published);
}

#[test]
fn detached_geometry_goes_quiet() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 1)).unwrap();
    let recorder = Recorder::new(true);
    geometry.attach(recorder.clone()).unwrap();
    assert!(geometry.detach().is_some());

    geometry.set_coordinate(0, Vec3::ONE).unwrap();
    assert!(recorder.events.lock().is_empty());
}
