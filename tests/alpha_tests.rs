//! Per-Screen Alpha Tests
//!
//! Tests for:
//! - Tinted copies for packed, interleaved and separate colors
//! - Cache hits and invalidation on color writes
//! - Screen limits and formats without color
//! - Submission to a render sink

use std::sync::Arc;

use glam::{Vec3, Vec4};
use parking_lot::Mutex;

use tessera::{
    ArraySource, DirtyFlags, FlatBuffers, GeometryBuffer, GeometrySettings, LayoutDesc, RefArray,
    RenderSink, VertexFormat,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn rgba_geometry(colors: &[Vec4]) -> GeometryBuffer {
    let format = VertexFormat::COORDINATES | VertexFormat::COLOR_4;
    let geometry = GeometryBuffer::new(LayoutDesc::new(format, colors.len())).unwrap();
    geometry.set_colors4(0, colors).unwrap();
    geometry
}

// ============================================================================
// Packed Colors
// ============================================================================

#[test]
fn packed_copy_scales_alpha_in_place() {
    let geometry = rgba_geometry(&[Vec4::new(1.0, 0.0, 0.0, 0.8)]);
    let tinted = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();

    assert_eq!(tinted.stride, 7, "color4 + coordinate");
    assert_eq!(tinted.color_offset, 0);
    assert!(approx(tinted.data[3], 0.4), "0.8 * 0.5, got {}", tinted.data[3]);
    assert!(approx(tinted.data[0], 1.0), "rgb is untouched");
}

#[test]
fn canonical_colors_are_never_tinted() {
    let geometry = rgba_geometry(&[Vec4::new(0.0, 1.0, 0.0, 1.0)]);
    geometry.update_alpha_for(0, 0.25).unwrap();
    assert_eq!(geometry.color(0).unwrap(), Vec4::new(0.0, 1.0, 0.0, 1.0));
}

#[test]
fn repeated_alpha_reuses_the_copy() {
    let geometry = rgba_geometry(&[Vec4::ONE, Vec4::ONE]);
    let first = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    let second = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first.data, &second.data));
}

#[test]
fn color_writes_invalidate_every_screen() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    let before = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    let other = geometry.update_alpha_for(1, 0.5).unwrap().unwrap();
    assert!(approx(other.data[3], 0.5));

    geometry.set_color4(0, Vec4::new(1.0, 1.0, 1.0, 0.5)).unwrap();
    let after = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&before.data, &after.data));
    assert!(approx(after.data[3], 0.25));
    let other = geometry.update_alpha_for(1, 0.5).unwrap().unwrap();
    assert!(approx(other.data[3], 0.25), "screen 1 saw the write too");
}

#[test]
fn alpha_changes_rescale_the_existing_copy() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    geometry.update_alpha_for(0, 0.5).unwrap();
    let tinted = geometry.update_alpha_for(0, 0.2).unwrap().unwrap();
    assert!(approx(tinted.data[3], 0.2));
    assert!(approx(tinted.alpha, 0.2));
}

#[test]
fn refreshed_copies_raise_color_dirty() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    geometry.take_dirty();
    geometry.update_alpha_for(0, 0.5).unwrap();
    assert!(geometry.dirty().contains(DirtyFlags::COLOR));

    geometry.take_dirty();
    geometry.update_alpha_for(0, 0.5).unwrap();
    assert!(geometry.dirty().is_empty(), "a cache hit changes nothing");
}

// ============================================================================
// Other Storage Modes
// ============================================================================

#[test]
fn interleaved_rgb_is_widened() {
    let format = VertexFormat::COORDINATES
        | VertexFormat::COLOR_3
        | VertexFormat::BY_REFERENCE
        | VertexFormat::INTERLEAVED;
    let geometry = GeometryBuffer::new(LayoutDesc::new(format, 1)).unwrap();
    let array = RefArray::new(vec![0.2, 0.4, 0.6, 1.0, 2.0, 3.0]);
    geometry
        .set_interleaved_ref(Some(ArraySource::Float(array)))
        .unwrap();

    let tinted = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    assert_eq!(tinted.stride, 7);
    assert_eq!(&tinted.data[..], &[0.2, 0.4, 0.6, 0.5, 1.0, 2.0, 3.0]);
}

#[test]
fn separate_colors_get_a_color_only_copy() {
    let format = VertexFormat::COORDINATES | VertexFormat::COLOR_3 | VertexFormat::BY_REFERENCE;
    let geometry = GeometryBuffer::new(LayoutDesc::new(format, 2)).unwrap();
    assert!(geometry.update_alpha_for(0, 0.5).unwrap().is_none(), "no color array yet");

    let colors = RefArray::new(vec![[1.0_f32, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    geometry
        .set_color_ref(Some(ArraySource::Tuple3(colors)))
        .unwrap();
    let tinted = geometry.update_alpha_for(0, 0.5).unwrap().unwrap();
    assert_eq!(tinted.stride, 4);
    assert_eq!(&tinted.data[..], &[1.0, 0.0, 0.0, 0.5, 0.0, 0.0, 1.0, 0.5]);
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn screens_past_the_limit_are_rejected() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    let err = geometry.update_alpha_for(64, 0.5).unwrap_err();
    assert!(err.is_range(), "got {err:?}");

    let settings = GeometrySettings {
        max_screens: 2,
        ..GeometrySettings::default()
    };
    let format = VertexFormat::COORDINATES | VertexFormat::COLOR_4;
    let small = GeometryBuffer::with_settings(LayoutDesc::new(format, 1), settings).unwrap();
    assert!(small.update_alpha_for(1, 0.5).is_ok());
    assert!(small.update_alpha_for(2, 0.5).is_err());
}

#[test]
fn formats_without_color_have_nothing_to_tint() {
    let geometry = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 1)).unwrap();
    geometry.set_coordinate(0, Vec3::ONE).unwrap();
    assert!(geometry.update_alpha_for(0, 0.5).unwrap().is_none());
}

#[test]
fn zero_alpha_is_clamped_to_epsilon() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    let tinted = geometry.update_alpha_for(0, 0.0).unwrap().unwrap();
    assert!(tinted.alpha > 0.0);
    assert!(tinted.data[3] > 0.0);
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Default)]
struct CollectingSink {
    submitted: Mutex<Vec<FlatBuffers>>,
}

impl RenderSink for CollectingSink {
    fn submit(&self, buffers: &FlatBuffers) {
        self.submitted.lock().push(buffers.clone());
    }
}

#[test]
fn submit_hands_over_snapshot_and_tinted_copy() {
    let geometry = rgba_geometry(&[Vec4::ONE]);
    let sink = CollectingSink::default();

    geometry.submit(&sink, None).unwrap();
    geometry.submit(&sink, Some((3, 0.5))).unwrap();

    let submitted = sink.submitted.lock();
    assert_eq!(submitted.len(), 2);
    assert!(submitted[0].alpha.is_none());
    let alpha = submitted[1].alpha.as_ref().unwrap();
    assert_eq!(alpha.screen, 3);
    assert!(approx(alpha.data[3], 0.5));
}
