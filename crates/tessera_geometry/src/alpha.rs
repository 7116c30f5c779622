//! Per-screen alpha cache.
//!
//! Transparency is applied by multiplying the alpha channel of a copy of the
//! color data; the canonical storage is never tinted in place. Each screen
//! (rendering context) owns one tinted copy plus the alpha it was tinted
//! with, so several screens can draw the same geometry at different alphas.
//!
//! The cache tracks one "color changed" bit per screen. Any write that can
//! alter the tinted copy sets every bit; a screen's bit is cleared when that
//! screen's copy is refreshed.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tessera_core::epsilon::nearly_equal;

use crate::access::CategoryReader;
use crate::layout::{PACKED_COLOR_WIDTH, VertexLayout};
use crate::source::SourceView;
use crate::storage::PackedBuffer;

/// Shape of the buffer being tinted.
pub(crate) trait AlphaBacking {
    /// Floats per vertex in the tinted buffer.
    fn stride(&self) -> usize;

    /// Offset of the 4-wide color inside one tinted vertex.
    fn color_offset(&self) -> usize;

    /// Appends the untinted data to `out`, with colors expanded to 4-wide.
    fn fill_raw(&self, out: &mut Vec<f32>);
}

/// Whole-vertex copy of the internally owned packed buffer.
pub(crate) struct PackedBacking<'a> {
    pub data: &'a [f32],
    pub layout: &'a VertexLayout,
}

impl AlphaBacking for PackedBacking<'_> {
    fn stride(&self) -> usize {
        self.layout.stride()
    }

    fn color_offset(&self) -> usize {
        self.layout.color_offset().unwrap_or(0)
    }

    fn fill_raw(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(self.data);
    }
}

/// Whole-vertex copy of a caller interleaved array, with the color slot
/// widened to 4 when the caller stores 3-wide colors.
pub(crate) struct InterleavedBacking<'a> {
    pub view: SourceView<'a>,
    pub layout: &'a VertexLayout,
    pub vertex_capacity: usize,
}

impl AlphaBacking for InterleavedBacking<'_> {
    fn stride(&self) -> usize {
        self.layout.stride() - self.layout.color_width() + PACKED_COLOR_WIDTH
    }

    fn color_offset(&self) -> usize {
        self.layout.color_offset().unwrap_or(0)
    }

    fn fill_raw(&self, out: &mut Vec<f32>) {
        let stride = self.layout.stride();
        let color_offset = self.color_offset();
        let color_end = color_offset + self.layout.color_width();
        let mut vertex = vec![0.0; stride];
        out.reserve(self.vertex_capacity * self.stride());
        for v in 0..self.vertex_capacity {
            self.view.read_strided(v * stride, stride, &mut vertex);
            out.extend_from_slice(&vertex[..color_end]);
            if self.layout.color_width() == 3 {
                out.push(1.0);
            }
            out.extend_from_slice(&vertex[color_end..]);
        }
    }
}

/// 4-wide copy of a separate color array.
pub(crate) struct SeparateBacking<'a> {
    pub reader: CategoryReader<'a>,
    pub vertex_capacity: usize,
}

impl AlphaBacking for SeparateBacking<'_> {
    fn stride(&self) -> usize {
        PACKED_COLOR_WIDTH
    }

    fn color_offset(&self) -> usize {
        0
    }

    fn fill_raw(&self, out: &mut Vec<f32>) {
        out.reserve(self.vertex_capacity * PACKED_COLOR_WIDTH);
        let mut color = [0.0; 4];
        for v in 0..self.vertex_capacity {
            self.reader.read(v, &mut color);
            out.extend_from_slice(&color);
        }
    }
}

#[derive(Debug, Clone)]
struct AlphaEntry {
    data: PackedBuffer,
    last_alpha: f32,
}

/// Result of [`AlphaCache::update`].
#[derive(Debug, Clone)]
pub(crate) enum AlphaOutcome {
    /// The screen's copy was already current.
    Hit(PackedBuffer),
    /// The screen's copy was created or refreshed.
    Updated(PackedBuffer),
}

impl AlphaOutcome {
    pub fn data(&self) -> &PackedBuffer {
        match self {
            Self::Hit(data) | Self::Updated(data) => data,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AlphaCache {
    entries: FxHashMap<usize, AlphaEntry>,
    changed_mask: u64,
}

impl AlphaCache {
    /// Flags every screen's copy as stale.
    pub fn mark_color_changed(&mut self) {
        self.changed_mask = u64::MAX;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.changed_mask = 0;
    }

    #[inline]
    fn is_clean(&self, screen: usize) -> bool {
        self.changed_mask & (1 << screen) == 0
    }

    /// Returns screen `screen`'s tinted copy, refreshing it as needed.
    ///
    /// `screen` must be below 64. `alpha` is clamped to at least `epsilon`.
    pub fn update(
        &mut self,
        screen: usize,
        alpha: f32,
        epsilon: f32,
        backing: &dyn AlphaBacking,
    ) -> AlphaOutcome {
        let alpha = alpha.max(epsilon);
        let stride = backing.stride();
        let alpha_slot = backing.color_offset() + 3;
        let clean = self.is_clean(screen);

        if let Some(entry) = self.entries.get_mut(&screen) {
            if clean {
                if same_alpha(entry.last_alpha, alpha, epsilon) {
                    return AlphaOutcome::Hit(Arc::clone(&entry.data));
                }
                // Alpha-only change: rescale the copy in place.
                let factor = alpha / entry.last_alpha;
                let data = Arc::make_mut(&mut entry.data).as_mut_slice();
                scale_alpha(data, stride, alpha_slot, factor);
                entry.last_alpha = alpha;
                return AlphaOutcome::Updated(Arc::clone(&entry.data));
            }
        }

        let is_new = !self.entries.contains_key(&screen);
        let data = Arc::new(self.derive(screen, alpha, epsilon, is_new, backing));
        self.entries.insert(
            screen,
            AlphaEntry {
                data: Arc::clone(&data),
                last_alpha: alpha,
            },
        );
        self.changed_mask &= !(1 << screen);
        if is_new {
            log::debug!("alpha copy for screen {screen} created at alpha {alpha}");
        } else {
            log::trace!("alpha copy for screen {screen} rebuilt at alpha {alpha}");
        }
        AlphaOutcome::Updated(data)
    }

    fn derive(
        &self,
        screen: usize,
        alpha: f32,
        epsilon: f32,
        allow_donor: bool,
        backing: &dyn AlphaBacking,
    ) -> Vec<f32> {
        let stride = backing.stride();
        let alpha_slot = backing.color_offset() + 3;

        // A clean screen already tinted at (nearly) this alpha can be copied.
        if allow_donor {
            let donor = self
                .entries
                .iter()
                .filter(|&(&other, entry)| {
                    other != screen
                        && self.is_clean(other)
                        && same_alpha(entry.last_alpha, alpha, epsilon)
                })
                .min_by(|a, b| {
                    let da = (a.1.last_alpha - alpha).abs();
                    let db = (b.1.last_alpha - alpha).abs();
                    da.total_cmp(&db)
                });
            if let Some((_, entry)) = donor {
                return entry.data.as_ref().clone();
            }
        }

        // Screen 0 is the base other screens rescale from.
        if screen != 0
            && let Some(base) = self.entries.get(&0).filter(|_| self.is_clean(0))
        {
            let mut data = base.data.as_ref().clone();
            scale_alpha(&mut data, stride, alpha_slot, alpha / base.last_alpha);
            return data;
        }

        let mut data = Vec::new();
        backing.fill_raw(&mut data);
        scale_alpha(&mut data, stride, alpha_slot, alpha);
        data
    }
}

#[inline]
fn same_alpha(a: f32, b: f32, epsilon: f32) -> bool {
    nearly_equal(f64::from(a), f64::from(b), f64::from(epsilon))
}

fn scale_alpha(data: &mut [f32], stride: usize, alpha_slot: usize, factor: f32) {
    if stride == 0 {
        return;
    }
    for vertex in data.chunks_exact_mut(stride) {
        vertex[alpha_slot] *= factor;
    }
}
