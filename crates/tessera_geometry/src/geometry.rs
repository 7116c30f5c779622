//! [`GeometryBuffer`]: per-vertex attribute storage under one of three storage
//! policies, with change tracking, cached bounds, per-screen alpha copies and
//! lock-free render snapshots.
//!
//! # Locking
//!
//! Every mutator takes the per-geometry mutex, validates, writes, raises dirty
//! bits and (when live) publishes a fresh [`RenderSnapshot`], then releases
//! the mutex *before* notifying the [`SceneLink`]. Lock order is always
//! state → link / snapshot; the link is read (and its `Arc` cloned) before the
//! state lock is taken.

use std::sync::Arc;

use glam::{DVec3, Vec3, Vec4};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use tessera_core::ChangeTracker;
use tessera_core::errors::{Result, TesseraError, check_index, check_range};

use crate::access::{self, CategoryReader, declared_width, source_capacity, write_packed};
use crate::alpha::{
    AlphaBacking, AlphaCache, AlphaOutcome, InterleavedBacking, PackedBacking, SeparateBacking,
};
use crate::bounds::{BoundingBox, BoundsCache};
use crate::format::{AttributeCategory, DefinedSources, DirtyFlags, VertexFormat};
use crate::layout::{LayoutDesc, StorageMode, VertexLayout};
use crate::link::{RenderSink, SceneLink};
use crate::mirror;
use crate::settings::GeometrySettings;
use crate::snapshot::{AlphaBuffer, FlatBuffers, RenderSnapshot, SnapshotParts};
use crate::source::ArraySource;
use crate::storage::{MirrorSet, Storage, VertexWindow};

/// Mutable state guarded by the geometry lock.
#[derive(Debug)]
pub(crate) struct GeometryState {
    pub storage: Storage,
    pub mirrors: MirrorSet,
    pub window: VertexWindow,
    pub defined: DefinedSources,
    pub dirty: DirtyFlags,
    pub bounds: BoundsCache,
    pub alpha: AlphaCache,
    pub tracker: ChangeTracker,
}

impl GeometryState {
    fn new(layout: &VertexLayout) -> Self {
        let storage = Storage::allocate(layout);
        let defined = mirror::defined_sources(layout, &storage);
        Self {
            storage,
            mirrors: MirrorSet::for_layout(layout),
            window: VertexWindow::for_layout(layout),
            defined,
            dirty: DirtyFlags::empty(),
            bounds: BoundsCache::default(),
            alpha: AlphaCache::default(),
            tracker: ChangeTracker::new(),
        }
    }

    pub fn reader(&self, layout: &VertexLayout, category: AttributeCategory) -> CategoryReader<'_> {
        CategoryReader::new(layout, &self.storage, &self.mirrors, category)
    }

    fn refresh_bounds(&mut self, layout: &VertexLayout) {
        let reader = CategoryReader::new(
            layout,
            &self.storage,
            &self.mirrors,
            AttributeCategory::Coordinate,
        );
        self.bounds
            .recompute(&reader, self.window.coordinate, self.window.valid_vertex_count);
    }

    fn capture(&self, id: Uuid, layout: &VertexLayout) -> RenderSnapshot {
        RenderSnapshot::capture(
            id,
            layout,
            SnapshotParts {
                storage: &self.storage,
                mirrors: &self.mirrors,
                window: &self.window,
                defined: self.defined,
                dirty: self.dirty,
                version: self.tracker.version(),
            },
        )
    }
}

/// Per-vertex attribute storage.
///
/// The format is fixed at construction. By-copy geometry owns one packed
/// buffer; by-reference geometry reads caller-owned [`ArraySource`]s.
///
/// ```rust,ignore
/// use glam::Vec3;
/// use tessera_geometry::{GeometryBuffer, LayoutDesc, VertexFormat};
///
/// let triangle = GeometryBuffer::new(LayoutDesc::new(VertexFormat::COORDINATES, 3))?;
/// triangle.set_coordinates(0, &[Vec3::ZERO, Vec3::X, Vec3::Y])?;
/// assert_eq!(triangle.bounding_box().max, Vec3::new(1.0, 1.0, 0.0));
/// ```
pub struct GeometryBuffer {
    id: Uuid,
    layout: VertexLayout,
    settings: GeometrySettings,
    state: Mutex<GeometryState>,
    snapshot: RwLock<Arc<RenderSnapshot>>,
    link: RwLock<Option<Arc<dyn SceneLink>>>,
}

impl std::fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("id", &self.id)
            .field("format", &self.layout.format())
            .field("vertex_count", &self.layout.vertex_count())
            .field("storage", &self.layout.storage())
            .finish_non_exhaustive()
    }
}

impl GeometryBuffer {
    pub fn new(desc: LayoutDesc) -> Result<Self> {
        Self::with_settings(desc, GeometrySettings::default())
    }

    pub fn with_settings(desc: LayoutDesc, settings: GeometrySettings) -> Result<Self> {
        let layout = VertexLayout::resolve(&desc)?;
        Ok(Self::from_layout(layout, settings))
    }

    pub(crate) fn from_layout(layout: VertexLayout, settings: GeometrySettings) -> Self {
        let id = Uuid::new_v4();
        log::debug!(
            "geometry {id}: {} storage, {} vertices, stride {}",
            layout.storage().name(),
            layout.vertex_count(),
            layout.stride()
        );
        Self {
            id,
            state: Mutex::new(GeometryState::new(&layout)),
            snapshot: RwLock::new(Arc::new(RenderSnapshot::empty(id, &layout))),
            link: RwLock::new(None),
            layout,
            settings,
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> VertexFormat {
        self.layout.format()
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &GeometrySettings {
        &self.settings
    }

    /// Monotonic counter bumped by every successful mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.lock().tracker.version()
    }

    /// Whether the geometry was mutated after `seen` was read from
    /// [`version`](Self::version) or a snapshot.
    #[must_use]
    pub fn changed_since(&self, seen: u64) -> bool {
        self.state.lock().tracker.is_newer_than(seen)
    }

    // ========================================================================
    // Mutation protocol
    // ========================================================================

    fn active_link(&self) -> Option<Arc<dyn SceneLink>> {
        self.link
            .read()
            .as_ref()
            .filter(|link| link.is_active_in_scene())
            .cloned()
    }

    /// `true` while attached to a link that reports itself active.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.active_link().is_some()
    }

    /// Runs `op` under the geometry lock, then settles dirty state and
    /// notifies the link (after unlocking) when live.
    pub(crate) fn commit<R>(
        &self,
        changed: DirtyFlags,
        op: impl FnOnce(&VertexLayout, &mut GeometryState) -> Result<R>,
    ) -> Result<R> {
        let link = self.active_link();
        let result = {
            let mut state = self.state.lock();
            state.storage.ensure_live()?;
            let result = op(&self.layout, &mut state)?;
            self.settle(&mut state, changed, link.is_some());
            result
        };
        if let Some(link) = link
            && !changed.is_empty()
        {
            log::trace!("geometry {}: notifying {changed:?}", self.id);
            link.geometry_changed(self, changed);
        }
        Ok(result)
    }

    fn settle(&self, state: &mut GeometryState, changed: DirtyFlags, live: bool) {
        state.dirty |= changed;
        state.tracker.changed();

        // Whole-vertex alpha copies go stale on any attribute write.
        let stales_alpha = match self.layout.storage() {
            StorageMode::SeparateRef => DirtyFlags::COLOR,
            StorageMode::Packed | StorageMode::InterleavedRef => DirtyFlags::ALL_ATTRIBUTES,
        };
        if changed.intersects(stales_alpha) {
            state.alpha.mark_color_changed();
        }
        if changed.contains(DirtyFlags::COORDINATE) {
            state.bounds.mark_dirty();
        }

        if live {
            if self.settings.eager_bounds && state.bounds.is_dirty() {
                state.refresh_bounds(&self.layout);
            }
            self.publish(state);
        }
    }

    fn publish(&self, state: &GeometryState) {
        let snapshot = Arc::new(state.capture(self.id, &self.layout));
        *self.snapshot.write() = snapshot;
    }

    /// Dirty bits of every category this geometry carries.
    pub(crate) fn present_flags(&self) -> DirtyFlags {
        self.layout
            .categories()
            .iter()
            .fold(DirtyFlags::empty(), |flags, category| flags | category.dirty_flag())
    }

    /// Raises `changed` without touching storage (index writes of an indexed
    /// geometry go through here).
    pub(crate) fn mark_changed(&self, changed: DirtyFlags) -> Result<()> {
        self.commit(changed, |_, _| Ok(()))
    }

    /// Runs `f` with shared access to the locked state.
    pub(crate) fn with_state<R>(
        &self,
        f: impl FnOnce(&VertexLayout, &GeometryState) -> Result<R>,
    ) -> Result<R> {
        let state = self.state.lock();
        state.storage.ensure_live()?;
        f(&self.layout, &state)
    }

    fn mode_mismatch(&self, operation: &'static str) -> TesseraError {
        TesseraError::StorageModeMismatch {
            operation,
            mode: self.layout.storage().name(),
        }
    }

    // ========================================================================
    // By-copy mutators
    // ========================================================================

    /// Writes `values` (`in_width` components per vertex) into the packed
    /// buffer starting at vertex `start`.
    fn write_values(
        &self,
        category: AttributeCategory,
        start: usize,
        values: &[f32],
        in_width: usize,
    ) -> Result<()> {
        self.layout.require(category)?;
        if self.layout.storage() != StorageMode::Packed {
            return Err(self.mode_mismatch("by-copy write"));
        }
        if in_width == 0 || values.len() % in_width != 0 {
            return Err(TesseraError::CountMismatch {
                what: "components",
                expected: values.len().next_multiple_of(in_width.max(1)),
                actual: values.len(),
            });
        }
        let count = values.len() / in_width;
        check_range(category.name(), start, count, self.layout.vertex_count())?;

        self.commit(category.dirty_flag(), |layout, state| {
            let Storage::Packed(buffer) = &mut state.storage else {
                return Err(self.mode_mismatch("by-copy write"));
            };
            write_packed(
                layout,
                Arc::make_mut(buffer).as_mut_slice(),
                category,
                start,
                values,
                in_width,
            );
            Ok(())
        })
    }

    fn require_color_width(&self, width: usize) -> Result<()> {
        self.layout.require(AttributeCategory::Color)?;
        if self.layout.color_components() == width {
            Ok(())
        } else {
            Err(TesseraError::RepresentationMismatch {
                category: "color",
                detail: format!(
                    "{width}-component color on a {}-component format",
                    self.layout.color_components()
                ),
            })
        }
    }

    pub fn set_coordinate(&self, index: usize, point: Vec3) -> Result<()> {
        self.write_values(AttributeCategory::Coordinate, index, &point.to_array(), 3)
    }

    pub fn set_coordinates(&self, start: usize, points: &[Vec3]) -> Result<()> {
        self.write_values(AttributeCategory::Coordinate, start, bytemuck::cast_slice(points), 3)
    }

    /// Double-precision input, narrowed to `f32` storage.
    pub fn set_coordinates_f64(&self, start: usize, points: &[DVec3]) -> Result<()> {
        let narrowed: Vec<f32> = points
            .iter()
            .flat_map(|p| p.as_vec3().to_array())
            .collect();
        self.write_values(AttributeCategory::Coordinate, start, &narrowed, 3)
    }

    /// Packed `x, y, z` triples.
    pub fn set_coordinates_packed(&self, start: usize, values: &[f32]) -> Result<()> {
        self.write_values(AttributeCategory::Coordinate, start, values, 3)
    }

    pub fn set_color3(&self, index: usize, color: Vec3) -> Result<()> {
        self.require_color_width(3)?;
        self.write_values(AttributeCategory::Color, index, &color.to_array(), 3)
    }

    pub fn set_color4(&self, index: usize, color: Vec4) -> Result<()> {
        self.require_color_width(4)?;
        self.write_values(AttributeCategory::Color, index, &color.to_array(), 4)
    }

    pub fn set_colors3(&self, start: usize, colors: &[Vec3]) -> Result<()> {
        self.require_color_width(3)?;
        self.write_values(AttributeCategory::Color, start, bytemuck::cast_slice(colors), 3)
    }

    pub fn set_colors4(&self, start: usize, colors: &[Vec4]) -> Result<()> {
        self.require_color_width(4)?;
        self.write_values(AttributeCategory::Color, start, bytemuck::cast_slice(colors), 4)
    }

    /// Packed colors with the declared number of components per vertex.
    pub fn set_colors_packed(&self, start: usize, values: &[f32]) -> Result<()> {
        self.layout.require(AttributeCategory::Color)?;
        let width = self.layout.color_components();
        self.write_values(AttributeCategory::Color, start, values, width)
    }

    /// Packed byte colors (declared width), normalized to `[0, 1]`.
    pub fn set_colors_u8(&self, start: usize, values: &[u8]) -> Result<()> {
        self.layout.require(AttributeCategory::Color)?;
        let width = self.layout.color_components();
        let normalized: Vec<f32> = values.iter().map(|&v| f32::from(v) / 255.0).collect();
        self.write_values(AttributeCategory::Color, start, &normalized, width)
    }

    pub fn set_normal(&self, index: usize, normal: Vec3) -> Result<()> {
        self.write_values(AttributeCategory::Normal, index, &normal.to_array(), 3)
    }

    pub fn set_normals(&self, start: usize, normals: &[Vec3]) -> Result<()> {
        self.write_values(AttributeCategory::Normal, start, bytemuck::cast_slice(normals), 3)
    }

    /// One texcoord of set `set`; `values` must hold exactly the texcoord size.
    pub fn set_texcoord(&self, set: usize, index: usize, values: &[f32]) -> Result<()> {
        self.layout.require(AttributeCategory::TexCoord(set))?;
        self.expect_single(values, self.layout.texcoord_size())?;
        self.set_texcoords(set, index, values)
    }

    /// Packed texcoords of set `set`, `texcoord_size` components per vertex.
    pub fn set_texcoords(&self, set: usize, start: usize, values: &[f32]) -> Result<()> {
        let category = AttributeCategory::TexCoord(set);
        self.layout.require(category)?;
        self.write_values(category, start, values, self.layout.texcoord_size())
    }

    pub fn set_vertex_attr(&self, attr: usize, index: usize, values: &[f32]) -> Result<()> {
        let category = AttributeCategory::VertexAttr(attr);
        self.layout.require(category)?;
        self.expect_single(values, self.layout.width_of(category))?;
        self.set_vertex_attrs(attr, index, values)
    }

    /// Packed values of vertex attribute `attr`, its declared size per vertex.
    pub fn set_vertex_attrs(&self, attr: usize, start: usize, values: &[f32]) -> Result<()> {
        let category = AttributeCategory::VertexAttr(attr);
        self.layout.require(category)?;
        self.write_values(category, start, values, self.layout.width_of(category))
    }

    fn expect_single(&self, values: &[f32], width: usize) -> Result<()> {
        if values.len() == width {
            Ok(())
        } else {
            Err(TesseraError::CountMismatch {
                what: "components",
                expected: width,
                actual: values.len(),
            })
        }
    }

    // ========================================================================
    // Accessors (every storage mode)
    // ========================================================================

    /// Reads vertex `index` (absolute, not window-relative) of `category`.
    fn read_vertex(&self, category: AttributeCategory, index: usize) -> Result<[f32; 4]> {
        self.layout.require(category)?;
        self.with_state(|layout, state| {
            let reader = state.reader(layout, category);
            if reader.is_missing() {
                return Err(TesseraError::MissingAttribute(category.name()));
            }
            check_index(
                category.name(),
                index,
                access::capacity(layout, &state.storage, category),
            )?;
            let mut out = [0.0; 4];
            reader.read(index, &mut out);
            Ok(out)
        })
    }

    pub fn coordinate(&self, index: usize) -> Result<Vec3> {
        let [x, y, z, _] = self.read_vertex(AttributeCategory::Coordinate, index)?;
        Ok(Vec3::new(x, y, z))
    }

    /// `count` coordinates starting at vertex `start`.
    pub fn coordinates(&self, start: usize, count: usize) -> Result<Vec<Vec3>> {
        self.with_state(|layout, state| {
            let category = AttributeCategory::Coordinate;
            let reader = state.reader(layout, category);
            if reader.is_missing() {
                return Err(TesseraError::MissingAttribute(category.name()));
            }
            check_range(
                category.name(),
                start,
                count,
                access::capacity(layout, &state.storage, category),
            )?;
            let mut v = [0.0; 4];
            Ok((start..start + count)
                .map(|vertex| {
                    reader.read(vertex, &mut v);
                    Vec3::new(v[0], v[1], v[2])
                })
                .collect())
        })
    }

    /// Always 4 components; alpha is 1.0 when the format has none.
    pub fn color(&self, index: usize) -> Result<Vec4> {
        self.read_vertex(AttributeCategory::Color, index)
            .map(Vec4::from_array)
    }

    pub fn normal(&self, index: usize) -> Result<Vec3> {
        let [x, y, z, _] = self.read_vertex(AttributeCategory::Normal, index)?;
        Ok(Vec3::new(x, y, z))
    }

    /// Texcoord of set `set`; components past the texcoord size are 0.
    pub fn texcoord(&self, set: usize, index: usize) -> Result<Vec4> {
        self.read_vertex(AttributeCategory::TexCoord(set), index)
            .map(Vec4::from_array)
    }

    /// Vertex attribute `attr`; components past its size are 0.
    pub fn vertex_attr(&self, attr: usize, index: usize) -> Result<Vec4> {
        self.read_vertex(AttributeCategory::VertexAttr(attr), index)
            .map(Vec4::from_array)
    }

    /// Cheap detached view of the coordinate stream for read-only scans.
    ///
    /// Takes the geometry lock only long enough to clone handles; reads
    /// through the view never block writers of this geometry.
    #[must_use]
    pub fn coordinate_view(&self) -> CoordinateView {
        let state = self.state.lock();
        CoordinateView {
            layout: self.layout.clone(),
            storage: state.storage.clone(),
            mirrors: state.mirrors.clone(),
            first: state.window.coordinate,
            count: state.window.valid_vertex_count,
        }
    }

    // ========================================================================
    // Window
    // ========================================================================

    #[must_use]
    pub fn valid_vertex_count(&self) -> usize {
        self.state.lock().window.valid_vertex_count
    }

    #[must_use]
    pub fn window(&self) -> VertexWindow {
        self.state.lock().window.clone()
    }

    pub fn set_valid_vertex_count(&self, count: usize) -> Result<()> {
        self.commit(self.present_flags(), |layout, state| {
            let mut window = state.window.clone();
            window.valid_vertex_count = count;
            check_window(layout, &state.storage, &window)?;
            state.window = window;
            state.bounds.mark_dirty();
            Ok(())
        })
    }

    /// Moves the window start of every category (packed and interleaved
    /// storage only).
    pub fn set_initial_vertex_index(&self, index: usize) -> Result<()> {
        if self.layout.storage() == StorageMode::SeparateRef {
            return Err(self.mode_mismatch("set_initial_vertex_index"));
        }
        self.commit(self.present_flags(), |layout, state| {
            let mut window = state.window.clone();
            window.set_all_initial(index);
            check_window(layout, &state.storage, &window)?;
            state.window = window;
            state.bounds.mark_dirty();
            Ok(())
        })
    }

    fn set_initial_index(&self, category: AttributeCategory, index: usize) -> Result<()> {
        self.layout.require(category)?;
        if self.layout.storage() != StorageMode::SeparateRef {
            return Err(self.mode_mismatch("per-category initial index"));
        }
        self.commit(category.dirty_flag(), |layout, state| {
            let mut window = state.window.clone();
            window.set_initial(category, index);
            check_window(layout, &state.storage, &window)?;
            state.window = window;
            if category == AttributeCategory::Coordinate {
                state.bounds.mark_dirty();
            }
            Ok(())
        })
    }

    pub fn set_initial_coordinate_index(&self, index: usize) -> Result<()> {
        self.set_initial_index(AttributeCategory::Coordinate, index)
    }

    pub fn set_initial_color_index(&self, index: usize) -> Result<()> {
        self.set_initial_index(AttributeCategory::Color, index)
    }

    pub fn set_initial_normal_index(&self, index: usize) -> Result<()> {
        self.set_initial_index(AttributeCategory::Normal, index)
    }

    pub fn set_initial_texcoord_index(&self, set: usize, index: usize) -> Result<()> {
        self.set_initial_index(AttributeCategory::TexCoord(set), index)
    }

    pub fn set_initial_vertex_attr_index(&self, attr: usize, index: usize) -> Result<()> {
        self.set_initial_index(AttributeCategory::VertexAttr(attr), index)
    }

    // ========================================================================
    // References
    // ========================================================================

    fn set_reference(&self, category: AttributeCategory, source: Option<ArraySource>) -> Result<()> {
        self.layout.require(category)?;
        if self.layout.storage() != StorageMode::SeparateRef {
            return Err(self.mode_mismatch("set reference"));
        }
        if let Some(source) = &source {
            source.admit(
                category,
                self.layout.format(),
                declared_width(&self.layout, category),
            )?;
        }

        self.commit(category.dirty_flag(), |layout, state| {
            if let Some(source) = &source {
                check_range(
                    category.name(),
                    state.window.initial(category),
                    state.window.valid_vertex_count,
                    source_capacity(layout, source, category),
                )?;
            }
            if let Storage::Separate(refs) = &mut state.storage
                && let Some(slot) = refs.slot_mut(category)
            {
                *slot = source;
            }
            mirror::sync_category(layout, &state.storage, &mut state.mirrors, category);
            state.defined = mirror::defined_sources(layout, &state.storage);
            if category == AttributeCategory::Coordinate {
                state.bounds.mark_dirty();
            }
            Ok(())
        })
    }

    /// Sets (or with `None`, clears) the caller-owned coordinate array.
    pub fn set_coordinate_ref(&self, source: Option<ArraySource>) -> Result<()> {
        self.set_reference(AttributeCategory::Coordinate, source)
    }

    pub fn set_color_ref(&self, source: Option<ArraySource>) -> Result<()> {
        self.set_reference(AttributeCategory::Color, source)
    }

    pub fn set_normal_ref(&self, source: Option<ArraySource>) -> Result<()> {
        self.set_reference(AttributeCategory::Normal, source)
    }

    pub fn set_texcoord_ref(&self, set: usize, source: Option<ArraySource>) -> Result<()> {
        self.set_reference(AttributeCategory::TexCoord(set), source)
    }

    pub fn set_vertex_attr_ref(&self, attr: usize, source: Option<ArraySource>) -> Result<()> {
        self.set_reference(AttributeCategory::VertexAttr(attr), source)
    }

    /// Sets the caller-owned interleaved array (interleaved storage only).
    pub fn set_interleaved_ref(&self, source: Option<ArraySource>) -> Result<()> {
        if self.layout.storage() != StorageMode::InterleavedRef {
            return Err(self.mode_mismatch("set_interleaved_ref"));
        }
        if let Some(source) = &source {
            source.admit_interleaved(self.layout.format())?;
        }
        self.commit(self.present_flags(), |layout, state| {
            if let Some(source) = &source {
                check_range(
                    "interleaved",
                    state.window.coordinate,
                    state.window.valid_vertex_count,
                    source.vertex_capacity(layout.stride()),
                )?;
            }
            state.storage = Storage::Interleaved(source);
            state.defined = mirror::defined_sources(layout, &state.storage);
            state.bounds.mark_dirty();
            Ok(())
        })
    }

    /// Current caller reference of `category` (separate storage).
    #[must_use]
    pub fn reference(&self, category: AttributeCategory) -> Option<ArraySource> {
        match &self.state.lock().storage {
            Storage::Separate(refs) => refs.get(category).cloned(),
            _ => None,
        }
    }

    #[must_use]
    pub fn interleaved_ref(&self) -> Option<ArraySource> {
        match &self.state.lock().storage {
            Storage::Interleaved(source) => source.clone(),
            _ => None,
        }
    }

    /// Categories that currently have usable data.
    #[must_use]
    pub fn defined_sources(&self) -> DefinedSources {
        self.state.lock().defined
    }

    /// Announces that the caller wrote through its own arrays.
    ///
    /// Mirrors of the named categories are rebuilt, the window is re-checked
    /// against the (possibly resized) arrays, and the usual dirty / notify
    /// protocol runs.
    pub fn update_data(&self, changed: DirtyFlags) -> Result<()> {
        if self.layout.storage() == StorageMode::Packed {
            return Err(self.mode_mismatch("update_data"));
        }
        self.commit(changed, |layout, state| {
            check_window(layout, &state.storage, &state.window)?;
            mirror::sync_changed(layout, &state.storage, &mut state.mirrors, changed);
            state.defined = mirror::defined_sources(layout, &state.storage);
            Ok(())
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Makes the geometry live under `link`: mirrors and bounds are settled
    /// and a snapshot is published.
    pub fn attach(&self, link: Arc<dyn SceneLink>) -> Result<()> {
        let mut state = self.state.lock();
        state.storage.ensure_live()?;
        let GeometryState {
            storage, mirrors, ..
        } = &mut *state;
        mirror::sync_changed(&self.layout, storage, mirrors, DirtyFlags::ALL_ATTRIBUTES);
        state.defined = mirror::defined_sources(&self.layout, &state.storage);
        if state.bounds.is_dirty() {
            state.refresh_bounds(&self.layout);
        }
        *self.link.write() = Some(link);
        self.publish(&state);
        log::debug!("geometry {} attached", self.id);
        Ok(())
    }

    /// Drops the link; later mutations are not notified.
    pub fn detach(&self) -> Option<Arc<dyn SceneLink>> {
        self.link.write().take()
    }

    /// Tears the geometry down. Every later mutation fails with
    /// [`TesseraError::Released`].
    pub fn release(&self) {
        {
            let mut state = self.state.lock();
            state.storage = Storage::Released;
            state.mirrors.clear();
            state.alpha.clear();
            state.defined = DefinedSources::empty();
        }
        self.link.write().take();
        *self.snapshot.write() = Arc::new(RenderSnapshot::empty(self.id, &self.layout));
        log::debug!("geometry {} released", self.id);
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self.state.lock().storage, Storage::Released)
    }

    // ========================================================================
    // Dirty protocol
    // ========================================================================

    #[must_use]
    pub fn dirty(&self) -> DirtyFlags {
        self.state.lock().dirty
    }

    /// Returns and clears the dirty bits.
    pub fn take_dirty(&self) -> DirtyFlags {
        std::mem::take(&mut self.state.lock().dirty)
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    fn bounds(&self) -> (BoundingBox, Vec3) {
        let mut state = self.state.lock();
        if state.bounds.is_dirty() {
            state.refresh_bounds(&self.layout);
        }
        state.bounds.get()
    }

    /// Bounding box of the valid window, recomputed if stale.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds().0
    }

    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        self.bounds().1
    }

    /// Forces a recomputation and returns the fresh box.
    pub fn compute_bounding_box(&self) -> BoundingBox {
        let mut state = self.state.lock();
        state.refresh_bounds(&self.layout);
        state.bounds.get().0
    }

    // ========================================================================
    // Alpha and rendering
    // ========================================================================

    /// Color data tinted by `alpha` for `screen`.
    ///
    /// Returns `None` when the format has no color or no color data is set.
    pub fn update_alpha_for(&self, screen: usize, alpha: f32) -> Result<Option<AlphaBuffer>> {
        check_index("screen", screen, self.settings.screen_limit())?;
        if !self.layout.format().has_color() {
            return Ok(None);
        }
        let epsilon = self.settings.alpha_epsilon;
        let layout = &self.layout;

        let mut guard = self.state.lock();
        guard.storage.ensure_live()?;
        let GeometryState {
            storage,
            mirrors,
            alpha: cache,
            dirty,
            ..
        } = &mut *guard;
        let storage: &Storage = storage;
        let mirrors: &MirrorSet = mirrors;

        let run = |cache: &mut AlphaCache, backing: &dyn AlphaBacking| {
            (
                cache.update(screen, alpha, epsilon, backing),
                backing.stride(),
                backing.color_offset(),
            )
        };
        let (outcome, stride, color_offset) = match storage {
            Storage::Packed(data) => run(
                cache,
                &PackedBacking {
                    data: data.as_slice(),
                    layout,
                },
            ),
            Storage::Interleaved(Some(source)) => run(
                cache,
                &InterleavedBacking {
                    view: source.view(),
                    layout,
                    vertex_capacity: source.vertex_capacity(layout.stride()),
                },
            ),
            Storage::Separate(refs) => {
                let Some(source) = refs.color.as_ref() else {
                    return Ok(None);
                };
                let vertex_capacity = source_capacity(layout, source, AttributeCategory::Color);
                run(
                    cache,
                    &SeparateBacking {
                        reader: CategoryReader::new(
                            layout,
                            storage,
                            mirrors,
                            AttributeCategory::Color,
                        ),
                        vertex_capacity,
                    },
                )
            }
            Storage::Interleaved(None) | Storage::Released => return Ok(None),
        };

        if matches!(outcome, AlphaOutcome::Updated(_)) {
            *dirty |= DirtyFlags::COLOR;
        }
        Ok(Some(AlphaBuffer {
            screen,
            alpha: alpha.max(epsilon),
            data: Arc::clone(outcome.data()),
            stride,
            color_offset,
        }))
    }

    /// The last published snapshot. Never takes the geometry lock.
    #[must_use]
    pub fn render_snapshot(&self) -> Arc<RenderSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Hands the published snapshot, plus the alpha-tinted colors for
    /// `screen_alpha` when given, to `sink`.
    pub fn submit(&self, sink: &dyn RenderSink, screen_alpha: Option<(usize, f32)>) -> Result<()> {
        let alpha = match screen_alpha {
            Some((screen, alpha)) => self.update_alpha_for(screen, alpha)?,
            None => None,
        };
        sink.submit(&FlatBuffers {
            snapshot: self.render_snapshot(),
            alpha,
        });
        Ok(())
    }

    // ========================================================================
    // Cloning
    // ========================================================================

    /// Copy with a fresh identity, no link and no alpha copies.
    ///
    /// By-copy data is shared copy-on-write, so writes to either geometry
    /// never show through the other. Caller references are shared.
    pub fn duplicate(&self) -> Result<Self> {
        let state = self.state.lock();
        state.storage.ensure_live()?;
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            layout: self.layout.clone(),
            settings: self.settings,
            state: Mutex::new(GeometryState {
                storage: state.storage.clone(),
                mirrors: state.mirrors.clone(),
                window: state.window.clone(),
                defined: state.defined,
                dirty: self.present_flags(),
                bounds: state.bounds.clone(),
                alpha: AlphaCache::default(),
                tracker: ChangeTracker::new(),
            }),
            snapshot: RwLock::new(Arc::new(RenderSnapshot::empty(id, &self.layout))),
            link: RwLock::new(None),
        })
    }
}

/// Checks `initial + valid <= vertex_count` for every category and, for
/// caller-owned data, that each present source covers its window.
fn check_window(layout: &VertexLayout, storage: &Storage, window: &VertexWindow) -> Result<()> {
    let valid = window.valid_vertex_count;
    for category in layout.categories() {
        let initial = window.initial(category);
        check_range(category.name(), initial, valid, layout.vertex_count())?;
        let present = match storage {
            Storage::Separate(refs) => refs.get(category).is_some(),
            Storage::Interleaved(source) => source.is_some(),
            Storage::Packed(_) | Storage::Released => false,
        };
        if present {
            check_range(
                category.name(),
                initial,
                valid,
                access::capacity(layout, storage, category),
            )?;
        }
    }
    Ok(())
}

/// Detached coordinate stream of a geometry.
///
/// Holds clones of the storage handles taken at creation, so it stays
/// usable while the geometry is mutated (copy-on-write buffers keep the old
/// contents; caller arrays are read as they are at read time).
#[derive(Debug, Clone)]
pub struct CoordinateView {
    layout: VertexLayout,
    storage: Storage,
    mirrors: MirrorSet,
    first: usize,
    count: usize,
}

impl CoordinateView {
    /// Vertices in the valid window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute index of the first vertex in the window.
    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    /// Locks any caller array for the duration of the scan.
    #[must_use]
    pub fn reader(&self) -> CoordinateReader<'_> {
        CoordinateReader {
            inner: CategoryReader::new(
                &self.layout,
                &self.storage,
                &self.mirrors,
                AttributeCategory::Coordinate,
            ),
            first: self.first,
            count: self.count,
            capacity: access::capacity(&self.layout, &self.storage, AttributeCategory::Coordinate),
        }
    }
}

/// Scanning access to a [`CoordinateView`].
pub struct CoordinateReader<'a> {
    inner: CategoryReader<'a>,
    first: usize,
    count: usize,
    capacity: usize,
}

impl CoordinateReader<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `i`-th vertex of the valid window.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Vec3> {
        if i >= self.count {
            return None;
        }
        self.get_absolute(self.first + i)
    }

    /// Vertex `vertex` of the underlying storage, ignoring the window.
    #[must_use]
    pub fn get_absolute(&self, vertex: usize) -> Option<Vec3> {
        if vertex >= self.capacity || self.inner.is_missing() {
            return None;
        }
        let mut v = [0.0; 4];
        self.inner.read(vertex, &mut v);
        Some(Vec3::new(v[0], v[1], v[2]))
    }
}
