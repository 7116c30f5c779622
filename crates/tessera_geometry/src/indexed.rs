//! Indexed geometry: vertex data plus one index array per attribute category.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use tessera_core::errors::{Result, TesseraError, check_index, check_range};

use crate::format::{AttributeCategory, DirtyFlags, VertexFormat};
use crate::geometry::{CoordinateReader, CoordinateView, GeometryBuffer};
use crate::layout::{LayoutDesc, VertexLayout};
use crate::settings::GeometrySettings;

#[derive(Debug, Clone)]
struct IndexArray {
    indices: Arc<Vec<u32>>,
    max_index: u32,
}

impl IndexArray {
    fn zeroed(len: usize) -> Self {
        Self {
            indices: Arc::new(vec![0; len]),
            max_index: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct IndexState {
    pub index_count: usize,
    pub valid_index_count: usize,
    pub initial_index_index: usize,
    arrays: FxHashMap<AttributeCategory, IndexArray>,
    coord_index_only: bool,
}

impl IndexState {
    fn new(layout: &VertexLayout, index_count: usize) -> Self {
        let coord_index_only = layout.format().contains(VertexFormat::COORD_INDEX_ONLY);
        let arrays = layout
            .categories()
            .into_iter()
            .filter(|&category| !coord_index_only || category == AttributeCategory::Coordinate)
            .map(|category| (category, IndexArray::zeroed(index_count)))
            .collect();
        Self {
            index_count,
            valid_index_count: index_count,
            initial_index_index: 0,
            arrays,
            coord_index_only,
        }
    }

    /// The index array `category` reads through.
    fn array(&self, category: AttributeCategory) -> Option<&IndexArray> {
        let key = if self.coord_index_only {
            AttributeCategory::Coordinate
        } else {
            category
        };
        self.arrays.get(&key)
    }

    pub fn indices(&self, category: AttributeCategory) -> Option<&Arc<Vec<u32>>> {
        self.array(category).map(|array| &array.indices)
    }

    pub fn max_index(&self, category: AttributeCategory) -> Option<u32> {
        self.array(category).map(|array| array.max_index)
    }

    /// Moves the index window to `first..first + count`. Every index the new
    /// window exposes must address a vertex; otherwise nothing changes.
    fn move_window(&mut self, first: usize, count: usize, vertex_count: usize) -> Result<()> {
        if count > 0 {
            for array in self.arrays.values() {
                let max = window_max(&array.indices, first, count);
                check_index("vertex index", max as usize, vertex_count)?;
            }
        }
        self.initial_index_index = first;
        self.valid_index_count = count;
        for array in self.arrays.values_mut() {
            array.max_index = window_max(&array.indices, first, count);
        }
        Ok(())
    }
}

/// Largest index inside `first..first + count`.
fn window_max(indices: &[u32], first: usize, count: usize) -> u32 {
    indices
        .get(first..first + count)
        .and_then(|window| window.iter().copied().max())
        .unwrap_or(0)
}

/// A [`GeometryBuffer`] whose primitives are assembled through index arrays.
///
/// Vertex data is written through [`IndexedGeometryBuffer::geometry`]; index
/// writes raise [`DirtyFlags::INDEX`] on that geometry and follow its
/// notification protocol.
#[derive(Debug)]
pub struct IndexedGeometryBuffer {
    geometry: GeometryBuffer,
    state: Mutex<IndexState>,
}

impl IndexedGeometryBuffer {
    pub fn new(desc: LayoutDesc, index_count: usize) -> Result<Self> {
        Self::with_settings(desc, index_count, GeometrySettings::default())
    }

    pub fn with_settings(
        desc: LayoutDesc,
        index_count: usize,
        settings: GeometrySettings,
    ) -> Result<Self> {
        let layout = VertexLayout::resolve_indexed(&desc)?;
        let state = IndexState::new(&layout, index_count);
        Ok(Self {
            geometry: GeometryBuffer::from_layout(layout, settings),
            state: Mutex::new(state),
        })
    }

    /// The indexed vertex data.
    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.state.lock().index_count
    }

    #[must_use]
    pub fn valid_index_count(&self) -> usize {
        self.state.lock().valid_index_count
    }

    #[must_use]
    pub fn initial_index_index(&self) -> usize {
        self.state.lock().initial_index_index
    }

    /// Fails with a range error when the enlarged window would expose an
    /// index past the vertex count.
    pub fn set_valid_index_count(&self, count: usize) -> Result<()> {
        let vertex_count = self.geometry.layout().vertex_count();
        {
            let mut state = self.state.lock();
            let first = state.initial_index_index;
            check_range("valid index count", first, count, state.index_count)?;
            state.move_window(first, count, vertex_count)?;
        }
        self.geometry.mark_changed(DirtyFlags::INDEX)
    }

    pub fn set_initial_index_index(&self, index: usize) -> Result<()> {
        let vertex_count = self.geometry.layout().vertex_count();
        {
            let mut state = self.state.lock();
            let count = state.valid_index_count;
            check_range("initial index index", index, count, state.index_count)?;
            state.move_window(index, count, vertex_count)?;
        }
        self.geometry.mark_changed(DirtyFlags::INDEX)
    }

    fn set_indices(&self, category: AttributeCategory, start: usize, values: &[u32]) -> Result<()> {
        let layout = self.geometry.layout();
        layout.require(category)?;
        if layout.format().contains(VertexFormat::COORD_INDEX_ONLY)
            && category != AttributeCategory::Coordinate
        {
            return Err(TesseraError::InvalidFormat(format!(
                "COORD_INDEX_ONLY geometry takes no separate {} indices",
                category.name()
            )));
        }
        let vertex_count = layout.vertex_count();

        {
            let mut state = self.state.lock();
            check_range("indices", start, values.len(), state.index_count)?;
            // Only indices inside the window are ever dereferenced.
            let (first, count) = (state.initial_index_index, state.valid_index_count);
            let window = first..first + count;
            for (position, &value) in (start..).zip(values) {
                if window.contains(&position) {
                    check_index("vertex index", value as usize, vertex_count)?;
                }
            }
            let Some(array) = state.arrays.get_mut(&category) else {
                return Err(TesseraError::MissingAttribute(category.name()));
            };
            let indices = Arc::make_mut(&mut array.indices);
            indices[start..start + values.len()].copy_from_slice(values);
            array.max_index = window_max(indices, first, count);
        }
        self.geometry.mark_changed(DirtyFlags::INDEX)
    }

    pub fn set_coordinate_index(&self, index: usize, value: u32) -> Result<()> {
        self.set_indices(AttributeCategory::Coordinate, index, &[value])
    }

    pub fn set_coordinate_indices(&self, start: usize, values: &[u32]) -> Result<()> {
        self.set_indices(AttributeCategory::Coordinate, start, values)
    }

    pub fn set_color_indices(&self, start: usize, values: &[u32]) -> Result<()> {
        self.set_indices(AttributeCategory::Color, start, values)
    }

    pub fn set_normal_indices(&self, start: usize, values: &[u32]) -> Result<()> {
        self.set_indices(AttributeCategory::Normal, start, values)
    }

    pub fn set_texcoord_indices(&self, set: usize, start: usize, values: &[u32]) -> Result<()> {
        self.set_indices(AttributeCategory::TexCoord(set), start, values)
    }

    pub fn set_vertex_attr_indices(&self, attr: usize, start: usize, values: &[u32]) -> Result<()> {
        self.set_indices(AttributeCategory::VertexAttr(attr), start, values)
    }

    /// Index `i` of `category`'s array (the coordinate array under
    /// `COORD_INDEX_ONLY`).
    pub fn index(&self, category: AttributeCategory, i: usize) -> Result<u32> {
        self.geometry.layout().require(category)?;
        let state = self.state.lock();
        check_index("index", i, state.index_count)?;
        state
            .indices(category)
            .map(|indices| indices[i])
            .ok_or(TesseraError::MissingAttribute(category.name()))
    }

    pub fn coordinate_index(&self, i: usize) -> Result<u32> {
        self.index(AttributeCategory::Coordinate, i)
    }

    /// Largest index of `category` inside the current index window.
    #[must_use]
    pub fn max_index(&self, category: AttributeCategory) -> Option<u32> {
        self.state.lock().max_index(category)
    }

    pub(crate) fn with_index_state<R>(&self, f: impl FnOnce(&IndexState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Detached view of the coordinates in index order.
    #[must_use]
    pub fn coordinate_view(&self) -> IndexedCoordinateView {
        let (indices, first, count) = {
            let state = self.state.lock();
            (
                state
                    .indices(AttributeCategory::Coordinate)
                    .map_or_else(|| Arc::new(Vec::new()), Arc::clone),
                state.initial_index_index,
                state.valid_index_count,
            )
        };
        IndexedCoordinateView {
            vertices: self.geometry.coordinate_view(),
            indices,
            first,
            count,
        }
    }
}

/// Coordinates of an [`IndexedGeometryBuffer`] in index order.
#[derive(Debug, Clone)]
pub struct IndexedCoordinateView {
    vertices: CoordinateView,
    indices: Arc<Vec<u32>>,
    first: usize,
    count: usize,
}

impl IndexedCoordinateView {
    /// Indices in the valid index window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn reader(&self) -> IndexedCoordinateReader<'_> {
        IndexedCoordinateReader {
            vertices: self.vertices.reader(),
            indices: self.indices.as_slice(),
            first: self.first,
            count: self.count,
        }
    }
}

pub struct IndexedCoordinateReader<'a> {
    vertices: CoordinateReader<'a>,
    indices: &'a [u32],
    first: usize,
    count: usize,
}

impl IndexedCoordinateReader<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Vertex referenced by the `i`-th index of the valid window.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Vec3> {
        if i >= self.count {
            return None;
        }
        let index = *self.indices.get(self.first + i)?;
        self.vertices.get_absolute(index as usize)
    }
}
