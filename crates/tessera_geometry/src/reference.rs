use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::source::decode;

// Global reference id generator
static NEXT_REF_ID: AtomicU64 = AtomicU64::new(0);

/// Caller-owned array shared with one or more geometries.
///
/// The caller keeps a clone, writes through [`RefArray::write`], and then
/// tells the geometry which categories it touched (see
/// [`GeometryBuffer::update_data`](crate::GeometryBuffer::update_data)).
/// The geometry never writes into a `RefArray`.
#[derive(Debug)]
pub struct RefData<T> {
    id: u64,
    version: AtomicU64,
    data: RwLock<Vec<T>>,
}

/// Cheap-to-clone handle to caller-owned data.
#[derive(Debug)]
pub struct RefArray<T>(Arc<RefData<T>>);

impl<T> Clone for RefArray<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for RefArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl<T> Eq for RefArray<T> {}

impl<T> std::hash::Hash for RefArray<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl<T> RefArray<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self(Arc::new(RefData {
            id: NEXT_REF_ID.fetch_add(1, Ordering::Relaxed),
            version: AtomicU64::new(0),
            data: RwLock::new(data),
        }))
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Lock-free read of the write counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.0.data.read()
    }

    /// Write access; the version is bumped when the guard drops.
    pub fn write(&self) -> RefWriteGuard<'_, T> {
        RefWriteGuard {
            data: self.0.data.write(),
            version: &self.0.version,
        }
    }

    /// Replaces the whole contents.
    pub fn replace(&self, data: Vec<T>) {
        *self.write() = data;
    }
}

impl<T: Clone> RefArray<T> {
    pub fn from_slice(data: &[T]) -> Self {
        Self::new(data.to_vec())
    }
}

/// Write guard - bumps the array version when the scope ends
pub struct RefWriteGuard<'a, T> {
    data: RwLockWriteGuard<'a, Vec<T>>,
    version: &'a AtomicU64,
}

impl<T> std::ops::Deref for RefWriteGuard<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> std::ops::DerefMut for RefWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T> Drop for RefWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }
}

/// Element type of an [`ExternalBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F64,
    /// Unsigned bytes, normalized to `[0, 1]` on read.
    U8,
}

impl ElementType {
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
            Self::U8 => 1,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::U8 => "u8",
        }
    }
}

/// External contiguous buffer: raw native-endian bytes plus an element type.
///
/// Models data living outside the engine's typed arrays (memory-mapped files,
/// buffers shared with other libraries). Elements are decoded on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBuffer {
    bytes: RefArray<u8>,
    element: ElementType,
}

impl ExternalBuffer {
    #[must_use]
    pub fn new(bytes: RefArray<u8>, element: ElementType) -> Self {
        Self { bytes, element }
    }

    /// Builds an external buffer from typed values.
    pub fn from_values<T: Pod>(values: &[T], element: ElementType) -> Self {
        Self::new(RefArray::new(bytemuck::cast_slice(values).to_vec()), element)
    }

    #[must_use]
    pub fn element(&self) -> ElementType {
        self.element
    }

    #[must_use]
    pub fn bytes(&self) -> &RefArray<u8> {
        &self.bytes
    }

    /// Number of whole elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.element.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes `out.len()` consecutive elements starting at element `first`.
    ///
    /// Elements past the end of the buffer read as zero.
    pub fn read_into(&self, first: usize, out: &mut [f32]) {
        let bytes = self.bytes.read();
        let size = self.element.size();
        for (k, slot) in out.iter_mut().enumerate() {
            let start = (first + k) * size;
            *slot = match bytes.get(start..start + size) {
                Some(raw) => decode(self.element, raw),
                None => 0.0,
            };
        }
    }
}
