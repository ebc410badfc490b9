//! Storage collaborators: metadata documents, brick payloads and brick depths

use crate::error::{Result, VolumeError};
use crate::resolution::{levels_for_brick_size, levels_for_samples};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Local file system
    FileSystem,
    /// Process memory
    Memory,
}

/// What a store needs to know about a brick to resolve its depth
#[derive(Debug, Clone, Copy)]
pub struct BrickRequest<'a> {
    /// Resolved brick path
    pub filename: &'a Path,
    /// Edge length in voxels
    pub size: i64,
    /// Width of one sample in bytes
    pub bytes_per_pixel: u32,
    /// Whether the payload is stored in hierarchical Z order
    pub curve_encoded: bool,
}

impl BrickRequest<'_> {
    /// Depth of a curve-encoded payload of `len` bytes.
    ///
    /// A payload cannot hold more levels than a complete brick of this size,
    /// so longer payloads are capped at that depth.
    pub fn depth_from_len(&self, len: u64) -> u32 {
        let depth = levels_for_samples(len / u64::from(self.bytes_per_pixel.max(1)));
        let complete = levels_for_brick_size(self.size.max(0) as u64);
        if depth != complete {
            log::warn!(
                "{}: payload holds {} levels, a complete brick of size {} holds {}",
                self.filename.display(),
                depth,
                self.size,
                complete
            );
        }
        depth.min(complete)
    }
}

/// Trait for reading volume data from a storage backend
#[async_trait]
pub trait VolumeStore: Send + Sync {
    /// Read the whole object at a path
    async fn read(&self, path: &Path) -> Result<Bytes>;

    /// Check if a path exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Deepest resolution level available in a brick.
    ///
    /// Linear bricks have a single level, reported as 0.
    async fn max_z_level(&self, request: &BrickRequest<'_>) -> Result<u32>;

    /// Get the backend type
    fn backend(&self) -> StorageBackend;
}

/// File system store
#[derive(Debug, Default, Clone)]
pub struct FileSystemStore;

impl FileSystemStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VolumeStore for FileSystemStore {
    async fn read(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(VolumeError::Io)?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(VolumeError::Io)
    }

    async fn max_z_level(&self, request: &BrickRequest<'_>) -> Result<u32> {
        if !request.curve_encoded {
            return Ok(0);
        }
        let metadata = fs::metadata(request.filename).await.map_err(VolumeError::Io)?;
        Ok(request.depth_from_len(metadata.len()))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::FileSystem
    }
}

/// In-memory store, mostly for tooling and tests.
///
/// Depths assigned with [`MemoryStore::set_depth`] take precedence over depths
/// derived from stored payloads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<PathBuf, Bytes>>,
    depths: RwLock<HashMap<PathBuf, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object under a path
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>) {
        self.objects.write().insert(path.into(), data.into());
    }

    /// Assign the depth reported for a brick
    pub fn set_depth(&self, path: impl Into<PathBuf>, depth: u32) {
        self.depths.write().insert(path.into(), depth);
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl VolumeStore for MemoryStore {
    async fn read(&self, path: &Path) -> Result<Bytes> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| VolumeError::Storage(format!("Not found: {}", path.display())))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.objects.read().contains_key(path))
    }

    async fn max_z_level(&self, request: &BrickRequest<'_>) -> Result<u32> {
        if let Some(&depth) = self.depths.read().get(request.filename) {
            return Ok(depth);
        }
        if !request.curve_encoded {
            return Ok(0);
        }
        let len = self
            .objects
            .read()
            .get(request.filename)
            .map(|data| data.len() as u64)
            .ok_or_else(|| {
                VolumeError::Storage(format!("Not found: {}", request.filename.display()))
            })?;
        Ok(request.depth_from_len(len))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
