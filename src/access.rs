//! Volume handle - loads a dataset through a store and guards its lifecycle

use crate::config::LoadOptions;
use crate::error::{Result, VolumeError};
use crate::io::{BrickRequest, FileSystemStore, VolumeStore};
use crate::metadata::VolumeMetadata;
use crate::utils::linear_brick_bytes;
use crate::volume::{MetaVolumeSummary, PlacedVolume, VolumeDataset};
use bytes::Bytes;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of a volume handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet
    Unloaded,
    /// A load is in progress
    Loading,
    /// The dataset is available
    Ready,
    /// The load failed; the handle cannot be reused
    Failed,
}

#[derive(Debug)]
enum Slot {
    Unloaded,
    Loading,
    Ready(Arc<VolumeDataset>),
    Failed(String),
}

impl Slot {
    fn state(&self) -> LoadState {
        match self {
            Slot::Unloaded => LoadState::Unloaded,
            Slot::Loading => LoadState::Loading,
            Slot::Ready(_) => LoadState::Ready,
            Slot::Failed(_) => LoadState::Failed,
        }
    }
}

/// Main interface for loading a bricked volume.
///
/// A handle loads at most once. After a failed or dropped load it stays
/// `Failed`; build a new handle to retry.
#[derive(Clone)]
pub struct VolumeHandle {
    /// Current lifecycle state
    slot: Arc<RwLock<Slot>>,

    /// Store used for metadata, payloads and brick depths
    store: Arc<dyn VolumeStore>,

    options: LoadOptions,
}

impl VolumeHandle {
    /// Create a handle reading through `store`
    pub fn new(store: Arc<dyn VolumeStore>, options: LoadOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            slot: Arc::new(RwLock::new(Slot::Unloaded)),
            store,
            options,
        })
    }

    /// Create a handle reading from the local file system with default options
    pub fn filesystem() -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot::Unloaded)),
            store: Arc::new(FileSystemStore::new()),
            options: LoadOptions::default(),
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn state(&self) -> LoadState {
        self.slot.read().state()
    }

    /// Error message of a failed load
    pub fn failure(&self) -> Option<String> {
        match &*self.slot.read() {
            Slot::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Load the dataset whose metadata document lives in `data_path`
    pub async fn load(&self, data_path: impl AsRef<Path>) -> Result<Arc<VolumeDataset>> {
        let data_path = data_path.as_ref().to_path_buf();
        let _guard = self.begin()?;
        log::info!(
            "Loading volume from {} ({:?} backend)",
            data_path.display(),
            self.store.backend()
        );

        let result = async move {
            let metadata_path = data_path.join(&self.options.metadata_file_name);
            let document = self.store.read(&metadata_path).await?;
            let metadata = VolumeMetadata::from_slice(&document)?;
            self.build(data_path, metadata).await
        }
        .await;
        self.complete(result)
    }

    /// Load a dataset from metadata that was already parsed
    pub async fn load_metadata(
        &self,
        data_path: impl AsRef<Path>,
        metadata: VolumeMetadata,
    ) -> Result<Arc<VolumeDataset>> {
        let data_path = data_path.as_ref().to_path_buf();
        let _guard = self.begin()?;
        let result = self.build(data_path, metadata).await;
        self.complete(result)
    }

    /// The loaded dataset
    pub fn dataset(&self) -> Result<Arc<VolumeDataset>> {
        match &*self.slot.read() {
            Slot::Ready(dataset) => Ok(Arc::clone(dataset)),
            _ => Err(VolumeError::Uninitialized),
        }
    }

    /// Renderer-facing summary of the loaded dataset
    pub fn summary(&self) -> Result<MetaVolumeSummary> {
        Ok(self.dataset()?.summary())
    }

    /// Largest representable sample value of the loaded dataset
    pub fn isovalue_range(&self) -> Result<u64> {
        Ok(self.dataset()?.isovalue_range())
    }

    /// Read the payload of brick `index` from the store
    pub async fn read_brick(&self, index: usize) -> Result<Bytes> {
        let dataset = self.dataset()?;
        let brick = dataset.bricks().get(index).ok_or_else(|| {
            VolumeError::InvalidState(format!(
                "Brick index {} out of range ({} bricks)",
                index,
                dataset.total_bricks()
            ))
        })?;

        let data = self.store.read(&brick.filename).await?;
        if !dataset.is_curve_encoded() {
            let expected = linear_brick_bytes(brick.size, dataset.bytes_per_pixel())
                .ok_or_else(|| {
                    VolumeError::DegenerateBrick(format!(
                        "{}: size {} is too large to address",
                        brick.filename.display(),
                        brick.size
                    ))
                })?;
            if data.len() as u64 != expected {
                return Err(VolumeError::Storage(format!(
                    "{}: expected {} bytes, got {}",
                    brick.filename.display(),
                    expected,
                    data.len()
                )));
            }
        }
        Ok(data)
    }

    fn begin(&self) -> Result<LoadGuard<'_>> {
        let mut slot = self.slot.write();
        match *slot {
            Slot::Unloaded => {
                *slot = Slot::Loading;
                Ok(LoadGuard { slot: &self.slot })
            }
            Slot::Loading => Err(VolumeError::InvalidState(
                "A load is already in progress".to_string(),
            )),
            Slot::Ready(_) => Err(VolumeError::InvalidState(
                "Volume is already loaded".to_string(),
            )),
            Slot::Failed(ref message) => Err(VolumeError::InvalidState(format!(
                "Volume failed to load ({}); create a new handle",
                message
            ))),
        }
    }

    fn complete(&self, result: Result<VolumeDataset>) -> Result<Arc<VolumeDataset>> {
        let mut slot = self.slot.write();
        match result {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                *slot = Slot::Ready(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(err) => {
                log::error!("Failed to load volume: {}", err);
                *slot = Slot::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn build(&self, data_path: PathBuf, metadata: VolumeMetadata) -> Result<VolumeDataset> {
        let started = Instant::now();
        let options = self.options.clone();

        let placed = tokio::task::spawn_blocking(move || {
            PlacedVolume::place(&data_path, &metadata, &options)
        })
        .await
        .map_err(|e| VolumeError::InvalidState(format!("Placement task failed: {}", e)))??;

        let requests = placed.brick_requests();
        let levels = resolve_levels(
            self.store.as_ref(),
            &requests,
            self.options.max_concurrent_queries,
        )
        .await?;
        drop(requests);
        log::debug!("Resolved {} brick depths", levels.len());

        let dataset = placed.finish(&levels)?;
        log::info!(
            "Metadata read in {:.1}ms. {}, scale {:?}",
            started.elapsed().as_secs_f64() * 1000.0,
            dataset.summary_line(),
            dataset.scale()
        );
        Ok(dataset)
    }
}

/// Fails the handle if a load future is dropped before it completes
struct LoadGuard<'a> {
    slot: &'a RwLock<Slot>,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.write();
        if matches!(*slot, Slot::Loading) {
            log::warn!("Volume load was cancelled");
            *slot = Slot::Failed("Load was cancelled".to_string());
        }
    }
}

/// Query every brick's depth, `limit` requests at a time, preserving order
async fn resolve_levels(
    store: &dyn VolumeStore,
    requests: &[BrickRequest<'_>],
    limit: usize,
) -> Result<Vec<u32>> {
    let mut levels = Vec::with_capacity(requests.len());
    for batch in requests.chunks(limit.max(1)) {
        let batch_levels = try_join_all(batch.iter().map(|request| store.max_z_level(request))).await?;
        levels.extend(batch_levels);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryStore, StorageBackend};
    use crate::metadata::BrickEntry;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Store whose requests never complete
    struct StalledStore;

    #[async_trait]
    impl VolumeStore for StalledStore {
        async fn read(&self, _path: &Path) -> Result<Bytes> {
            futures::future::pending().await
        }

        async fn exists(&self, _path: &Path) -> Result<bool> {
            futures::future::pending().await
        }

        async fn max_z_level(&self, _request: &BrickRequest<'_>) -> Result<u32> {
            futures::future::pending().await
        }

        fn backend(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    fn hz_metadata() -> VolumeMetadata {
        VolumeMetadata::new([32, 32, 32], [1.0, 1.0, 1.0], 1)
            .with_levels(0, 15)
            .with_regular_grid(16, ".hz")
            .unwrap()
    }

    fn memory_handle(store: MemoryStore) -> VolumeHandle {
        VolumeHandle::new(Arc::new(store), LoadOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_load_from_memory_store() {
        let metadata = hz_metadata();
        let store = MemoryStore::new();
        store.insert(
            "/vol/metadata.json",
            metadata.to_json_pretty().unwrap().into_bytes(),
        );
        for (i, entry) in metadata.bricks.iter().enumerate() {
            store.set_depth(Path::new("/vol").join(&entry.filename), i as u32);
        }

        let handle = memory_handle(store);
        assert_eq!(handle.state(), LoadState::Unloaded);
        assert!(matches!(handle.summary(), Err(VolumeError::Uninitialized)));
        assert!(matches!(handle.isovalue_range(), Err(VolumeError::Uninitialized)));

        let dataset = handle.load("/vol").await.unwrap();
        assert_eq!(handle.state(), LoadState::Ready);
        assert_eq!(dataset.total_bricks(), 8);
        assert_eq!(dataset.max_z_level(), 7);

        let summary = handle.summary().unwrap();
        assert!(summary.is_curve_encoded);
        assert_eq!(summary.num_bricks, 8);
        assert_eq!(handle.isovalue_range().unwrap(), 255);
    }

    #[tokio::test]
    async fn test_depths_resolved_in_small_batches() {
        let metadata = hz_metadata();
        let store = MemoryStore::new();
        for entry in &metadata.bricks {
            // 16^3 one-byte samples
            store.insert(Path::new("/vol").join(&entry.filename), vec![0u8; 4096]);
        }
        let handle = VolumeHandle::new(
            Arc::new(store),
            LoadOptions::new().with_max_concurrent_queries(3),
        )
        .unwrap();

        let dataset = handle.load_metadata("/vol", metadata).await.unwrap();
        assert!(dataset.bricks().iter().all(|b| b.max_z_level == 12));
        assert_eq!(dataset.max_z_level(), 12);
    }

    #[tokio::test]
    async fn test_failed_load_is_terminal() {
        let metadata = hz_metadata();
        let handle = memory_handle(MemoryStore::new());

        let err = handle.load_metadata("/vol", metadata.clone()).await.unwrap_err();
        assert!(matches!(err, VolumeError::Storage(_)));
        assert_eq!(handle.state(), LoadState::Failed);
        assert!(handle.failure().is_some());
        assert!(matches!(handle.summary(), Err(VolumeError::Uninitialized)));

        assert!(matches!(
            handle.load_metadata("/vol", metadata).await,
            Err(VolumeError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_metadata_fails_load() {
        let store = MemoryStore::new();
        store.insert("/vol/metadata.json", r#"{ "minLevel": 0 }"#);
        let handle = memory_handle(store);

        assert!(matches!(
            handle.load("/vol").await,
            Err(VolumeError::MalformedMetadata(_))
        ));
        assert_eq!(handle.state(), LoadState::Failed);
    }

    #[tokio::test]
    async fn test_second_load_rejected() {
        let metadata = VolumeMetadata::new([16, 16, 16], [1.0, 1.0, 1.0], 1)
            .with_brick(BrickEntry::new("b.raw", 16, [0, 0, 0]));
        let handle = memory_handle(MemoryStore::new());

        handle.load_metadata("/vol", metadata.clone()).await.unwrap();
        assert!(matches!(
            handle.load_metadata("/vol", metadata).await,
            Err(VolumeError::InvalidState(_))
        ));
        assert_eq!(handle.state(), LoadState::Ready);
    }

    #[tokio::test]
    async fn test_read_brick_checks_linear_size() {
        let metadata = VolumeMetadata::new([16, 16, 32], [1.0, 1.0, 1.0], 2)
            .with_brick(BrickEntry::new("a.raw", 16, [0, 0, 0]))
            .with_brick(BrickEntry::new("b.raw", 16, [0, 0, 16]));
        let store = MemoryStore::new();
        store.insert("/vol/a.raw", vec![0u8; 16 * 16 * 16 * 2]);
        store.insert("/vol/b.raw", vec![0u8; 10]);
        let handle = memory_handle(store);

        assert!(matches!(handle.read_brick(0).await, Err(VolumeError::Uninitialized)));
        handle.load_metadata("/vol", metadata).await.unwrap();

        assert_eq!(handle.read_brick(0).await.unwrap().len(), 8192);
        assert!(matches!(handle.read_brick(1).await, Err(VolumeError::Storage(_))));
        assert!(matches!(handle.read_brick(2).await, Err(VolumeError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_dropped_load_fails_handle() {
        let handle = VolumeHandle::new(Arc::new(StalledStore), LoadOptions::default()).unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), handle.load_metadata("/vol", hz_metadata()))
                .await;
        assert!(timed_out.is_err());
        assert_eq!(handle.state(), LoadState::Failed);
        assert_eq!(handle.failure().as_deref(), Some("Load was cancelled"));

        assert!(matches!(
            handle.load("/vol").await,
            Err(VolumeError::InvalidState(_))
        ));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = VolumeHandle::new(
            Arc::new(MemoryStore::new()),
            LoadOptions::new().with_max_concurrent_queries(0),
        );
        assert!(matches!(result, Err(VolumeError::Configuration(_))));
    }
}
