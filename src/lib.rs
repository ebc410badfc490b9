//! brickvol - spatial model for bricked volumetric datasets
//!
//! Large volumes are often split into cubic bricks, stored either linearly or
//! in hierarchical Z order (`.hz`) for progressive refinement. This crate reads
//! the JSON description of such a dataset and places every brick inside a
//! normalized render cube, ready for a GPU ray marcher.
//!
//! # Features
//!
//! - Metadata parsing and validation
//! - Scale normalization for anisotropic voxel spacing
//! - Per-brick world-space centers and bounding boxes (placed in parallel)
//! - Resolution (Z-) level reduction across bricks
//! - A `#[repr(C)]` summary record for uniform buffers
//! - Async storage abstraction (implement `VolumeStore` for other backends)
//!
//! # Example
//!
//! ```rust,ignore
//! use brickvol::VolumeHandle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = VolumeHandle::filesystem();
//! let dataset = handle.load("/data/head-ct").await?;
//!
//! let gpu_record = handle.summary()?.to_gpu();
//! for brick in dataset.bricks() {
//!     println!("{} -> {:?}..{:?}", brick.filename.display(), brick.world_min, brick.world_max);
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod resolution;
pub mod scale;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use access::{LoadState, VolumeHandle};
pub use config::LoadOptions;
pub use error::{Result, VolumeError};
pub use io::{BrickRequest, FileSystemStore, MemoryStore, StorageBackend, VolumeStore};
pub use layout::{BrickPlacement, VolumeLayout};
pub use metadata::{BrickEntry, VolumeMetadata};
pub use scale::normalize_scale;
pub use types::{BrickDataType, Endianness, CURVE_ENCODED_EXTENSION};
pub use volume::{Brick, GpuMetaVolume, MetaVolumeSummary, VolumeDataset};

/// Version of the brickvol implementation
pub const BRICKVOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!BRICKVOL_VERSION.is_empty());
    }
}
