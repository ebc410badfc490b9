//! Metadata document describing a bricked volume
//!
//! The document is JSON with camelCase keys:
//!
//! ```json
//! {
//!   "minLevel": 0, "maxLevel": 18, "totalBricks": 1, "bytesPerPixel": 1,
//!   "globalSize": [64, 64, 64], "endianness": "little", "scale": [1.0, 1.0, 1.0],
//!   "bricks": [{ "filename": "b_0_0_0.hz", "size": 64, "position": [0, 0, 0] }]
//! }
//! ```

use crate::error::{Result, VolumeError};
use crate::types::{BrickDataType, Endianness};
use serde::{Deserialize, Serialize};

/// Largest supported sample width in bytes
pub const MAX_BYTES_PER_PIXEL: u32 = 8;

/// Parsed metadata for a bricked volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMetadata {
    /// Declared lowest resolution level
    pub min_level: i32,

    /// Declared highest resolution level
    pub max_level: i32,

    /// Number of brick entries that must follow
    pub total_bricks: usize,

    /// Width of one sample in bytes
    pub bytes_per_pixel: u32,

    /// Voxel extents of the whole dataset
    pub global_size: [i64; 3],

    /// Byte order tag for multi-byte samples
    pub endianness: String,

    /// Physical voxel spacing per axis
    pub scale: [f32; 3],

    /// Brick entries
    pub bricks: Vec<BrickEntry>,
}

/// One brick as declared in the metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickEntry {
    /// Path relative to the data directory
    pub filename: String,

    /// Edge length in voxels (bricks are cubes)
    pub size: i64,

    /// Origin in voxel-grid coordinates
    pub position: [i64; 3],
}

impl BrickEntry {
    pub fn new(filename: impl Into<String>, size: i64, position: [i64; 3]) -> Self {
        Self {
            filename: filename.into(),
            size,
            position,
        }
    }
}

impl VolumeMetadata {
    /// Create metadata with no bricks
    pub fn new(global_size: [i64; 3], scale: [f32; 3], bytes_per_pixel: u32) -> Self {
        Self {
            min_level: 0,
            max_level: 0,
            total_bricks: 0,
            bytes_per_pixel,
            global_size,
            endianness: String::new(),
            scale,
            bricks: Vec::new(),
        }
    }

    /// Set the declared level bounds
    pub fn with_levels(mut self, min_level: i32, max_level: i32) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    /// Set the endianness tag
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = match endianness {
            Endianness::Unspecified => String::new(),
            other => other.to_string(),
        };
        self
    }

    /// Append a brick and keep `total_bricks` in sync
    pub fn with_brick(mut self, brick: BrickEntry) -> Self {
        self.bricks.push(brick);
        self.total_bricks = self.bricks.len();
        self
    }

    /// Tile the dataset with cubic bricks of `brick_size` voxels.
    ///
    /// Filenames follow `b_<x>_<y>_<z><extension>` using brick grid indices.
    pub fn with_regular_grid(mut self, brick_size: i64, extension: &str) -> Result<Self> {
        if brick_size <= 0 {
            return Err(VolumeError::DegenerateBrick(format!(
                "Brick size must be positive, got {}",
                brick_size
            )));
        }

        let count = self.brick_count(brick_size);
        for z in 0..count[2] {
            for y in 0..count[1] {
                for x in 0..count[0] {
                    self.bricks.push(BrickEntry::new(
                        format!("b_{}_{}_{}{}", x, y, z, extension),
                        brick_size,
                        [x * brick_size, y * brick_size, z * brick_size],
                    ));
                }
            }
        }
        self.total_bricks = self.bricks.len();
        Ok(self)
    }

    /// Number of bricks of `brick_size` needed along each axis
    pub fn brick_count(&self, brick_size: i64) -> [i64; 3] {
        if brick_size <= 0 {
            return [0; 3];
        }
        self.global_size
            .map(|extent| (extent.max(0) + brick_size - 1) / brick_size)
    }

    /// Parse and validate a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        let metadata: Self = serde_json::from_str(text)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Parse and validate a JSON document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let metadata: Self = serde_json::from_slice(bytes)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VolumeError::Configuration(e.to_string()))
    }

    /// Check the constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.total_bricks != self.bricks.len() {
            return Err(VolumeError::MalformedMetadata(format!(
                "totalBricks is {} but {} brick entries are present",
                self.total_bricks,
                self.bricks.len()
            )));
        }

        if self.bytes_per_pixel == 0 || self.bytes_per_pixel > MAX_BYTES_PER_PIXEL {
            return Err(VolumeError::MalformedMetadata(format!(
                "bytesPerPixel must be between 1 and {}, got {}",
                MAX_BYTES_PER_PIXEL, self.bytes_per_pixel
            )));
        }

        if self.min_level > self.max_level {
            return Err(VolumeError::MalformedMetadata(format!(
                "minLevel {} exceeds maxLevel {}",
                self.min_level, self.max_level
            )));
        }

        if let Some(index) = self.bricks.iter().position(|b| b.filename.is_empty()) {
            return Err(VolumeError::MalformedMetadata(format!(
                "Brick {} has an empty filename",
                index
            )));
        }

        Endianness::parse(&self.endianness)?;
        Ok(())
    }

    /// Bits per sample
    pub fn bits_per_pixel(&self) -> u32 {
        self.bytes_per_pixel * 8
    }

    /// Parsed endianness tag
    pub fn endianness(&self) -> Result<Endianness> {
        Endianness::parse(&self.endianness)
    }

    /// Storage tag taken from the first brick's filename
    pub fn brick_data_type(&self) -> BrickDataType {
        self.bricks
            .first()
            .map(|b| BrickDataType::from_filename(&b.filename))
            .unwrap_or_default()
    }
}
