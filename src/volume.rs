//! The in-memory volume model and the summary records handed to a renderer

use crate::config::LoadOptions;
use crate::error::{Result, VolumeError};
use crate::io::BrickRequest;
use crate::layout::{BrickPlacement, VolumeLayout};
use crate::metadata::VolumeMetadata;
use crate::resolution::max_z_level;
use crate::scale::normalize_scale;
use crate::types::{BrickDataType, Endianness};
use crate::utils::{format_bytes, linear_brick_bytes, resolve_brick_path};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A cubic brick placed in render space
#[derive(Debug, Clone, PartialEq)]
pub struct Brick {
    /// Resolved path of the brick payload
    pub filename: PathBuf,
    /// Edge length in voxels
    pub size: i64,
    /// Origin in voxel-grid coordinates, as declared
    pub grid_position: [i64; 3],
    /// Center in normalized world space
    pub world_center: Vec3,
    /// Bottom, front, left corner in normalized world space
    pub world_min: Vec3,
    /// Top, back, right corner in normalized world space
    pub world_max: Vec3,
    /// Uniform edge length of the brick in render space (`size / max_global_size`)
    pub normalized_extent: f32,
    /// Deepest resolution level stored in the brick
    pub max_z_level: u32,
}

impl Brick {
    pub fn placement(&self) -> BrickPlacement {
        BrickPlacement {
            world_center: self.world_center,
            world_min: self.world_min,
            world_max: self.world_max,
        }
    }

    /// Number of voxels in the brick, saturating at `u64::MAX`
    pub fn voxel_count(&self) -> u64 {
        (self.size.max(0) as u64).saturating_pow(3)
    }
}

/// Compact description of a volume for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetaVolumeSummary {
    pub position: Vec3,
    pub box_min: Vec3,
    pub box_max: Vec3,
    pub scale: Vec3,
    pub num_bricks: usize,
    pub num_bits: u32,
    pub is_curve_encoded: bool,
    pub max_global_size: i64,
}

impl MetaVolumeSummary {
    /// Pack into the uniform-buffer layout
    pub fn to_gpu(&self) -> GpuMetaVolume {
        GpuMetaVolume {
            position: self.position.to_array(),
            num_bricks: u32::try_from(self.num_bricks).unwrap_or(u32::MAX),
            box_min: self.box_min.to_array(),
            num_bits: self.num_bits,
            box_max: self.box_max.to_array(),
            is_curve_encoded: u32::from(self.is_curve_encoded),
            scale: self.scale.to_array(),
            max_global_size: u32::try_from(self.max_global_size).unwrap_or(u32::MAX),
        }
    }
}

/// `MetaVolumeSummary` laid out for a uniform buffer.
///
/// Every vec3 is followed by a 32-bit scalar so the struct matches std140 and
/// WGSL uniform alignment without explicit padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMetaVolume {
    pub position: [f32; 3],
    pub num_bricks: u32,
    pub box_min: [f32; 3],
    pub num_bits: u32,
    pub box_max: [f32; 3],
    pub is_curve_encoded: u32,
    pub scale: [f32; 3],
    pub max_global_size: u32,
}

impl GpuMetaVolume {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// A fully loaded volume.
///
/// Only constructed once every brick is placed and its depth is known; it is
/// never modified afterwards.
#[derive(Debug, Clone)]
pub struct VolumeDataset {
    data_path: PathBuf,
    global_size: [i64; 3],
    bytes_per_pixel: u32,
    min_level: i32,
    max_level: i32,
    max_z_level: u32,
    scale_raw: [f32; 3],
    scale: Vec3,
    endianness: Endianness,
    brick_data_type: BrickDataType,
    curve_encoded: bool,
    position: Vec3,
    box_min: Vec3,
    box_max: Vec3,
    layout: VolumeLayout,
    bricks: Vec<Brick>,
}

/// A dataset whose bricks are placed but whose depths are still pending
#[derive(Debug)]
pub(crate) struct PlacedVolume {
    dataset: VolumeDataset,
}

impl PlacedVolume {
    /// Normalize the scale and place every brick
    pub(crate) fn place(
        data_path: &Path,
        metadata: &VolumeMetadata,
        options: &LoadOptions,
    ) -> Result<Self> {
        metadata.validate()?;
        let endianness = metadata.endianness()?;
        let brick_data_type = metadata.brick_data_type();
        let curve_encoded = brick_data_type.is_curve_encoded(&options.curve_extension);
        log::info!(
            "Volume detected as {} type ({})",
            brick_data_type,
            if curve_encoded { "curve-encoded" } else { "linear" }
        );

        if metadata.bytes_per_pixel > 1 && !endianness.is_specified() {
            log::warn!(
                "{} bytes per pixel but no endianness tag; sample byte order is undefined",
                metadata.bytes_per_pixel
            );
        }

        if metadata.bits_per_pixel() > 32 {
            log::warn!(
                "{} bits per pixel exceeds what GPU sampling paths usually support",
                metadata.bits_per_pixel()
            );
        }

        let scale = normalize_scale(metadata.scale)?;
        let layout = VolumeLayout::new(metadata.global_size, scale)?;
        log::debug!(
            "Normalized scale {:?} -> {:?}, max global size {}",
            metadata.scale,
            scale,
            layout.max_global_size()
        );

        if let Some(entry) = metadata
            .bricks
            .iter()
            .find(|entry| linear_brick_bytes(entry.size, metadata.bytes_per_pixel).is_none())
        {
            return Err(VolumeError::DegenerateBrick(format!(
                "Brick {} of size {} is too large to address ({} bytes per pixel)",
                entry.filename, entry.size, metadata.bytes_per_pixel
            )));
        }

        let placements = layout.place_all(&metadata.bricks)?;
        let bricks: Vec<Brick> = metadata
            .bricks
            .iter()
            .zip(placements)
            .map(|(entry, placement)| {
                log::trace!(
                    "Placed {} at {:?} -> center {:?}",
                    entry.filename,
                    entry.position,
                    placement.world_center
                );
                Brick {
                    filename: resolve_brick_path(data_path, &entry.filename),
                    size: entry.size,
                    grid_position: entry.position,
                    world_center: placement.world_center,
                    world_min: placement.world_min,
                    world_max: placement.world_max,
                    normalized_extent: layout.normalized_extent(entry.size),
                    max_z_level: 0,
                }
            })
            .collect();

        Ok(Self {
            dataset: VolumeDataset {
                data_path: data_path.to_path_buf(),
                global_size: metadata.global_size,
                bytes_per_pixel: metadata.bytes_per_pixel,
                min_level: metadata.min_level,
                max_level: metadata.max_level,
                max_z_level: 0,
                scale_raw: metadata.scale,
                scale,
                endianness,
                brick_data_type,
                curve_encoded,
                position: Vec3::splat(0.5) * scale,
                box_min: Vec3::ZERO,
                box_max: scale,
                layout,
                bricks,
            },
        })
    }

    /// Depth queries for every brick, in brick order
    pub(crate) fn brick_requests(&self) -> Vec<BrickRequest<'_>> {
        self.dataset
            .bricks
            .iter()
            .map(|brick| BrickRequest {
                filename: &brick.filename,
                size: brick.size,
                bytes_per_pixel: self.dataset.bytes_per_pixel,
                curve_encoded: self.dataset.curve_encoded,
            })
            .collect()
    }

    /// Attach per-brick depths and reduce them to the dataset maximum
    pub(crate) fn finish(mut self, levels: &[u32]) -> Result<VolumeDataset> {
        let dataset = &mut self.dataset;
        if levels.len() != dataset.bricks.len() {
            return Err(VolumeError::InvalidState(format!(
                "Expected {} brick levels, got {}",
                dataset.bricks.len(),
                levels.len()
            )));
        }

        for (brick, &level) in dataset.bricks.iter_mut().zip(levels) {
            brick.max_z_level = level;
        }
        dataset.max_z_level = max_z_level(levels.iter().copied());

        if dataset.curve_encoded && i64::from(dataset.max_z_level) > i64::from(dataset.max_level) {
            log::warn!(
                "Bricks reach Z level {} but metadata declares maxLevel {}",
                dataset.max_z_level,
                dataset.max_level
            );
        }

        Ok(self.dataset)
    }
}

impl VolumeDataset {
    /// Build a dataset from parsed metadata and already known brick depths.
    ///
    /// `levels` holds one depth per brick entry, in document order.
    pub fn from_metadata(
        data_path: impl AsRef<Path>,
        metadata: &VolumeMetadata,
        options: &LoadOptions,
        levels: &[u32],
    ) -> Result<Self> {
        PlacedVolume::place(data_path.as_ref(), metadata, options)?.finish(levels)
    }

    /// Project the renderer-facing summary
    pub fn summary(&self) -> MetaVolumeSummary {
        MetaVolumeSummary {
            position: self.position,
            box_min: self.box_min,
            box_max: self.box_max,
            scale: self.scale,
            num_bricks: self.bricks.len(),
            num_bits: self.bits_per_pixel(),
            is_curve_encoded: self.curve_encoded,
            max_global_size: self.layout.max_global_size(),
        }
    }

    /// Largest representable sample value, `2^bits - 1`
    pub fn isovalue_range(&self) -> u64 {
        let bits = self.bits_per_pixel();
        if bits >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    pub fn bricks(&self) -> &[Brick] {
        &self.bricks
    }

    pub fn total_bricks(&self) -> usize {
        self.bricks.len()
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn global_size(&self) -> [i64; 3] {
        self.global_size
    }

    pub fn max_global_size(&self) -> i64 {
        self.layout.max_global_size()
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bytes_per_pixel * 8
    }

    pub fn min_level(&self) -> i32 {
        self.min_level
    }

    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    /// Deepest resolution level over all bricks
    pub fn max_z_level(&self) -> u32 {
        self.max_z_level
    }

    /// Spacing as declared in the metadata
    pub fn scale_raw(&self) -> [f32; 3] {
        self.scale_raw
    }

    /// Spacing normalized so its smallest component is 1
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn brick_data_type(&self) -> &BrickDataType {
        &self.brick_data_type
    }

    pub fn is_curve_encoded(&self) -> bool {
        self.curve_encoded
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn box_min(&self) -> Vec3 {
        self.box_min
    }

    pub fn box_max(&self) -> Vec3 {
        self.box_max
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    /// Uncompressed payload size of all bricks in bytes, saturating at `u64::MAX`
    pub fn total_size_bytes(&self) -> u64 {
        self.bricks
            .iter()
            .map(|b| linear_brick_bytes(b.size, self.bytes_per_pixel).unwrap_or(u64::MAX))
            .fold(0, u64::saturating_add)
    }

    /// Get a summary string of the dataset
    pub fn summary_line(&self) -> String {
        let size_str = self
            .global_size
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" x ");

        format!(
            "{} volume: {} bricks ({}), {} bits, max Z level {}, {} uncompressed",
            size_str,
            self.bricks.len(),
            self.brick_data_type,
            self.bits_per_pixel(),
            self.max_z_level,
            format_bytes(self.total_size_bytes())
        )
    }
}
