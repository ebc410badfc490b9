//! Volume layout - places voxel-space bricks inside the normalized render cube
//!
//! The dataset is centered inside a cube whose edge is its longest voxel
//! extent, then everything is divided by that extent so the cube maps onto
//! `[0, 1]` along the longest axis. Shorter axes end up re-centered, which is
//! what lets non-cubic datasets share one normalization volume.

use crate::error::{Result, VolumeError};
use crate::metadata::BrickEntry;
use glam::Vec3;
use rayon::prelude::*;

/// World-space placement of a single brick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrickPlacement {
    /// Center of the brick
    pub world_center: Vec3,
    /// Bottom, front, left corner
    pub world_min: Vec3,
    /// Top, back, right corner
    pub world_max: Vec3,
}

impl BrickPlacement {
    /// Half of the brick's world-space extent per axis
    pub fn half_extent(&self) -> Vec3 {
        (self.world_max - self.world_min) * 0.5
    }

    /// Check that `min <= center <= max` along every axis
    pub fn is_ordered(&self) -> bool {
        self.world_min.cmple(self.world_center).all() && self.world_center.cmple(self.world_max).all()
    }

    /// Check that the brick lies within `[min, max]` (inclusive, with `epsilon` slack)
    pub fn is_within(&self, min: Vec3, max: Vec3, epsilon: f32) -> bool {
        self.world_min.cmpge(min - Vec3::splat(epsilon)).all()
            && self.world_max.cmple(max + Vec3::splat(epsilon)).all()
    }
}

/// Dataset-wide quantities shared by every brick placement.
///
/// Built once per load; placing a brick only reads from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLayout {
    global_size: [i64; 3],
    scale: Vec3,
    max_global_size: i64,
    dataset_center_offset: Vec3,
}

impl VolumeLayout {
    /// Create a layout from voxel extents and the normalized scale
    pub fn new(global_size: [i64; 3], scale: Vec3) -> Result<Self> {
        let max_global_size = global_size.iter().copied().max().unwrap_or(0);
        if max_global_size <= 0 {
            return Err(VolumeError::DegenerateBrick(format!(
                "Largest global extent must be positive, got {:?}",
                global_size
            )));
        }
        if let Some(axis) = global_size.iter().position(|&extent| extent <= 0) {
            return Err(VolumeError::DegenerateBrick(format!(
                "Global extent along axis {} must be positive, got {:?}",
                axis, global_size
            )));
        }

        let global = to_vec3(global_size);
        let bounding_center = Vec3::splat(max_global_size as f32) * scale / 2.0;
        let dataset_center = global * scale / 2.0;

        Ok(Self {
            global_size,
            scale,
            max_global_size,
            dataset_center_offset: bounding_center - dataset_center,
        })
    }

    /// Voxel extents of the dataset
    pub fn global_size(&self) -> [i64; 3] {
        self.global_size
    }

    /// Normalized per-axis scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Longest voxel extent, the edge of the enclosing cube
    pub fn max_global_size(&self) -> i64 {
        self.max_global_size
    }

    /// Center of the enclosing cube in scaled voxel units
    pub fn bounding_center(&self) -> Vec3 {
        Vec3::splat(self.max_global_size as f32) * self.scale / 2.0
    }

    /// Displacement from the enclosing cube's center to the dataset's center
    pub fn dataset_center_offset(&self) -> Vec3 {
        self.dataset_center_offset
    }

    /// Edge length of a brick of `size` voxels in render space, as used for
    /// uniformly scaling a unit cube to the brick
    pub fn normalized_extent(&self, size: i64) -> f32 {
        size as f32 / self.max_global_size as f32
    }

    /// Place a brick given its grid position and edge length in voxels
    pub fn place(&self, grid_position: [i64; 3], size: i64) -> Result<BrickPlacement> {
        if size <= 0 {
            return Err(VolumeError::DegenerateBrick(format!(
                "Brick size must be positive, got {} at {:?}",
                size, grid_position
            )));
        }

        let max_global_size = self.max_global_size as f32;
        let scaled_brick_position = to_vec3(grid_position) * self.scale;
        let position_in_enclosing_cube = self.dataset_center_offset + scaled_brick_position;
        let brick_half_extent = Vec3::splat(size as f32) * self.scale / 2.0;

        let world_center = (position_in_enclosing_cube + brick_half_extent) / max_global_size;
        let world_half_extent = brick_half_extent / max_global_size;

        Ok(BrickPlacement {
            world_center,
            world_min: world_center - world_half_extent,
            world_max: world_center + world_half_extent,
        })
    }

    /// Place a declared brick entry
    pub fn place_entry(&self, entry: &BrickEntry) -> Result<BrickPlacement> {
        self.place(entry.position, entry.size)
    }

    /// Place every entry in parallel, preserving order
    pub fn place_all(&self, entries: &[BrickEntry]) -> Result<Vec<BrickPlacement>> {
        entries
            .par_iter()
            .map(|entry| self.place_entry(entry))
            .collect()
    }

    /// Check if a voxel-space brick stays within the dataset extents
    pub fn is_in_bounds(&self, grid_position: [i64; 3], size: i64) -> bool {
        grid_position
            .iter()
            .zip(self.global_size.iter())
            .all(|(&origin, &extent)| origin >= 0 && origin + size <= extent)
    }
}

fn to_vec3(v: [i64; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}
