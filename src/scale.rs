//! Normalization of per-axis voxel spacing

use crate::error::{Result, VolumeError};
use glam::Vec3;

/// Scale the raw spacing so that its smallest component becomes exactly 1.
///
/// Every component is multiplied by `1 / min(raw)`, so the result is never
/// smaller than the input along any axis.
pub fn normalize_scale(raw: [f32; 3]) -> Result<Vec3> {
    for (axis, &component) in raw.iter().enumerate() {
        if !component.is_finite() || component <= 0.0 {
            return Err(VolumeError::InvalidScale(format!(
                "Spacing along axis {} must be positive and finite, got {}",
                axis, component
            )));
        }
    }

    let min_scale = raw.iter().copied().fold(f32::INFINITY, f32::min);
    let inverted_min_scale = 1.0 / min_scale;
    let mut normalized = Vec3::from_array(raw) * inverted_min_scale;

    // x * (1/x) can land one ulp off 1.0
    for (axis, &component) in raw.iter().enumerate() {
        if component == min_scale {
            normalized[axis] = 1.0;
        }
    }

    Ok(normalized)
}
