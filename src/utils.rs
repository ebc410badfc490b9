//! Utility functions

use std::path::{Path, PathBuf};

/// Format byte size in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Resolve a brick filename from the metadata against the data directory.
///
/// Absolute filenames are kept as they are.
pub fn resolve_brick_path(data_path: &Path, filename: &str) -> PathBuf {
    data_path.join(filename)
}

/// Expected payload size of a linear brick, `None` if it does not fit in a `u64`
pub fn linear_brick_bytes(size: i64, bytes_per_pixel: u32) -> Option<u64> {
    (size.max(0) as u64)
        .checked_pow(3)?
        .checked_mul(u64::from(bytes_per_pixel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_resolve_brick_path() {
        let data = Path::new("/data/volume");
        assert_eq!(
            resolve_brick_path(data, "bricks/b_0_0_0.hz"),
            PathBuf::from("/data/volume/bricks/b_0_0_0.hz")
        );
        assert_eq!(resolve_brick_path(data, "/abs/b.raw"), PathBuf::from("/abs/b.raw"));
    }

    #[test]
    fn test_linear_brick_bytes() {
        assert_eq!(linear_brick_bytes(64, 1), Some(262144));
        assert_eq!(linear_brick_bytes(16, 2), Some(8192));
        assert_eq!(linear_brick_bytes(-4, 2), Some(0));
        assert_eq!(linear_brick_bytes(2_000_000, 2), Some(16_000_000_000_000_000_000));
        assert_eq!(linear_brick_bytes(2_000_000, 4), None);
        assert_eq!(linear_brick_bytes(3_000_000, 1), None);
    }
}
