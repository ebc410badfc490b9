//! Example: load a bricked volume and print what a renderer would receive
//!
//! Run with: cargo run --example load_volume [DATA_DIR]
//!
//! Without a data directory a small curve-encoded volume is generated in a
//! temporary directory first. Set `RUST_LOG=debug` to follow the load.

use anyhow::Context;
use brickvol::{Endianness, VolumeHandle, VolumeMetadata};
use std::path::PathBuf;

fn generate_volume(dir: &std::path::Path) -> anyhow::Result<()> {
    let metadata = VolumeMetadata::new([256, 256, 128], [0.8, 0.8, 1.6], 2)
        .with_levels(0, 15)
        .with_endianness(Endianness::Little)
        .with_regular_grid(32, ".hz")?;

    std::fs::write(dir.join("metadata.json"), metadata.to_json_pretty()?)?;
    for brick in &metadata.bricks {
        std::fs::write(dir.join(&brick.filename), vec![0u8; 32 * 32 * 32 * 2])?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let temp_dir = tempfile::TempDir::new()?;
    let data_dir = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            generate_volume(temp_dir.path()).context("generating sample volume")?;
            temp_dir.path().to_path_buf()
        }
    };

    let handle = VolumeHandle::filesystem();
    let dataset = handle
        .load(&data_dir)
        .await
        .with_context(|| format!("loading {}", data_dir.display()))?;

    println!("{}", dataset.summary_line());
    println!("Normalized scale: {:?}", dataset.scale());
    println!("Isovalue range:   0..={}", handle.isovalue_range()?);
    println!();

    let summary = handle.summary()?;
    println!("Summary record:");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("GPU record: {} bytes", summary.to_gpu().as_bytes().len());
    println!();

    println!("First bricks:");
    for brick in dataset.bricks().iter().take(4) {
        println!(
            "  {:<12} z-level {:>2}  min {:?}  max {:?}",
            brick
                .filename
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?"),
            brick.max_z_level,
            brick.world_min,
            brick.world_max
        );
    }

    Ok(())
}
