use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use brickvol::{normalize_scale, LoadOptions, VolumeDataset, VolumeLayout, VolumeMetadata};

fn grid_metadata(brick_size: i64) -> VolumeMetadata {
    VolumeMetadata::new([1024, 1024, 512], [0.7, 0.7, 1.4], 1)
        .with_regular_grid(brick_size, ".hz")
        .expect("regular grid")
}

fn bench_place_all_32(c: &mut Criterion) {
    let metadata = grid_metadata(32);
    let scale = normalize_scale(metadata.scale).expect("scale");
    let layout = VolumeLayout::new(metadata.global_size, scale).expect("layout");

    c.bench_function("place_all_16k_bricks", |b| {
        b.iter(|| layout.place_all(black_box(&metadata.bricks)))
    });
}

fn bench_from_metadata_64(c: &mut Criterion) {
    let metadata = grid_metadata(64);
    let levels = vec![18; metadata.bricks.len()];
    let options = LoadOptions::default();

    c.bench_function("dataset_from_metadata_2k_bricks", |b| {
        b.iter(|| {
            VolumeDataset::from_metadata("/data", black_box(&metadata), &options, &levels)
        })
    });
}

criterion_group!(benches, bench_place_all_32, bench_from_metadata_64);
criterion_main!(benches);
