//! Resolution (Z-) levels of curve-encoded bricks

/// Deepest level across a set of brick-local depths; zero when there are none
pub fn max_z_level<I>(levels: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    levels.into_iter().max().unwrap_or(0)
}

/// Deepest level of a hierarchical Z order stream holding `samples` samples.
///
/// Level `k` of the stream ends at sample `2^k`, so a stream of `n` samples
/// reaches level `floor(log2(n))`. An empty stream has depth 0.
pub fn levels_for_samples(samples: u64) -> u32 {
    if samples == 0 {
        0
    } else {
        63 - samples.leading_zeros()
    }
}

/// Deepest level of a complete cubic brick with `size` voxels per edge
pub fn levels_for_brick_size(size: u64) -> u32 {
    levels_for_samples(size.saturating_pow(3))
}
