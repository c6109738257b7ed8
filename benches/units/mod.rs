//! Unit and composite benchmarks.

mod composites;
mod kernels;
mod primitives;

pub use composites::bench_composites;
pub use kernels::bench_kernels;
pub use primitives::bench_primitives;

/// Sawtooth-like ramp in [-1, 1].
pub fn ramp(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
        .collect()
}
