//! Benchmarks for composites.
//!
//! A bank of followers models per-band envelope tracking, where one input
//! fans out to many detectors.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_units::{
    units::{ExternalInput, Unit},
    Context, Follower, Max,
};

use super::ramp;
use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_composites(c: &mut Criterion) {
    let mut group = c.benchmark_group("composites");

    for &size in BLOCK_SIZES {
        // Single follower
        let mut ctx = Context::with_sample_rate(SAMPLE_RATE).unwrap();
        let input = ExternalInput::new(&mut ctx);
        let follower = Follower::new(&mut ctx).unwrap();
        input.connect(&mut ctx, &follower).unwrap();
        input.write(&mut ctx, &ramp(size)).unwrap();
        ctx.compile().unwrap();

        group.bench_with_input(BenchmarkId::new("follower", size), &size, |b, &size| {
            b.iter(|| {
                ctx.render(black_box(size)).unwrap();
                black_box(ctx.read(&follower).unwrap()[size - 1])
            })
        });

        // Follower into a floor
        let mut ctx = Context::with_sample_rate(SAMPLE_RATE).unwrap();
        let input = ExternalInput::new(&mut ctx);
        let follower = Follower::new(&mut ctx).unwrap();
        let floor = Max::new(&mut ctx, 0.1).unwrap();
        saavy_units::chain(&mut ctx, &[&input, &follower, &floor]).unwrap();
        input.write(&mut ctx, &ramp(size)).unwrap();
        ctx.compile().unwrap();

        group.bench_with_input(
            BenchmarkId::new("follower_max", size),
            &size,
            |b, &size| {
                b.iter(|| {
                    ctx.render(black_box(size)).unwrap();
                    black_box(ctx.read(&floor).unwrap()[size - 1])
                })
            },
        );

        // Bank of 8 followers on one input
        let mut ctx = Context::with_sample_rate(SAMPLE_RATE).unwrap();
        let input = ExternalInput::new(&mut ctx);
        let bank: Vec<Follower> = (0..8)
            .map(|i| {
                let release = 0.05 * (i + 1) as f32;
                Follower::with_times(&mut ctx, 0.005, release).unwrap()
            })
            .collect();
        for follower in &bank {
            input.connect(&mut ctx, follower).unwrap();
        }
        input.write(&mut ctx, &ramp(size)).unwrap();
        ctx.compile().unwrap();

        group.bench_with_input(
            BenchmarkId::new("follower_bank_8", size),
            &size,
            |b, &size| {
                b.iter(|| {
                    ctx.render(black_box(size)).unwrap();
                    black_box(ctx.read(&bank[7]).unwrap()[size - 1])
                })
            },
        );
    }

    group.finish();
}
