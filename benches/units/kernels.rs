//! Benchmarks for the one-pole filter and curve lookup on their own.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_units::dsp::{CurveSampling, CurveTable, OnePole, CURVE_LENGTH};

use super::ramp;
use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/kernels");

    for &size in BLOCK_SIZES {
        let input = ramp(size);

        let mut filter = OnePole::lowpass();
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(1000.0), SAMPLE_RATE);
            })
        });

        let mut filter = OnePole::highpass();
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("highpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(1000.0), SAMPLE_RATE);
            })
        });

        let table = CurveTable::from_fn(CURVE_LENGTH, |x| x * x);
        for (name, sampling) in [
            ("curve_nearest", CurveSampling::Nearest),
            ("curve_linear", CurveSampling::Linear),
        ] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for &x in &input {
                        sum += table.sample(black_box(x), sampling);
                    }
                    black_box(sum)
                })
            });
        }
    }

    group.finish();
}
