//! Benchmarks for single primitives rendered through a context.
//!
//! Each case is one external input feeding one unit, so the numbers include
//! the per-sample scheduling overhead of the graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_units::{
    dsp::CurveTable,
    units::{Abs, CurveMap, ExternalInput, Filter, GreaterThan, Negate, Selector, Unit},
    Context,
};

use super::ramp;
use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn bench_unit<U: Unit>(c: &mut Criterion, name: &str, build: impl Fn(&mut Context) -> U) {
    let mut group = c.benchmark_group("units/primitives");

    for &size in BLOCK_SIZES {
        let mut ctx = Context::with_sample_rate(SAMPLE_RATE).unwrap();
        let input = ExternalInput::new(&mut ctx);
        let unit = build(&mut ctx);
        input.connect(&mut ctx, &unit).unwrap();
        input.write(&mut ctx, &ramp(size)).unwrap();
        ctx.compile().unwrap();

        group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
            b.iter(|| {
                ctx.render(black_box(size)).unwrap();
                black_box(ctx.read(&unit).unwrap()[size - 1])
            })
        });
    }

    group.finish();
}

pub fn bench_primitives(c: &mut Criterion) {
    bench_unit(c, "abs", Abs::new);
    bench_unit(c, "negate", Negate::new);
    bench_unit(c, "greater_than", |ctx| GreaterThan::new(ctx, 0.0).unwrap());
    bench_unit(c, "curve_map", |ctx| {
        CurveMap::nearest(ctx, CurveTable::linear(1024))
    });
    bench_unit(c, "filter", |ctx| Filter::lowpass(ctx, 1000.0).unwrap());
    bench_unit(c, "selector", |ctx| Selector::new(ctx, 4).unwrap());
}
