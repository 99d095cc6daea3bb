//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stepflow::config::PoolConfig;
use stepflow::core::Flow;
use stepflow::events::NoOpEventSink;
use stepflow::pipeline::{ConcurrentStage, Pipeline};
use stepflow::pool::build_shared_pool;
use stepflow::steps::FnStep;

fn add(n: u64) -> FnStep<AtomicU64> {
    FnStep::new(format!("add_{n}"), move |ctx: &AtomicU64| {
        ctx.fetch_add(n, Ordering::Relaxed);
        Ok(Flow::Continue)
    })
}

fn pipeline_benchmark(c: &mut Criterion) {
    let sequential = (0..10)
        .fold(Pipeline::new("sequential"), |p, n| p.step(add(n)))
        .with_event_sink(Arc::new(NoOpEventSink));
    c.bench_function("sequential_10_steps", |b| {
        let ctx = AtomicU64::new(0);
        b.iter(|| black_box(sequential.execute(&ctx)))
    });

    let transient = Pipeline::new("transient")
        .step((0..4).fold(ConcurrentStage::new("fan_out", Vec::new()), |s, n| s.step(add(n))))
        .with_event_sink(Arc::new(NoOpEventSink));
    c.bench_function("concurrent_4_steps_transient_pool", |b| {
        let ctx = AtomicU64::new(0);
        b.iter(|| black_box(transient.execute(&ctx)))
    });

    let pool = match build_shared_pool(&PoolConfig::new().with_shared_threads(4)) {
        Ok(pool) => Arc::new(pool),
        Err(err) => panic!("failed to build shared pool: {err}"),
    };
    let shared = Pipeline::new("shared")
        .step(
            (0..4)
                .fold(ConcurrentStage::new("fan_out", Vec::new()), |s, n| s.step(add(n)))
                .with_pool(pool),
        )
        .with_event_sink(Arc::new(NoOpEventSink));
    c.bench_function("concurrent_4_steps_shared_pool", |b| {
        let ctx = AtomicU64::new(0);
        b.iter(|| black_box(shared.execute(&ctx)))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
