//! Benchmarks for event propagation through operator chains
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use listflow::list::{fixed_filter, fixed_order, MutableList, OrderedStore};
use listflow::sync::{NoopMonitor, ReadWriteMonitor, SharedMonitor};
use listflow::{ListMutator, ObservableList, PipelineBuilder, SharedList};
use std::sync::Arc;

fn chain(monitor: SharedMonitor, size: usize) -> (Arc<MutableList<u64>>, SharedList<String>) {
    let builder = PipelineBuilder::new(monitor);
    let source = builder.new_list((0..size as u64).map(|i| i * 7919 % 10_007).collect());
    let tail = builder
        .source(source.clone())
        .filter(fixed_filter(|v: &u64| v % 3 != 0))
        .expect("filter links")
        .order(fixed_order(|a: &u64, b: &u64| a < b))
        .expect("order links")
        .map(|v: &u64| v.to_string())
        .expect("map links")
        .build();
    (source, tail)
}

fn bench_single_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_single_insert");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("locking", size), size, |b, &size| {
            let (source, tail) = chain(ReadWriteMonitor::shared(), size);
            let mut i = 0u64;
            b.iter(|| {
                source.add(black_box(i % 10_007)).expect("add");
                source.remove(source.len() - 1, 1).expect("remove");
                i = i.wrapping_add(1);
            });
            black_box(tail.len());
        });
    }

    group.finish();
}

fn bench_monitor_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("monitor_overhead");
    let size = 1_000;

    for (name, monitor) in [
        ("locking", ReadWriteMonitor::shared()),
        ("noop", NoopMonitor::shared()),
    ] {
        group.bench_function(name, |b| {
            let (source, _tail) = chain(monitor.clone(), size);
            b.iter(|| {
                source.set(black_box(size / 2), 42).expect("set");
            });
        });
    }

    group.finish();
}

fn bench_bulk_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_reset");

    for size in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("reset", size), size, |b, &size| {
            let (source, tail) = chain(ReadWriteMonitor::shared(), size);
            let values: Vec<u64> = (0..size as u64).rev().collect();
            b.iter(|| {
                source.reset(values.clone()).expect("reset");
                black_box(tail.len())
            });
        });
    }

    group.finish();
}

fn bench_store_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_store_move");

    for size in [1_000, 100_000].iter() {
        let mut store: OrderedStore<u64> = (0..*size as u64).collect();
        group.bench_with_input(BenchmarkId::new("move_half", size), size, |b, &size| {
            b.iter(|| {
                store
                    .move_range(0, size / 2, size / 4)
                    .expect("in range");
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_monitor_overhead,
    bench_bulk_reset,
    bench_store_move
);
criterion_main!(benches);
