use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use cyclestat::stats::{compute, percentiles};
use cyclestat::{SampleStore, SampleStoreOptions, report};
use std::hint::black_box;

const CAPACITY: usize = 1 << 20;

fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");
    let mut store = SampleStore::new(SampleStoreOptions::new(2, CAPACITY, 0));
    store.calibrate(100_000);

    group.throughput(Throughput::Elements(1));
    group.bench_function("begin_end", |b| {
        let mut entry = 0;
        b.iter(|| {
            store.begin(0);
            store.end(0, entry);
            entry = (entry + 1) % CAPACITY;
        });
    });
    println!("begin_end self-timing:\n{}", report::format_stats(&store.compute(0, CAPACITY)));

    group.bench_function("capture_closure", |b| {
        let channel = store.channel_mut(1);
        let mut entry = 0;
        b.iter(|| {
            channel.capture(entry, || black_box(entry));
            entry = (entry + 1) % CAPACITY;
        });
    });

    group.finish();
}

fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");
    let samples: Vec<u64> = (0..100_000u64).map(|i| 20 + (i * 7919) % 13).collect();

    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("compute_100k", |b| {
        b.iter(|| black_box(compute(black_box(&samples))));
    });
    group.bench_function("percentiles_100k", |b| {
        b.iter(|| black_box(percentiles(black_box(&samples))));
    });

    group.finish();
}

criterion_group!(benches, bench_capture, bench_stats);
criterion_main!(benches);
