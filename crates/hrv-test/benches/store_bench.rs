//! Benchmarks for the record store and classifier

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hrv_classify::{classify, Thresholds};
use hrv_core::{ManualClock, TelemetryRecord};
use hrv_store::{format_line, parse_line, MemoryPartitionStorage, RecordStore};
use hrv_test::SimulatedWearable;

const NOW: i64 = 1_700_000_000;

/// A store holding one reading per `step` seconds over the last three days
fn filled_store(step: i64) -> RecordStore {
    let store = RecordStore::new(
        Arc::new(MemoryPartitionStorage::new()),
        Arc::new(ManualClock::new(NOW)),
    );
    let wearable = SimulatedWearable::new();
    let mut ts = NOW - 3 * 24 * 3600;
    while ts <= NOW {
        store.append(&wearable.random_reading(ts as u32)).unwrap();
        ts += step;
    }
    store
}

fn bench_line_format(c: &mut Criterion) {
    let record = TelemetryRecord::new(1_700_000_000, 55.25);
    c.bench_function("line_format", |b| b.iter(|| format_line(black_box(&record))));

    let line = "1700000000 055.25";
    c.bench_function("line_parse", |b| b.iter(|| parse_line(black_box(line))));
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_query_baseline");
    for step in [600, 60] {
        let store = filled_store(step);
        group.bench_with_input(BenchmarkId::from_parameter(step), &store, |b, store| {
            b.iter(|| store.baseline_window().unwrap())
        });
    }
    group.finish();
}

fn bench_append_duplicate(c: &mut Criterion) {
    let store = filled_store(600);
    let record = TelemetryRecord::new((NOW - 600) as u32, 60.0);
    store.append(&record).unwrap();

    c.bench_function("store_append_duplicate", |b| {
        b.iter(|| store.append(black_box(&record)).unwrap())
    });
}

fn bench_classify(c: &mut Criterion) {
    let store = filled_store(60);
    let sample = store.sample_window().unwrap();
    let baseline = store.baseline_window().unwrap();
    let thresholds = Thresholds::default();

    c.bench_function("classify_3d_baseline", |b| {
        b.iter(|| classify(black_box(&sample), black_box(&baseline), &thresholds))
    });
}

criterion_group!(
    benches,
    bench_line_format,
    bench_query,
    bench_append_duplicate,
    bench_classify
);
criterion_main!(benches);
