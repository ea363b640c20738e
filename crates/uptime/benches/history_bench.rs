use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use uptime::{EndpointSpec, FailureDescriptor, HistoryStats, HistoryStore, ProbeOutcome};

fn outcome(spec: &EndpointSpec, i: u64) -> ProbeOutcome {
    if i % 5 == 0 {
        ProbeOutcome::failed(
            spec,
            503,
            Utc::now(),
            Duration::from_millis(i % 300),
            FailureDescriptor::StatusMismatch { got: 503, want: 200 },
        )
    } else {
        ProbeOutcome::success(spec, 200, Utc::now(), Duration::from_millis(i % 300))
    }
}

fn append_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_append");

    // Append cost grows with the window since the record is rewritten whole
    for capacity in [16usize, 48, 256] {
        let store = HistoryStore::open_in_memory(capacity).unwrap();
        let spec = EndpointSpec::new("https://bench.example");
        for i in 0..capacity as u64 {
            store.append(&outcome(&spec, i)).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("full_window", capacity), &capacity, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                black_box(store.append(&outcome(&spec, i)).unwrap())
            });
        });
    }

    group.finish();
}

fn read_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_read");

    let store = HistoryStore::open_in_memory(48).unwrap();
    let spec = EndpointSpec::new("https://bench.example");
    for i in 0..48 {
        store.append(&outcome(&spec, i)).unwrap();
    }

    group.bench_function("read_48", |b| {
        b.iter(|| black_box(store.read(&spec.url).unwrap()))
    });

    group.bench_function("read_and_stats_48", |b| {
        b.iter(|| {
            let history = store.read(&spec.url).unwrap();
            black_box(HistoryStats::from_outcomes(&history))
        })
    });

    group.finish();
}

criterion_group!(benches, append_benchmark, read_benchmark);
criterion_main!(benches);
