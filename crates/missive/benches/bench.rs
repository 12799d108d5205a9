use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use missive::{MemoryStore, MessageStore, RedbStore, list_page, pages};
use std::time::Instant;
use tempfile::TempDir;

// Records created per benchmark iteration.
const TOTAL_RECORDS: usize = 1024;

// Records seeded before read-side benchmarks.
const SEEDED_RECORDS: usize = 10_000;

fn seed<S: MessageStore>(store: &S, count: usize) {
    for i in 0..count {
        store.create(&format!("message number {i}")).unwrap();
    }
}

/// Benchmarks sequential creates against a fresh store per iteration.
fn bench_create<S: MessageStore>(
    c: &mut Criterion,
    group_name: &str,
    mut store_factory: impl FnMut() -> S,
) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_RECORDS as u64));
    group.sample_size(10);

    group.bench_function(format!("create/{TOTAL_RECORDS}"), |b| {
        b.iter_custom(|iters| {
            let mut elapsed = core::time::Duration::ZERO;
            for _ in 0..iters {
                let store = store_factory();
                let start = Instant::now();
                for _ in 0..TOTAL_RECORDS {
                    black_box(store.create("a man a plan a canal panama").unwrap());
                }
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.finish();
}

/// Benchmarks point reads and page walks over a pre-seeded store.
fn bench_reads<S: MessageStore>(c: &mut Criterion, group_name: &str, store: &S) {
    seed(store, SEEDED_RECORDS);

    let mut group = c.benchmark_group(group_name);

    group.throughput(Throughput::Elements(1));
    group.bench_function("get", |b| {
        let mut id = 0;
        b.iter(|| {
            id = id % SEEDED_RECORDS as u64 + 1;
            black_box(store.get(id).unwrap())
        });
    });

    for limit in [20, 100] {
        group.throughput(Throughput::Elements(limit as u64));
        group.bench_function(format!("list_page/{limit}"), |b| {
            b.iter(|| black_box(list_page(store, limit, SEEDED_RECORDS as u64 / 2).unwrap()));
        });
    }

    group.throughput(Throughput::Elements(SEEDED_RECORDS as u64));
    group.bench_function("walk_all/100", |b| {
        b.iter(|| {
            for page in pages(store, 100) {
                black_box(page.unwrap());
            }
        });
    });

    group.finish();
}

fn benchmark_memory(c: &mut Criterion) {
    bench_create(c, "memory", MemoryStore::new);
    bench_reads(c, "memory/reads", &MemoryStore::new());
}

fn benchmark_redb(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut round = 0;
    let path = dir.path().to_path_buf();
    bench_create(c, "redb", || {
        round += 1;
        RedbStore::open(path.join(format!("create-{round}.redb"))).unwrap()
    });

    let store = RedbStore::open(dir.path().join("reads.redb")).unwrap();
    bench_reads(c, "redb/reads", &store);
}

criterion_group!(benches, benchmark_memory, benchmark_redb);
criterion_main!(benches);
