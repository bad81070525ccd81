use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use linked_bptree::BPlusTreeSet;
use std::collections::BTreeSet;
use std::hint::black_box;

const N: usize = 10_000;

/// Orders compared against `BTreeSet`: the CLI default and two wider nodes.
const ORDERS: [usize; 3] = [4, 16, 64];

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

fn sequential(keys: &[i64], order: usize) -> BPlusTreeSet<i64> {
    let mut set = BPlusTreeSet::with_order(order).unwrap();
    set.initialize(keys.iter().copied());
    set
}

// ─── Insert ─────────────────────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion, name: &str, keys: &[i64]) {
    let mut group = c.benchmark_group(name);

    for order in ORDERS {
        group.bench_function(BenchmarkId::new("BPlusTreeSet", order), |b| {
            b.iter(|| sequential(keys, order));
        });
    }

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| keys.iter().copied().collect::<BTreeSet<i64>>());
    });

    group.finish();
}

fn bench_insert_ordered(c: &mut Criterion) {
    bench_insert(c, "insert_ordered", &ordered_keys(N));
}

fn bench_insert_random(c: &mut Criterion) {
    bench_insert(c, "insert_random", &random_keys(N));
}

// ─── Bulk load ──────────────────────────────────────────────────────────────

fn bench_bulk_load_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("bulk_load_random");

    for order in ORDERS {
        group.bench_function(BenchmarkId::new("BPlusTreeSet", order), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut set = BPlusTreeSet::with_order(order).unwrap();
                    set.bulk_load(keys).unwrap();
                    set
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || {
                let mut keys = keys.clone();
                keys.sort_unstable();
                keys
            },
            |keys| keys.into_iter().collect::<BTreeSet<i64>>(),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ─── Find ───────────────────────────────────────────────────────────────────

fn bench_find_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("find_random");

    for order in ORDERS {
        let set = sequential(&keys, order);
        group.bench_function(BenchmarkId::new("BPlusTreeSet", order), |b| {
            b.iter(|| keys.iter().filter(|k| set.find(black_box(k))).count());
        });
    }

    let set: BTreeSet<i64> = keys.iter().copied().collect();
    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| keys.iter().filter(|k| set.contains(black_box(k))).count());
    });

    group.finish();
}

// ─── Delete ─────────────────────────────────────────────────────────────────

fn bench_delete(c: &mut Criterion, name: &str, keys: &[i64]) {
    let mut group = c.benchmark_group(name);

    for order in ORDERS {
        group.bench_function(BenchmarkId::new("BPlusTreeSet", order), |b| {
            b.iter_batched(
                || sequential(keys, order),
                |mut set| {
                    for k in keys {
                        let _ = set.delete(k);
                    }
                    set
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || keys.iter().copied().collect::<BTreeSet<i64>>(),
            |mut set| {
                for k in keys {
                    set.remove(k);
                }
                set
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_delete_ordered(c: &mut Criterion) {
    bench_delete(c, "delete_ordered", &ordered_keys(N));
}

fn bench_delete_random(c: &mut Criterion) {
    bench_delete(c, "delete_random", &random_keys(N));
}

// ─── Criterion Groups ───────────────────────────────────────────────────────

criterion_group!(insert_benches, bench_insert_ordered, bench_insert_random, bench_bulk_load_random);

criterion_group!(find_benches, bench_find_random);

criterion_group!(delete_benches, bench_delete_ordered, bench_delete_random);

criterion_main!(insert_benches, find_benches, delete_benches);
