//! # Pool Churn Benchmark
//!
//! The reason this crate exists: allocate/free of a pooled entry must stay
//! O(1) and heap-free once the first block is carved.
//!
//! Run with: `cargo bench --package reusage_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reusage_core::EntryPool;

/// Entry size typical of a per-session record.
const ENTRY_SIZE: u32 = 64;

/// Churn depth per iteration.
const CHURN: usize = 1024;

/// Benchmark: allocate/free churn against a warmed-up free list.
fn bench_alloc_free_churn(c: &mut Criterion) {
    let mut pool = EntryPool::new();
    let handle = pool.acquire(ENTRY_SIZE).expect("acquire");

    // Warm up one block so the loop never carves.
    let warmup: Vec<_> = (0..CHURN)
        .map(|_| pool.allocate(handle).expect("warmup allocate"))
        .collect();
    for entry in warmup {
        pool.free(handle, entry);
    }

    c.bench_function("alloc_free_churn_1024", |b| {
        b.iter(|| {
            for _ in 0..CHURN {
                let entry = pool.allocate(handle).expect("allocate");
                pool.free(handle, black_box(entry));
            }
        });
    });
}

/// Benchmark: cold carving of fresh entries, block growth included.
fn bench_carve_first_block(c: &mut Criterion) {
    c.bench_function("carve_first_block", |b| {
        b.iter(|| {
            let mut pool = EntryPool::new();
            let handle = pool.acquire(ENTRY_SIZE).expect("acquire");
            for _ in 0..CHURN {
                black_box(pool.allocate(handle).expect("allocate"));
            }
            pool.destroy_all();
        });
    });
}

/// Benchmark: acquiring a handle on an already-registered size class.
fn bench_acquire_existing_class(c: &mut Criterion) {
    let mut pool = EntryPool::new();
    // Populate the registry so the linear scan has work to do.
    for class in 1..=32_u32 {
        pool.acquire(class * 8).expect("acquire class");
    }

    c.bench_function("acquire_existing_class_of_32", |b| {
        b.iter(|| {
            let handle = pool.acquire(black_box(128)).expect("acquire");
            pool.release(handle).expect("release");
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_free_churn,
    bench_carve_first_block,
    bench_acquire_existing_class
);
criterion_main!(benches);
