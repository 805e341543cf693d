//! Benchmarks for pair registry operations
//!
//! Run with: cargo bench -p pairsync-core
//!
//! These benchmarks establish performance baselines for:
//! - Adding pairs and presence transitions
//! - Single-field permission reconciliation
//! - Direct-pairs view reads (cached and recomputed)
//! - Clearing large registries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pairsync_core::{Identity, PairRegistry, PermissionScope, RawValue, RelationshipStatus};

fn populated(count: usize) -> PairRegistry {
    let registry = PairRegistry::with_defaults();
    for i in 0..count {
        let id = Identity::new(format!("peer{}", i));
        registry.add_or_update(id.clone(), RelationshipStatus::Bidirectional, Default::default());
        registry
            .mark_online(&id, None)
            .expect("pair was just added");
    }
    registry
}

// ============================================================================
// Structural Benchmarks
// ============================================================================

fn bench_add_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_pairs");

    for count in [10, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated(count)))
        });
    }

    group.finish();
}

// ============================================================================
// Reconciliation Benchmarks
// ============================================================================

fn bench_permission_change(c: &mut Criterion) {
    let registry = populated(100);
    let peer = Identity::new("peer42");
    let mut flag = false;

    c.bench_function("permission_change_bool", |b| {
        b.iter(|| {
            flag = !flag;
            black_box(
                registry
                    .apply_permission_change(&peer, PermissionScope::OtherPair, "IsPaused", &RawValue::Bool(flag))
                    .expect("pair exists"),
            )
        })
    });

    c.bench_function("permission_change_ticks", |b| {
        b.iter(|| {
            black_box(
                registry
                    .apply_permission_change(
                        &peer,
                        PermissionScope::OwnPair,
                        "MaxLockTime",
                        &RawValue::UInt(36_000_000_000),
                    )
                    .expect("pair exists"),
            )
        })
    });
}

// ============================================================================
// View Benchmarks
// ============================================================================

fn bench_direct_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_pairs");
    let registry = populated(1000);

    group.bench_function("cached", |b| {
        registry.direct_pairs();
        b.iter(|| black_box(registry.direct_pairs()))
    });

    group.bench_function("recompute", |b| {
        let peer = Identity::new("peer7");
        b.iter(|| {
            registry
                .mark_online(&peer, None)
                .expect("pair exists");
            black_box(registry.direct_pairs())
        })
    });

    group.finish();
}

fn bench_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("clear");

    for count in [100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || populated(count),
                |registry| black_box(registry.clear()),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_pairs,
    bench_permission_change,
    bench_direct_pairs,
    bench_clear
);
criterion_main!(benches);
