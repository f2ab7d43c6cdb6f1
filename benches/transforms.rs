//! Transform benchmarks on random sparse instances.
//!
//! Run with:
//! ```bash
//! cargo bench --bench transforms
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_bigint::BigInt;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use qubo_ops::constrain::{constrain, ConstrainParams};
use qubo_ops::duplicate::{duplicate, DuplicateParams, DuplicationGroup};
use qubo_ops::flip::{flip, FlipParams};
use qubo_ops::qubo::Qubo;
use qubo_ops::record;
use qubo_ops::reduce::{reduce, ReduceParams};
use qubo_ops::select::Amount;
use qubo_ops::shuffle::{shuffle, ShuffleParams};
use qubo_ops::solution::Solution;

/// Random instance with about `degree` neighbors per bit.
fn random_instance(seed: u64, nbit: usize, degree: usize) -> (Qubo, Solution) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut q = Qubo::new(nbit);
    for i in 0..nbit {
        q.set(i, i, rng.random_range(-100..=100i64));
        for _ in 0..degree / 2 {
            let j = rng.random_range(0..nbit);
            if j != i {
                q.accumulate(i, j, rng.random_range(-100..=100i64));
            }
        }
    }
    let bits = (0..nbit).map(|_| rng.random_range(0..2u8)).collect();
    (q, Solution::new(bits))
}

const SIZES: [usize; 3] = [1_000, 10_000, 50_000];

// ============================================================================
// Benchmark: Flip and Shuffle
// ============================================================================

fn bench_flip(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/flip");
    for nbit in SIZES {
        let (q, s) = random_instance(42, nbit, 8);
        let params = FlipParams {
            amount: Amount::Fraction(0.5),
            seed: 1,
        };
        group.throughput(Throughput::Elements(q.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nbit), &q, |b, q| {
            b.iter(|| flip(q, Some(&s), &params))
        });
    }
    group.finish();
}

fn bench_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/shuffle");
    for nbit in SIZES {
        let (q, _) = random_instance(42, nbit, 8);
        let params = ShuffleParams { seed: 1 };
        group.throughput(Throughput::Elements(q.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nbit), &q, |b, q| {
            b.iter(|| shuffle(q, None, &params))
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Duplication
// ============================================================================

fn bench_duplicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/duplicate");
    for replicas in [2, 3, 5] {
        let (q, s) = random_instance(42, 10_000, 8);
        let params = DuplicateParams {
            groups: vec![DuplicationGroup {
                amount: Amount::Fraction(0.1),
                replicas,
            }],
            penalty: None,
            seed: 1,
        };
        group.bench_with_input(BenchmarkId::new("replicas", replicas), &q, |b, q| {
            b.iter(|| duplicate(q, Some(&s), &params))
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Reduction and Constraints
// ============================================================================

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/reduce");
    for nbit in SIZES {
        let (q, s) = random_instance(42, nbit, 8);
        let params = ReduceParams {
            count: nbit / 10,
            mixed: nbit / 40,
            reserved: Vec::new(),
            seed: 1,
        };
        group.bench_with_input(BenchmarkId::from_parameter(nbit), &q, |b, q| {
            b.iter(|| reduce(q, &s, &params))
        });
    }
    group.finish();
}

fn bench_constrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/constrain");
    for nbit in SIZES {
        let (q, s) = random_instance(42, nbit, 8);
        let params = ConstrainParams {
            count: nbit / 20,
            size: 4,
            penalty: BigInt::from(1000),
            seed: 1,
        };
        group.bench_with_input(BenchmarkId::from_parameter(nbit), &q, |b, q| {
            b.iter(|| constrain(q, &s, &params))
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Serialization
// ============================================================================

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    let (q, _) = random_instance(42, 10_000, 8);
    let text = record::to_string(&serde_json::json!({
        "nbit": q.nbit(),
        "qubo": record::qubo_value(&q),
    }))
    .unwrap();
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("parse", |b| b.iter(|| record::parse_instance(&text)));
    group.bench_function("write", |b| b.iter(|| record::to_string(&record::qubo_value(&q))));
    group.finish();
}

criterion_group!(
    benches,
    bench_flip,
    bench_shuffle,
    bench_duplicate,
    bench_reduce,
    bench_constrain,
    bench_record
);
criterion_main!(benches);
