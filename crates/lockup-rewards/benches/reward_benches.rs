//! Criterion benchmarks for reward evaluation.
//!
//! Covers: linear accrual, tier scans of growing length, and a custom formula.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use lockup_core::traits::RewardCalculator;
use lockup_rewards::{CustomFormula, RewardStrategy, StrategyEvaluator, Tier};

fn bench_linear(c: &mut Criterion) {
    let e = StrategyEvaluator::new(RewardStrategy::Linear { rate: 0.5 }).unwrap();
    c.bench_function("linear_claimable", |b| {
        b.iter(|| e.claimable(black_box(5_000_000), black_box(12.75), black_box(100)))
    });
}

fn bench_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiered_claimable");
    for n in [4usize, 64, 1024] {
        let tiers = (0..n).map(|i| Tier::new(i as f64, i as f64 * 1.5)).collect();
        let e = StrategyEvaluator::new(RewardStrategy::Tiered { tiers }).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| e.claimable(black_box(3), black_box(n as f64 / 2.0), black_box(0)))
        });
    }
    group.finish();
}

fn bench_custom(c: &mut Criterion) {
    let e = StrategyEvaluator::new(RewardStrategy::Custom {
        formula: CustomFormula::Logarithmic { coefficient: 2.0 },
    })
    .unwrap();
    c.bench_function("custom_logarithmic_claimable", |b| {
        b.iter(|| e.claimable(black_box(1_000), black_box(90.0), black_box(0)))
    });
}

criterion_group!(benches, bench_linear, bench_tiers, bench_custom);
criterion_main!(benches);
