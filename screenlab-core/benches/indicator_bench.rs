//! Criterion benchmarks for the calculator hot paths.
//!
//! Benchmarks:
//! 1. Per-calculator cost over a year and a decade of daily bars
//! 2. Full default plan for one symbol (compute + snapshot + evaluate)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use screenlab_core::indicators::{macd_of_series, rsi_of_series, sma_of_series};
use screenlab_core::{
    evaluate, Criteria, IndicatorSettings, IndicatorValues, MaCheck, PriceBar, PriceSeries,
    RsiCondition, SnapshotPlan,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01)
        .collect()
}

fn make_series(n: usize) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let bars = make_closes(n)
        .into_iter()
        .enumerate()
        .map(|(i, close)| PriceBar {
            date: base + chrono::Duration::days(i as i64),
            open: close - 0.3,
            high: close + 1.5,
            low: close - 1.5,
            close,
            adj_close: close,
            volume: 1_000_000 + (i as u64 % 500_000),
        })
        .collect();
    PriceSeries::new("BENCH", bars).unwrap()
}

// ── 1. Calculators ───────────────────────────────────────────────────

fn bench_calculators(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculators");
    for n in [252usize, 2520] {
        let closes = make_closes(n);
        group.bench_with_input(BenchmarkId::new("rsi14", n), &closes, |b, closes| {
            b.iter(|| rsi_of_series(black_box(closes), 14))
        });
        group.bench_with_input(BenchmarkId::new("macd", n), &closes, |b, closes| {
            b.iter(|| macd_of_series(black_box(closes), 12, 26, 9))
        });
        group.bench_with_input(BenchmarkId::new("sma200", n), &closes, |b, closes| {
            b.iter(|| sma_of_series(black_box(closes), 200))
        });
    }
    group.finish();
}

// ── 2. One symbol end to end ─────────────────────────────────────────

fn bench_symbol(c: &mut Criterion) {
    let series = make_series(252);
    let settings = IndicatorSettings::default();
    let criteria = Criteria::default()
        .with_rsi(RsiCondition::below(30.0))
        .with_ma(MaCheck::MaAbove(50, 200));
    let plan = SnapshotPlan::for_criteria(&criteria, &settings, true);

    c.bench_function("screen_one_symbol", |b| {
        b.iter(|| {
            let mut values = IndicatorValues::new();
            for spec in plan.specs_to_compute() {
                spec.compute(series.bars()).store(spec, &mut values);
            }
            plan.build(&series, &values)
                .map(|snapshot| evaluate(&criteria, &snapshot))
        })
    });
}

criterion_group!(benches, bench_calculators, bench_symbol);
criterion_main!(benches);
