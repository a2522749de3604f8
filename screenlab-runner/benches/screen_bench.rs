//! Criterion benchmarks for full screening requests.
//!
//! Benchmarks:
//! 1. 500-symbol universe, cold (no cache) across worker counts
//! 2. Same universe with a warm in-memory cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;

use screenlab_core::{Criteria, PriceBar, PriceSeries, Universe};
use screenlab_runner::{IndicatorCache, MemoryCache, Screener, ScreenerConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_universe(symbols: usize, bars: usize) -> Universe {
    let base = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..symbols)
        .map(|k| {
            let phase = k as f64 * 0.37;
            let bars = (0..bars)
                .map(|i| {
                    let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0 + i as f64 * 0.02;
                    PriceBar {
                        date: base + chrono::Duration::days(i as i64),
                        open: close - 0.3,
                        high: close + 1.5,
                        low: close - 1.5,
                        close,
                        adj_close: close,
                        volume: 1_000_000 + (i as u64 % 500_000),
                    }
                })
                .collect();
            PriceSeries::new(format!("S{k:04}"), bars).unwrap()
        })
        .collect()
}

fn criteria() -> Criteria {
    Criteria::from_value(json!({
        "indicators": {
            "rsi": {"below": 40},
            "macd": {"crossover": "bullish", "divergence": "bullish"},
            "ma": {"criteria": "price_above_ma200"}
        }
    }))
    .unwrap()
}

fn screener(workers: usize, cache: Option<Arc<dyn IndicatorCache>>) -> Screener {
    let mut config = ScreenerConfig::default();
    config.engine.workers = workers;
    Screener::new(&config, cache).unwrap()
}

// ── 1. Cold ──────────────────────────────────────────────────────────

fn bench_cold(c: &mut Criterion) {
    let universe = make_universe(500, 252);
    let criteria = criteria();
    let mut group = c.benchmark_group("screen_cold");
    for workers in [1usize, 4, 8] {
        let screener = screener(workers, None);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| screener.screen(black_box(&criteria), black_box(&universe)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Warm cache ────────────────────────────────────────────────────

fn bench_warm(c: &mut Criterion) {
    let universe = make_universe(500, 252);
    let criteria = criteria();
    let screener = screener(4, Some(Arc::new(MemoryCache::new())));
    screener.screen(&criteria, &universe).unwrap();

    c.bench_function("screen_warm_memory_cache", |b| {
        b.iter(|| screener.screen(black_box(&criteria), black_box(&universe)).unwrap())
    });
}

criterion_group!(benches, bench_cold, bench_warm);
criterion_main!(benches);
