//! Benchmarks for probability interpolation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use strike_engine::fingerprint::{FingerprintTable, MomentumBucket};
use strike_engine::pipeline::build_strike_ladder;
use strike_engine::probability::ProbabilityEngine;

/// 60 one-minute TTC rows by 40 thresholds per direction
fn synthetic_table(bucket: MomentumBucket) -> FingerprintTable {
    let thresholds: Vec<f64> = (1..=40).map(|i| i as f64 * 0.05).collect();

    let mut csv = String::from("TTC");
    for t in &thresholds {
        csv.push_str(&format!(",>= +{:.2}%", t));
    }
    for t in &thresholds {
        csv.push_str(&format!(",<= -{:.2}%", t));
    }
    csv.push('\n');

    for minute in 1..=60 {
        csv.push_str(&format!("{}m TTC", minute));
        for _ in 0..2 {
            for t in &thresholds {
                let hit = 100.0 * (1.0 - (-(minute as f64).sqrt() / (t * 10.0)).exp());
                csv.push_str(&format!(",{:.2}", hit.clamp(0.0, 100.0)));
            }
        }
        csv.push('\n');
    }

    let id = format!("btc_momentum_{}", bucket);
    FingerprintTable::from_csv_str(&id, "btc", bucket, &csv).unwrap()
}

fn engine() -> ProbabilityEngine {
    let tables: BTreeMap<MomentumBucket, FingerprintTable> = (-30i8..=30)
        .step_by(5)
        .filter_map(MomentumBucket::new)
        .map(|b| (b, synthetic_table(b)))
        .collect();
    ProbabilityEngine::from_tables("btc", tables).unwrap()
}

fn benchmark_interpolate(c: &mut Criterion) {
    let mut engine = engine();

    c.bench_function("interpolate_single", |b| {
        b.iter(|| engine.interpolate(black_box(757.0), black_box(0.37)))
    });
}

fn benchmark_strike_ladder(c: &mut Criterion) {
    let mut engine = engine();
    let price = dec!(50123.45);
    let strikes: Vec<Decimal> = build_strike_ladder(price, dec!(250), 10);

    c.bench_function("strike_probabilities_21", |b| {
        b.iter(|| {
            engine.calculate_strike_probabilities(
                black_box(price),
                black_box(757.0),
                black_box(&strikes),
                black_box(0.08),
            )
        })
    });
}

criterion_group!(benches, benchmark_interpolate, benchmark_strike_ladder);
criterion_main!(benches);
