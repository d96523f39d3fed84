//! Engine behaviour against tables loaded from disk

use crate::common::write_fingerprints;
use rust_decimal_macros::dec;
use strike_engine::fingerprint::{CsvFingerprintStore, FingerprintError, MomentumBucket};
use strike_engine::probability::{ProbabilityEngine, StrikeSide};
use tempfile::TempDir;

fn load(buckets: &[i8]) -> (TempDir, ProbabilityEngine) {
    let dir = TempDir::new().unwrap();
    write_fingerprints(dir.path(), "btc", buckets);
    let store = CsvFingerprintStore::new(dir.path());
    let engine = ProbabilityEngine::load(&store, "btc").unwrap();
    (dir, engine)
}

#[test]
fn test_nearest_available_bucket_is_activated() {
    let (_dir, mut engine) = load(&[-2, 0, 3]);
    assert_eq!(
        engine.available_buckets(),
        vec![
            MomentumBucket::new(-2).unwrap(),
            MomentumBucket::ZERO,
            MomentumBucket::new(3).unwrap()
        ]
    );

    // 0.01% rounds to bucket 1; distances to -2, 0, 3 are 3, 1, 2
    let bucket = engine.select_bucket(0.01);
    assert_eq!(bucket, MomentumBucket::ZERO);
    assert_eq!(engine.fingerprint_id(), "btc_momentum_0");
}

#[test]
fn test_strike_at_price_is_below() {
    let (_dir, mut engine) = load(&[0]);
    let results = engine.calculate_strike_probabilities(
        dec!(50000),
        300.0,
        &[dec!(49500), dec!(50000), dec!(50500)],
        0.0,
    );

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].direction, StrikeSide::Below);
    assert_eq!(results[1].direction, StrikeSide::Below);
    assert_eq!(results[1].buffer, dec!(0));
    assert_eq!(results[2].direction, StrikeSide::Above);
    for r in &results {
        assert!((r.prob_beyond + r.prob_within - 100.0).abs() < 1e-6);
        assert!((0.0..=100.0).contains(&r.prob_beyond));
    }
}

#[test]
fn test_momentum_selects_different_tables() {
    let (_dir, mut engine) = load(&[-5, 0, 5]);
    let strikes = [dec!(50250)];

    let neutral = engine.calculate_strike_probabilities(dec!(50000), 900.0, &strikes, 0.0);
    let bullish = engine.calculate_strike_probabilities(dec!(50000), 900.0, &strikes, 0.05);
    assert_eq!(engine.last_bucket_used(), MomentumBucket::new(5));
    assert!(bullish[0].prob_beyond > neutral[0].prob_beyond);
}

#[test]
fn test_corrupt_table_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_fingerprints(dir.path(), "btc", &[0]);
    std::fs::write(dir.path().join("btc_momentum_4.csv"), "TTC,>= +0.10%\nbogus,1.0\n").unwrap();

    let store = CsvFingerprintStore::new(dir.path());
    let engine = ProbabilityEngine::load(&store, "btc").unwrap();
    assert_eq!(engine.available_buckets(), vec![MomentumBucket::ZERO]);
}

#[test]
fn test_no_tables_for_symbol() {
    let dir = TempDir::new().unwrap();
    write_fingerprints(dir.path(), "eth", &[0]);

    let store = CsvFingerprintStore::new(dir.path());
    let err = ProbabilityEngine::load(&store, "btc").unwrap_err();
    assert!(matches!(err, FingerprintError::NoFingerprintData { .. }));
}
