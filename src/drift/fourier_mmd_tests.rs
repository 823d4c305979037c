pub(crate) use super::*;
use crate::data::Column;
use crate::model::{FeatureType, Value};

fn gaussian_frame(n: usize, mu: f64, seed: u64) -> Dataframe {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for _ in 0..n {
        a.push(mu + standard_normal(&mut rng));
        b.push(mu + standard_normal(&mut rng));
    }
    Dataframe::new(vec![Column::numeric("a", &a), Column::numeric("b", &b)]).expect("valid frame")
}

fn random_walk(n: usize, drift: f64, seed: u64) -> Dataframe {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = 0.0;
    let values: Vec<f64> = (0..n)
        .map(|_| {
            x += drift + standard_normal(&mut rng);
            x
        })
        .collect();
    Dataframe::new(vec![Column::numeric("x", &values)]).expect("valid frame")
}

fn small_config() -> FourierMmdConfig {
    FourierMmdConfig::new()
        .with_n_test(25)
        .with_n_window(40)
        .with_n_mode(64)
}

#[test]
fn test_default_config() {
    let config = FourierMmdConfig::default();
    assert!(!config.delta_stat);
    assert_eq!(config.n_test, 100);
    assert_eq!(config.n_window, 168);
    assert_eq!(config.sig, 10.0);
    assert_eq!(config.random_seed, 22);
    assert_eq!(config.n_mode, 512);
    assert_eq!(config.epsilon, 1e-7);
    assert_eq!(config.threshold, 0.8);
    assert_eq!(config.gamma, 2.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_config() {
    for config in [
        small_config().with_n_test(0),
        small_config().with_n_window(0),
        small_config().with_n_mode(0),
        small_config().with_sig(0.0),
        small_config().with_epsilon(-1.0),
        small_config().with_threshold(1.5),
        small_config().with_gamma(f64::INFINITY),
    ] {
        assert!(matches!(
            config.validate(),
            Err(TrustError::InvalidHyperparameter { .. })
        ));
    }
}

#[test]
fn test_window_must_fit_in_data() {
    let train = gaussian_frame(30, 0.0, 1);
    let result = FourierMmd::precompute(&train, &small_config());
    assert!(matches!(result, Err(TrustError::InvalidHyperparameter { .. })));
}

#[test]
fn test_precompute_is_deterministic() {
    let train = gaussian_frame(1000, 0.0, 1);
    let a = FourierMmd::precompute(&train, &small_config()).expect("enough rows");
    let b = FourierMmd::precompute(&train, &small_config()).expect("enough rows");
    assert_eq!(a, b);
    assert_eq!(a.columns, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(a.a_ref.len(), 64);
    assert!(a.std_mmd > 0.0);

    let other_seed =
        FourierMmd::precompute(&train, &small_config().with_random_seed(23)).expect("enough rows");
    assert_ne!(a.a_ref, other_seed.a_ref);
}

#[test]
fn test_calculate_is_deterministic() {
    let train = gaussian_frame(1000, 0.0, 1);
    let test = gaussian_frame(300, 0.2, 2);
    let first = FourierMmd::fit(&train, small_config())
        .expect("enough rows")
        .calculate(&test)
        .expect("same columns");
    let second = FourierMmd::fit(&train, small_config())
        .expect("enough rows")
        .calculate(&test)
        .expect("same columns");
    assert_eq!(first, second);
}

#[test]
fn test_no_drift_on_same_distribution() {
    let detector = FourierMmd::fit(&gaussian_frame(1000, 0.0, 1), small_config()).expect("enough rows");
    for seed in 100..105 {
        let result = detector
            .calculate(&gaussian_frame(500, 0.0, seed))
            .expect("same columns");
        assert!(!result.drift, "seed {seed}: {result:?}");
    }
}

#[test]
fn test_self_score_is_minimal() {
    let train = gaussian_frame(1000, 0.0, 1);
    let detector = FourierMmd::fit(&train, small_config()).expect("enough rows");
    let result = detector.calculate(&train).expect("same columns");
    assert_eq!(result.drift_score, 0.0);
    // 1 - Phi(gamma) with gamma = 2
    assert!((result.p_value - 0.022_750_131_948_179).abs() < 1e-6);
    assert!(!result.drift);
}

#[test]
fn test_drift_on_shifted_distribution() {
    let detector = FourierMmd::fit(&gaussian_frame(1000, 0.0, 1), small_config()).expect("enough rows");
    let result = detector
        .calculate(&gaussian_frame(500, 3.0, 7))
        .expect("same columns");
    assert!(result.drift);
    assert!(result.drift_score > 10.0);
    assert!(result.p_value > 0.99);
}

#[test]
fn test_delta_stat_detects_trend() {
    let config = small_config().with_n_mode(32).with_delta_stat(true);
    let detector = FourierMmd::fit(&random_walk(1000, 0.0, 3), config).expect("enough rows");
    assert!(detector.fitting().delta_stat);
    assert!(!detector.calculate(&random_walk(300, 0.0, 4)).expect("same columns").drift);
    assert!(detector.calculate(&random_walk(300, 5.0, 5)).expect("same columns").drift);
}

#[test]
fn test_threshold_and_gamma_override() {
    let detector = FourierMmd::fit(&gaussian_frame(1000, 0.0, 1), small_config()).expect("enough rows");
    let test = gaussian_frame(500, 0.0, 100);
    // With gamma far below zero even a null batch is past the boundary
    let result = detector.calculate_with(&test, 0.5, -5.0).expect("valid overrides");
    assert!(result.drift);
    assert!(detector.calculate_with(&test, 2.0, 2.0).is_err());
}

#[test]
fn test_column_mismatch() {
    let detector = FourierMmd::fit(&gaussian_frame(1000, 0.0, 1), small_config()).expect("enough rows");
    let renamed = Dataframe::new(vec![
        Column::numeric("a", &[1.0, 2.0, 3.0]),
        Column::numeric("c", &[1.0, 2.0, 3.0]),
    ])
    .expect("valid frame");
    assert!(matches!(
        detector.calculate(&renamed),
        Err(TrustError::ColumnMismatch(_))
    ));

    // Non-numeric columns are ignored on both sides
    let mut with_text = gaussian_frame(100, 0.0, 2);
    with_text
        .add_column(Column::input(
            "note",
            FeatureType::Text,
            vec![Value::from("x"); 100],
        ))
        .expect("new column");
    assert!(detector.calculate(&with_text).is_ok());
}

#[test]
fn test_constant_reference_is_degenerate() {
    let train = Dataframe::new(vec![Column::numeric("x", &[4.0; 500])]).expect("valid frame");
    assert!(matches!(
        FourierMmd::precompute(&train, &small_config()),
        Err(TrustError::NumericalDegeneracy(_))
    ));
}

#[test]
fn test_degenerate_fitting_rejected_at_calculate() {
    let mut fitting = FourierMmd::precompute(&gaussian_frame(1000, 0.0, 1), &small_config())
        .expect("enough rows");
    fitting.std_mmd = 0.0;
    let detector = FourierMmd::from_fitting(fitting);
    assert!(matches!(
        detector.calculate(&gaussian_frame(100, 0.0, 2)),
        Err(TrustError::NumericalDegeneracy(_))
    ));
}

/// `gaussian_frame` with column `a` at `row` replaced by `value`.
fn poisoned_frame(n: usize, seed: u64, row: usize, value: f64) -> Dataframe {
    let clean = gaussian_frame(n, 0.0, seed);
    let mut a = clean.column_as_f64(0).expect("numeric column");
    let b = clean.column_as_f64(1).expect("numeric column");
    a[row] = value;
    Dataframe::new(vec![Column::numeric("a", &a), Column::numeric("b", &b)]).expect("valid frame")
}

#[test]
fn test_non_finite_test_batch_rejected() {
    let detector = FourierMmd::fit(&gaussian_frame(1000, 0.0, 1), small_config())
        .expect("enough rows");
    // A NaN must not fall through to a clamped score of zero
    assert!(matches!(
        detector.calculate(&poisoned_frame(100, 2, 5, f64::NAN)),
        Err(TrustError::NumericalDegeneracy(_))
    ));
    assert!(matches!(
        detector.calculate(&poisoned_frame(100, 2, 0, f64::INFINITY)),
        Err(TrustError::NumericalDegeneracy(_))
    ));
    assert!(detector.calculate(&gaussian_frame(100, 0.0, 2)).is_ok());
}

#[test]
fn test_non_finite_training_rejected() {
    assert!(matches!(
        FourierMmd::precompute(&poisoned_frame(1000, 1, 400, f64::NAN), &small_config()),
        Err(TrustError::NumericalDegeneracy(_))
    ));
    assert!(matches!(
        FourierMmd::precompute(&poisoned_frame(1000, 1, 3, f64::NEG_INFINITY), &small_config()),
        Err(TrustError::NumericalDegeneracy(_))
    ));
}

#[test]
fn test_fitting_serde_round_trip() {
    let train = gaussian_frame(1000, 0.0, 1);
    let fitting = FourierMmd::precompute(&train, &small_config()).expect("enough rows");
    let json = serde_json::to_string(&fitting).expect("serializes");
    let restored: FourierMmdFitting = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(restored, fitting);

    let test = gaussian_frame(300, 1.0, 9);
    let direct = FourierMmd::from_fitting(fitting).calculate(&test).expect("same columns");
    let reloaded = FourierMmd::from_fitting(restored).calculate(&test).expect("same columns");
    assert_eq!(direct, reloaded);
}
