//! Property-based tests using proptest.
//!
//! These tests verify invariants of the estimators, sketches and generators.

use proptest::prelude::*;
use trustkit::drift::GkSketch;
use trustkit::fairness::{statistical_parity_difference, GroupSelector};
use trustkit::prelude::*;
use trustkit::stats::{ks_two_sample_pvalue, normal_cdf, OnlineEstimator, WelfordEstimator};

// Strategy for generating fixed-width observation streams
fn observations(dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    proptest::collection::vec(proptest::collection::vec(-1e3f64..1e3, dim), 1..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn welford_covariance_is_symmetric_psd_diagonal(rows in observations(3)) {
        let mut estimator = WelfordEstimator::new(3).expect("positive dimension");
        for row in &rows {
            estimator.update(&Vector::from_slice(row)).expect("finite observation");
        }
        let params = estimator.parameters();
        prop_assert!(params.covariance.is_symmetric(1e-9));
        for i in 0..3 {
            prop_assert!(params.covariance.get(i, i) >= 0.0);
        }
        prop_assert_eq!(estimator.n_samples_seen(), rows.len());
    }

    #[test]
    fn welford_mean_matches_batch_mean(rows in observations(2)) {
        let mut estimator = WelfordEstimator::new(2).expect("positive dimension");
        for row in &rows {
            estimator.update(&Vector::from_slice(row)).expect("finite observation");
        }
        let mean = estimator.parameters().mean;
        for j in 0..2 {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let expected = trustkit::stats::mean(&column);
            prop_assert!((mean.as_slice()[j] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn gk_rank_error_is_bounded(values in proptest::collection::vec(-100.0f64..100.0, 1..500)) {
        let epsilon = 0.05;
        let sketch = GkSketch::from_values(epsilon, &values).expect("valid epsilon");
        let bound = 2.0 * epsilon * values.len() as f64 + 1.0;
        for &x in values.iter().step_by(7) {
            let exact = values.iter().filter(|&&v| v <= x).count() as f64;
            let approx = sketch.rank(x) as f64;
            prop_assert!((exact - approx).abs() <= bound, "x {} exact {} approx {}", x, exact, approx);
        }
    }

    #[test]
    fn ks_pvalue_is_a_probability(d in 0.0f64..1.0, n in 1usize..2000, m in 1usize..2000) {
        let p = ks_two_sample_pvalue(d, n, m);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn normal_cdf_is_monotone(a in -8.0f64..8.0, b in -8.0f64..8.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(normal_cdf(lo) <= normal_cdf(hi) + 1e-15);
    }

    #[test]
    fn random_background_draws_distinct_seeds(n_seeds in 1usize..200, frac in 0.0f64..=1.0, seed in any::<u64>()) {
        let seeds: Vec<PredictionInput> = (0..n_seeds)
            .map(|i| PredictionInput::new(vec![Feature::numerical("i", i as f64)]))
            .collect();
        let n = (frac * n_seeds as f64) as usize;
        let background = RandomGenerator::with_seed(seeds, seed).generate(n).expect("n <= seeds");
        prop_assert_eq!(background.len(), n);
        let mut ids: Vec<u64> = background
            .iter()
            .map(|p| p.features()[0].as_number().expect("numeric") as u64)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), n);
    }

    #[test]
    fn streaming_generate_returns_exactly_n(
        queue_size in 1usize..20,
        n_observed in 0usize..40,
        n in 0usize..50,
    ) {
        let config = StreamingConfig::new(2, queue_size).with_random_state(1);
        let generator = StreamingGenerator::new(config).expect("valid config");
        for i in 0..n_observed {
            let x = i as f64;
            generator.update(&Vector::from_slice(&[x, 1.0 - x])).expect("2-d observation");
        }
        prop_assert_eq!(generator.generate(n).expect("sampling works").len(), n);
    }

    #[test]
    fn parity_difference_is_bounded(outcomes in proptest::collection::vec(any::<bool>(), 4..40)) {
        let n = outcomes.len();
        let groups: Vec<Value> = (0..n).map(|i| Value::from(i % 2 == 0)).collect();
        let df = Dataframe::new(vec![
            Column::input("g", FeatureType::Boolean, groups),
            Column::output("y", FeatureType::Boolean, outcomes.iter().map(|&b| Value::from(b)).collect()),
        ])
        .expect("valid frame");
        let selector = GroupSelector::new(vec![0], vec![Value::from(true)]).expect("one column");
        let (privileged, unprivileged) = selector.split(&df).expect("input column");
        let spd = statistical_parity_difference(&privileged, &unprivileged, &[Value::from(true)])
            .expect("both groups non-empty");
        prop_assert!((-1.0..=1.0).contains(&spd));
    }
}
