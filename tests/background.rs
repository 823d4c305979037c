//! End-to-end checks of the background generators.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use trustkit::background::{ReplacementType, SeedStrategy};
use trustkit::model::FnProvider;
use trustkit::prelude::*;
use trustkit::stats::standard_normal;
use trustkit::traits::{SearchRequest, SearchResult};

fn numeric_input(values: &[f64]) -> PredictionInput {
    PredictionInput::new(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Feature::numerical(format!("f{i}"), v))
            .collect(),
    )
}

fn as_values(points: &[PredictionInput]) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|p| p.to_vector().expect("numeric point").into_vec())
        .collect()
}

#[test]
fn random_generator_is_uniform() {
    let seeds: Vec<PredictionInput> = (0..10_000)
        .map(|i| numeric_input(&[f64::from(i % 2)]))
        .collect();
    let generator = RandomGenerator::with_seed(seeds, 7);
    let background = generator.generate(1000).expect("1000 <= 10000 seeds");
    assert_eq!(background.len(), 1000);

    let ones: f64 = as_values(&background).iter().map(|v| v[0]).sum();
    assert!((400.0..=600.0).contains(&ones), "sum = {ones}");
}

#[test]
fn random_generator_is_reproducible() {
    let seeds: Vec<PredictionInput> = (0..50).map(|i| numeric_input(&[f64::from(i)])).collect();
    let a = RandomGenerator::with_seed(seeds.clone(), 3).generate(10).expect("10 <= 50");
    let b = RandomGenerator::with_seed(seeds.clone(), 3).generate(10).expect("10 <= 50");
    assert_eq!(a, b);
    assert!(RandomGenerator::with_seed(seeds, 3).generate(51).is_err());
}

#[test]
fn kmeans_recovers_separable_clusters() {
    let k: u32 = 5;
    let seeds: Vec<PredictionInput> = (0..k)
        .flat_map(|j| {
            let v = f64::from(j) * 10.0;
            (0..20).map(move |_| numeric_input(&[v, v]))
        })
        .collect();
    let generator = KMeansGenerator::new(&seeds)
        .expect("numeric seeds")
        .with_random_state(11);
    let centroids = as_values(&generator.generate(k as usize).expect("k distinct points"));
    assert_eq!(centroids.len(), k as usize);

    let mut firsts: Vec<f64> = centroids.iter().map(|c| c[0]).collect();
    firsts.sort_by(|a, b| a.partial_cmp(b).expect("finite centroids"));
    for (j, c) in firsts.iter().enumerate() {
        assert_eq!(*c, j as f64 * 10.0);
    }
}

#[test]
fn kmeans_centroids_near_noisy_centers() {
    let mut rng = StdRng::seed_from_u64(5);
    let centers = [0.0, 100.0, 200.0];
    let mut seeds = Vec::new();
    for &c in &centers {
        for _ in 0..200 {
            let x = c + 0.1 * standard_normal(&mut rng);
            let y = c + 0.1 * standard_normal(&mut rng);
            seeds.push(numeric_input(&[x, y]));
        }
    }
    let generator = KMeansGenerator::new(&seeds)
        .expect("numeric seeds")
        .with_random_state(1);
    let centroids = as_values(&generator.generate(3).expect("many distinct points"));

    for c in &centroids {
        let close: Vec<&f64> = centers
            .iter()
            .filter(|&&t| (c[0] - t).abs() < 0.05 && (c[1] - t).abs() < 0.05)
            .collect();
        assert_eq!(close.len(), 1, "centroid {c:?}");
    }
}

#[test]
fn streaming_generator_replays_then_evicts_fifo() {
    let config = StreamingConfig::new(2, 5)
        .with_replacement(ReplacementType::Fifo)
        .with_diversity_size(3)
        .with_random_state(8);
    let generator = StreamingGenerator::new(config).expect("valid config");

    for i in 0..3 {
        let x = f64::from(i);
        generator.update(&Vector::from_slice(&[x, x])).expect("2-d observation");
    }
    let partial = as_values(&generator.generate(3).expect("raw only"));
    assert_eq!(partial, vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]]);

    for i in 3..9 {
        let x = f64::from(i);
        generator.update(&Vector::from_slice(&[x, x])).expect("2-d observation");
    }
    let full = generator.generate(8).expect("padding available");
    assert_eq!(full.len(), 8);
    let raw: Vec<f64> = as_values(&full[..5]).iter().map(|v| v[0]).collect();
    assert_eq!(raw, vec![4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(generator.generate_with_diversity().expect("padding").len(), 8);
}

#[test]
fn streaming_raw_background_converges() {
    let (mu, sigma) = ([1.0, -2.0], [1.0, 2.0]);
    let config = StreamingConfig::new(2, 2000).with_random_state(3);
    let generator = StreamingGenerator::new(config).expect("valid config");
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20_000 {
        let obs = [
            mu[0] + sigma[0] * standard_normal(&mut rng),
            mu[1] + sigma[1] * standard_normal(&mut rng),
        ];
        generator.update(&Vector::from_slice(&obs)).expect("2-d observation");
    }

    let raw = as_values(&generator.generate(2000).expect("raw only"));
    for j in 0..2 {
        let column: Vec<f64> = raw.iter().map(|v| v[j]).collect();
        let mean = trustkit::stats::mean(&column);
        let var = trustkit::stats::sample_variance(&column);
        assert!((mean - mu[j]).abs() < 0.2, "column {j} mean {mean}");
        let expected = sigma[j] * sigma[j];
        assert!((var - expected).abs() / expected < 0.15, "column {j} variance {var}");
    }

    let state = generator.estimator_state().expect("lock");
    assert_eq!(state.count, 20_000);
}

/// Walks the seed toward the hyperplane `w . x = goal` of a linear model.
struct GradientSearch {
    weights: Vec<f64>,
}

impl CounterfactualSearch for GradientSearch {
    fn search(&self, request: &SearchRequest) -> trustkit::Result<SearchResult> {
        let goal = request.goal.to_vector()?.as_slice()[0];
        let mut x = request.seed.to_vector()?.into_vec();
        let norm2: f64 = self.weights.iter().map(|w| w * w).sum();

        let mut residual = f64::INFINITY;
        for _ in 0..request.step_count {
            let y: f64 = x.iter().zip(&self.weights).map(|(a, w)| a * w).sum();
            residual = y - goal;
            if residual.abs() <= request.goal_threshold {
                break;
            }
            for (xi, w) in x.iter_mut().zip(&self.weights) {
                *xi -= 0.5 * residual * w / norm2;
            }
        }
        let names = request.seed.feature_names();
        Ok(SearchResult {
            point: PredictionInput::from_vector(&names, &Vector::from_vec(x))?,
            valid: residual.abs() <= request.goal_threshold,
        })
    }
}

#[test]
fn counterfactual_background_meets_goal() {
    let weights = vec![2.0, -1.0, 0.5];
    let model_weights = weights.clone();
    let model: Arc<dyn PredictionProvider> = Arc::new(FnProvider::new(
        move |batch: &[PredictionInput]| {
            batch
                .iter()
                .map(|input| {
                    let x = input.to_vector()?;
                    let y: f64 = x.as_slice().iter().zip(&model_weights).map(|(a, w)| a * w).sum();
                    Ok(PredictionOutput::new(vec![Output::numerical("y", y)]))
                })
                .collect()
        },
    ));
    let search: Arc<dyn CounterfactualSearch> = Arc::new(GradientSearch { weights });

    let mut rng = StdRng::seed_from_u64(9);
    let seeds: Vec<PredictionInput> = (0..20)
        .map(|_| {
            numeric_input(&[
                5.0 * standard_normal(&mut rng),
                5.0 * standard_normal(&mut rng),
                5.0 * standard_normal(&mut rng),
            ])
        })
        .collect();
    let goal = PredictionOutput::new(vec![Output::numerical("y", 0.0)]);
    let config = CounterfactualConfig::new()
        .with_goal_threshold(0.01)
        .with_step_count(1000)
        .with_random_state(4);
    let generator =
        CounterfactualGenerator::new(seeds, goal, Arc::clone(&model), search, config)
            .expect("valid config");

    let background = generator.generate(30).expect("search always converges");
    assert_eq!(background.len(), 30);
    let outputs = model.predict(&background).expect("numeric points");
    for out in &outputs {
        let y = out.to_vector().expect("numeric output").as_slice()[0];
        assert!(y.abs() <= 0.01 + 1e-9, "output {y}");
    }

    let goals: Vec<PredictionOutput> = [-1.0, 1.0]
        .iter()
        .map(|&g| PredictionOutput::new(vec![Output::numerical("y", g)]))
        .collect();
    let ranged = generator
        .generate_range(&goals, 5, SeedStrategy::Chained)
        .expect("search always converges");
    assert_eq!(ranged.len(), 10);
    let outputs = model.predict(&ranged).expect("numeric points");
    for (i, out) in outputs.iter().enumerate() {
        let target = if i < 5 { -1.0 } else { 1.0 };
        let y = out.to_vector().expect("numeric output").as_slice()[0];
        assert!((y - target).abs() <= 0.01 + 1e-9, "point {i}: {y}");
    }
}
