//! Uniform random background sampling.

use super::{lock, make_rng};
use crate::error::{Result, TrustError};
use crate::model::PredictionInput;
use crate::traits::BackgroundGenerator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Mutex;

/// Draws background points uniformly, without replacement, from a seed set.
///
/// Asking for more points than there are seeds is an error.
#[derive(Debug)]
pub struct RandomGenerator {
    seeds: Vec<PredictionInput>,
    rng: Mutex<StdRng>,
}

impl RandomGenerator {
    /// Creates a generator with an entropy-seeded random source.
    #[must_use]
    pub fn new(seeds: Vec<PredictionInput>) -> Self {
        Self {
            seeds,
            rng: Mutex::new(make_rng(None)),
        }
    }

    /// Creates a generator with a fixed random seed.
    #[must_use]
    pub fn with_seed(seeds: Vec<PredictionInput>, seed: u64) -> Self {
        Self {
            seeds,
            rng: Mutex::new(make_rng(Some(seed))),
        }
    }

    /// Number of seeds available.
    #[must_use]
    pub fn n_seeds(&self) -> usize {
        self.seeds.len()
    }
}

impl BackgroundGenerator for RandomGenerator {
    fn generate(&self, n: usize) -> Result<Vec<PredictionInput>> {
        if n > self.seeds.len() {
            return Err(TrustError::invalid_param(
                "n",
                n,
                &format!("<= number of seeds ({})", self.seeds.len()),
            ));
        }

        let mut indices: Vec<usize> = (0..self.seeds.len()).collect();
        {
            let mut rng = lock(&self.rng, "RandomGenerator RNG")?;
            indices.shuffle(&mut *rng);
        }
        Ok(indices
            .into_iter()
            .take(n)
            .map(|i| self.seeds[i].clone())
            .collect())
    }
}
