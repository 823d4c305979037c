//! Streaming background generation with bounded memory.

use super::{lock, make_rng};
use crate::error::{Result, TrustError};
use crate::model::PredictionInput;
use crate::primitives::Vector;
use crate::stats::{MultivariateGaussian, OnlineEstimator, WelfordEstimator, WelfordState};
use crate::traits::BackgroundGenerator;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// What happens to the queue once it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementType {
    /// Overwrite a uniformly random slot.
    Random,
    /// Evict the oldest observation.
    Fifo,
}

/// Fill state of the observation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    /// Fewer than `queue_size` observations seen.
    PartiallyFilled,
    /// Queue at capacity; new observations replace old ones.
    Full,
}

/// Configuration for [`StreamingGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Observation dimensionality.
    pub dimensions: usize,
    /// Number of raw observations retained.
    pub queue_size: usize,
    /// Extra synthetic points produced by `generate_with_diversity`.
    pub diversity_size: usize,
    /// Policy applied when the queue is full.
    pub replacement: ReplacementType,
    /// Feature names; defaults to `inputs-0`, `inputs-1`, ...
    pub feature_names: Option<Vec<String>>,
    /// Seed for replacement and synthetic sampling.
    pub random_state: Option<u64>,
}

impl StreamingConfig {
    /// Creates a configuration with random replacement and no diversity padding.
    #[must_use]
    pub fn new(dimensions: usize, queue_size: usize) -> Self {
        Self {
            dimensions,
            queue_size,
            diversity_size: 0,
            replacement: ReplacementType::Random,
            feature_names: None,
            random_state: None,
        }
    }

    /// Sets the diversity padding size.
    #[must_use]
    pub fn with_diversity_size(mut self, diversity_size: usize) -> Self {
        self.diversity_size = diversity_size;
        self
    }

    /// Sets the replacement policy.
    #[must_use]
    pub fn with_replacement(mut self, replacement: ReplacementType) -> Self {
        self.replacement = replacement;
        self
    }

    /// Sets explicit feature names.
    #[must_use]
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or queue size, or a feature name
    /// list of the wrong length.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(TrustError::invalid_param("dimensions", self.dimensions, ">0"));
        }
        if self.queue_size == 0 {
            return Err(TrustError::invalid_param("queue_size", self.queue_size, ">0"));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.dimensions {
                return Err(TrustError::dimension_mismatch(
                    "feature names",
                    self.dimensions,
                    names.len(),
                ));
            }
        }
        Ok(())
    }
}

/// Queue, estimator and random source, guarded together.
#[derive(Debug)]
struct StreamState {
    queue: VecDeque<Vector<f64>>,
    estimator: WelfordEstimator,
    rng: StdRng,
    observed: usize,
}

/// Background generator fed by a stream of observations.
///
/// Keeps up to `queue_size` raw observations and a Welford estimate of the
/// whole stream. [`generate`](BackgroundGenerator::generate) replays the queue
/// in order and pads with draws from `N(mean, covariance)`.
///
/// `update` and `generate` may be called from different threads: the queue,
/// the estimator and the RNG sit behind one lock, so a `generate` never sees a
/// half-applied update.
///
/// # Examples
///
/// ```
/// use trustkit::background::{ReplacementType, StreamingConfig, StreamingGenerator};
/// use trustkit::primitives::Vector;
/// use trustkit::traits::BackgroundGenerator;
///
/// let config = StreamingConfig::new(2, 3)
///     .with_replacement(ReplacementType::Fifo)
///     .with_random_state(0);
/// let generator = StreamingGenerator::new(config).expect("valid config");
/// for i in 0..5 {
///     let x = f64::from(i);
///     generator.update(&Vector::from_slice(&[x, -x])).expect("2-d observation");
/// }
/// let background = generator.generate(4).expect("synthetic padding available");
/// assert_eq!(background.len(), 4);
/// ```
#[derive(Debug)]
pub struct StreamingGenerator {
    config: StreamingConfig,
    feature_names: Vec<String>,
    state: Mutex<StreamState>,
}

impl StreamingGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for non-positive dimensions or queue size.
    pub fn new(config: StreamingConfig) -> Result<Self> {
        config.validate()?;
        let estimator = WelfordEstimator::new(config.dimensions)?;
        Self::build(config, estimator)
    }

    /// Creates a generator whose estimator resumes from a saved state.
    ///
    /// The queue starts empty; only the distribution estimate carries over.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the state has a
    /// different dimensionality.
    pub fn with_estimator_state(config: StreamingConfig, state: WelfordState) -> Result<Self> {
        config.validate()?;
        let estimator = WelfordEstimator::from_state(state)?;
        if estimator.dimension() != config.dimensions {
            return Err(TrustError::dimension_mismatch(
                "dimensions",
                config.dimensions,
                estimator.dimension(),
            ));
        }
        Self::build(config, estimator)
    }

    fn build(config: StreamingConfig, estimator: WelfordEstimator) -> Result<Self> {
        let feature_names = config.feature_names.clone().unwrap_or_else(|| {
            (0..config.dimensions)
                .map(|i| format!("inputs-{i}"))
                .collect()
        });
        let state = StreamState {
            queue: VecDeque::with_capacity(config.queue_size),
            estimator,
            rng: make_rng(config.random_state),
            observed: 0,
        };
        Ok(Self {
            config,
            feature_names,
            state: Mutex::new(state),
        })
    }

    /// Consumes one observation.
    ///
    /// # Errors
    ///
    /// Returns an error if the observation has the wrong dimension or is not
    /// finite. A rejected observation leaves queue and estimator untouched.
    pub fn update(&self, observation: &Vector<f64>) -> Result<()> {
        if observation.len() != self.config.dimensions {
            return Err(TrustError::dimension_mismatch(
                "dimensions",
                self.config.dimensions,
                observation.len(),
            ));
        }

        let mut state = lock(&self.state, "StreamingGenerator")?;
        state.estimator.update(observation)?;

        let queue_size = self.config.queue_size;
        if state.queue.len() < queue_size {
            state.queue.push_back(observation.clone());
            if state.queue.len() == queue_size {
                info!(queue_size, "Streaming queue is full");
            }
        } else {
            match self.config.replacement {
                ReplacementType::Random => {
                    let slot = state.rng.gen_range(0..queue_size);
                    state.queue[slot] = observation.clone();
                }
                ReplacementType::Fifo => {
                    state.queue.pop_front();
                    state.queue.push_back(observation.clone());
                }
            }
        }
        state.observed += 1;
        Ok(())
    }

    /// Consumes one observation given as a `PredictionInput`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has non-numeric features or the wrong dimension.
    pub fn update_input(&self, input: &PredictionInput) -> Result<()> {
        self.update(&input.to_vector()?)
    }

    /// The full background: the raw queue followed by synthetic samples,
    /// `queue_size + diversity_size` points in total.
    ///
    /// # Errors
    ///
    /// Returns an error if the estimate cannot be sampled.
    pub fn generate_with_diversity(&self) -> Result<Vec<PredictionInput>> {
        self.generate_points(self.config.queue_size + self.config.diversity_size)
    }

    /// Total observations consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn observed(&self) -> Result<usize> {
        Ok(lock(&self.state, "StreamingGenerator")?.observed)
    }

    /// Current fill state.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn state(&self) -> Result<QueueState> {
        let state = lock(&self.state, "StreamingGenerator")?;
        Ok(if state.queue.len() < self.config.queue_size {
            QueueState::PartiallyFilled
        } else {
            QueueState::Full
        })
    }

    /// Snapshot of the running estimate, for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn estimator_state(&self) -> Result<WelfordState> {
        Ok(lock(&self.state, "StreamingGenerator")?.estimator.state())
    }

    /// Feature names attached to generated points.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn generate_points(&self, total: usize) -> Result<Vec<PredictionInput>> {
        let mut state = lock(&self.state, "StreamingGenerator")?;

        let n_raw = state.queue.len().min(total);
        let mut points = Vec::with_capacity(total);
        for row in state.queue.iter().take(n_raw) {
            points.push(PredictionInput::from_vector(&self.feature_names, row)?);
        }

        let n_synthetic = total - n_raw;
        if n_synthetic > 0 {
            let params = state.estimator.parameters();
            let sampler = MultivariateGaussian::new(&params)?;
            for sample in sampler.sample_n(n_synthetic, &mut state.rng) {
                points.push(PredictionInput::from_vector(&self.feature_names, &sample)?);
            }
        }

        debug!(
            raw = n_raw,
            synthetic = n_synthetic,
            observed = state.observed,
            "Streaming background generated"
        );
        Ok(points)
    }
}

impl BackgroundGenerator for StreamingGenerator {
    fn generate(&self, n: usize) -> Result<Vec<PredictionInput>> {
        self.generate_points(n)
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
