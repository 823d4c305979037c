//! Goal-directed background generation through counterfactual search.

use super::{lock, make_rng};
use crate::error::{Result, TrustError};
use crate::model::{perturb_features, PerturbationContext, PredictionInput, PredictionOutput};
use crate::traits::{
    BackgroundGenerator, CounterfactualSearch, PredictionProvider, SearchRequest, SearchResult,
};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default extra wall-clock time granted to a search beyond its own timeout.
const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_secs(10);

/// How a multi-goal run reuses its own results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedStrategy {
    /// Every goal starts from the original seeds.
    Independent,
    /// Points found for earlier goals become seeds for later goals, so the
    /// result depends on goal order.
    Chained,
}

/// Configuration for [`CounterfactualGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualConfig {
    /// Seeds kept after ranking by output distance; `None` means `min(seeds, n)`.
    pub k_seeds: Option<usize>,
    /// Per-search timeout in seconds, passed to the search.
    pub timeout_seconds: u64,
    /// Wall-clock slack on top of `timeout_seconds` before an unanswered
    /// search counts as timed out.
    pub timeout_grace: Duration,
    /// Iteration budget passed to the search.
    pub step_count: usize,
    /// Acceptance tolerance passed to the search.
    pub goal_threshold: f64,
    /// Failed searches tolerated per `generate` call.
    pub max_attempt_count: usize,
    /// Noise applied to reused seeds and retries.
    pub perturbation: PerturbationContext,
    /// Seed for perturbations and search seeds.
    pub random_state: Option<u64>,
}

impl Default for CounterfactualConfig {
    fn default() -> Self {
        Self {
            k_seeds: None,
            timeout_seconds: 30,
            timeout_grace: DEFAULT_TIMEOUT_GRACE,
            step_count: 30_000,
            goal_threshold: 0.1,
            max_attempt_count: 5,
            perturbation: PerturbationContext::new(0.1, usize::MAX),
            random_state: None,
        }
    }
}

impl CounterfactualConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of seeds kept.
    #[must_use]
    pub fn with_k_seeds(mut self, k_seeds: usize) -> Self {
        self.k_seeds = Some(k_seeds);
        self
    }

    /// Sets the per-search timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the slack granted beyond the search's own timeout.
    #[must_use]
    pub fn with_timeout_grace(mut self, timeout_grace: Duration) -> Self {
        self.timeout_grace = timeout_grace;
        self
    }

    /// Sets the search iteration budget.
    #[must_use]
    pub fn with_step_count(mut self, step_count: usize) -> Self {
        self.step_count = step_count;
        self
    }

    /// Sets the goal threshold.
    #[must_use]
    pub fn with_goal_threshold(mut self, goal_threshold: f64) -> Self {
        self.goal_threshold = goal_threshold;
        self
    }

    /// Sets the failed-attempt budget.
    #[must_use]
    pub fn with_max_attempt_count(mut self, max_attempt_count: usize) -> Self {
        self.max_attempt_count = max_attempt_count;
        self
    }

    /// Sets the perturbation applied to reused seeds.
    #[must_use]
    pub fn with_perturbation(mut self, perturbation: PerturbationContext) -> Self {
        self.perturbation = perturbation;
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
    /// Returns `InvalidHyperparameter` for a zero timeout, step count or
    /// `k_seeds`, or a negative or non-finite threshold.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(TrustError::invalid_param("timeout_seconds", 0, ">0"));
        }
        if self.step_count == 0 {
            return Err(TrustError::invalid_param("step_count", 0, ">0"));
        }
        if !self.goal_threshold.is_finite() || self.goal_threshold < 0.0 {
            return Err(TrustError::invalid_param(
                "goal_threshold",
                self.goal_threshold,
                "finite and >= 0",
            ));
        }
        if self.k_seeds == Some(0) {
            return Err(TrustError::invalid_param("k_seeds", 0, ">0"));
        }
        self.perturbation.validate()
    }
}

/// Produces background points whose model output approximates a goal.
///
/// The seeds whose outputs lie closest to the goal are cycled round-robin and
/// handed to the counterfactual search. The first pass over the seeds uses
/// them as-is; reused seeds, and any seed tried right after a failure, are
/// perturbed first. Each failed, timed-out or erroring search counts against
/// `max_attempt_count`; exceeding it returns [`TrustError::Exhausted`].
///
/// Every search runs on its own thread. A search that outlives
/// `timeout_seconds + timeout_grace` is abandoned, not joined: its thread
/// keeps running until the search returns, and its result is discarded.
/// Searches should honour [`SearchRequest::timeout`] to bound that.
pub struct CounterfactualGenerator {
    config: CounterfactualConfig,
    model: Arc<dyn PredictionProvider>,
    search: Arc<dyn CounterfactualSearch>,
    seeds: Vec<PredictionInput>,
    goal: PredictionOutput,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for CounterfactualGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterfactualGenerator")
            .field("config", &self.config)
            .field("n_seeds", &self.seeds.len())
            .field("goal", &self.goal)
            .finish_non_exhaustive()
    }
}

impl CounterfactualGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or there are no seeds.
    pub fn new(
        seeds: Vec<PredictionInput>,
        goal: PredictionOutput,
        model: Arc<dyn PredictionProvider>,
        search: Arc<dyn CounterfactualSearch>,
        config: CounterfactualConfig,
    ) -> Result<Self> {
        config.validate()?;
        if seeds.is_empty() {
            return Err(TrustError::empty_input("counterfactual seeds"));
        }
        let rng = Mutex::new(make_rng(config.random_state));
        Ok(Self {
            config,
            model,
            search,
            seeds,
            goal,
            rng,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &CounterfactualConfig {
        &self.config
    }

    /// Generates `n` points for an explicit seed set and goal.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` when the failed-attempt budget runs out, or the
    /// model's error if ranking the seeds fails.
    pub fn generate_for(
        &self,
        seeds: &[PredictionInput],
        goal: &PredictionOutput,
        n: usize,
    ) -> Result<Vec<PredictionInput>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if seeds.is_empty() {
            return Err(TrustError::empty_input("counterfactual seeds"));
        }

        let k = self
            .config
            .k_seeds
            .unwrap_or_else(|| seeds.len().min(n))
            .min(seeds.len());
        let best = self.closest_seeds(seeds, goal, k)?;

        let mut found = Vec::with_capacity(n);
        let mut failures = 0usize;
        let mut failed_last = false;
        let mut cursor = 0usize;

        while found.len() < n {
            let base = &best[cursor % best.len()];
            let reused = cursor >= best.len();
            let (seed, search_seed) = {
                let mut rng = lock(&self.rng, "CounterfactualGenerator RNG")?;
                let seed = if reused || failed_last {
                    perturb_features(base, &self.config.perturbation, &mut *rng)
                } else {
                    base.clone()
                };
                (seed, rng.gen::<u64>())
            };
            cursor += 1;

            match self.attempt(seed, goal, search_seed) {
                Ok(point) => {
                    found.push(point);
                    failed_last = false;
                }
                Err(reason) => {
                    failures += 1;
                    failed_last = true;
                    warn!(
                        attempt = cursor,
                        failures,
                        found = found.len(),
                        %reason,
                        "Counterfactual search attempt failed"
                    );
                    if failures > self.config.max_attempt_count {
                        warn!(found = found.len(), requested = n, "Counterfactual budget exhausted");
                        return Err(TrustError::Exhausted {
                            found: found.len(),
                            requested: n,
                            attempts: failures,
                        });
                    }
                }
            }
        }

        info!(generated = n, failures, "Counterfactual background generated");
        Ok(found)
    }

    /// Generates `k_per_goal` points for each goal in order.
    ///
    /// With [`SeedStrategy::Chained`] the points found for one goal join the
    /// seed set for every later goal.
    ///
    /// # Errors
    ///
    /// Propagates the first goal's failure; nothing partial is returned.
    pub fn generate_range(
        &self,
        goals: &[PredictionOutput],
        k_per_goal: usize,
        strategy: SeedStrategy,
    ) -> Result<Vec<PredictionInput>> {
        let mut seeds = self.seeds.clone();
        let mut background = Vec::with_capacity(goals.len() * k_per_goal);

        for (i, goal) in goals.iter().enumerate() {
            let generated = self.generate_for(&seeds, goal, k_per_goal)?;
            debug!(goal = i, generated = generated.len(), ?strategy, "Goal completed");
            if strategy == SeedStrategy::Chained {
                seeds.extend(generated.iter().cloned());
            }
            background.extend(generated);
        }
        Ok(background)
    }

    /// Ranks seeds by the distance of their model output to the goal.
    fn closest_seeds(
        &self,
        seeds: &[PredictionInput],
        goal: &PredictionOutput,
        k: usize,
    ) -> Result<Vec<PredictionInput>> {
        let outputs = self.model.predict(seeds)?;
        if outputs.len() != seeds.len() {
            return Err(TrustError::Collaborator(format!(
                "model returned {} outputs for {} inputs",
                outputs.len(),
                seeds.len()
            )));
        }

        let goal_vec = goal.to_vector()?;
        let mut ranked = outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                let v = out.to_vector()?;
                if v.len() != goal_vec.len() {
                    return Err(TrustError::dimension_mismatch(
                        "outputs",
                        goal_vec.len(),
                        v.len(),
                    ));
                }
                Ok((i, v.distance(&goal_vec)))
            })
            .collect::<Result<Vec<(usize, f64)>>>()?;
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| seeds[i].clone())
            .collect())
    }

    /// One search bounded by `timeout + grace`. Any failure is returned as a
    /// reason string so the caller can count it and move on. A timed-out
    /// search thread is detached.
    fn attempt(
        &self,
        seed: PredictionInput,
        goal: &PredictionOutput,
        search_seed: u64,
    ) -> std::result::Result<PredictionInput, String> {
        let request = SearchRequest {
            seed,
            goal: goal.clone(),
            timeout: Duration::from_secs(self.config.timeout_seconds),
            step_count: self.config.step_count,
            goal_threshold: self.config.goal_threshold,
            search_seed,
        };
        let budget = Duration::from_secs(self.config.timeout_seconds) + self.config.timeout_grace;

        let (tx, rx) = mpsc::channel();
        let search = Arc::clone(&self.search);
        thread::Builder::new()
            .name("counterfactual-search".to_string())
            .spawn(move || {
                // The receiver may be gone after a timeout
                let _ = tx.send(search.search(&request));
            })
            .map_err(|e| format!("could not start search: {e}"))?;

        match rx.recv_timeout(budget) {
            Ok(Ok(SearchResult { point, valid: true })) => Ok(point),
            Ok(Ok(SearchResult { valid: false, .. })) => Err("no valid counterfactual".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TrustError::Timeout {
                seconds: budget.as_secs(),
            }
            .to_string()),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err("search thread panicked".to_string()),
        }
    }
}

impl BackgroundGenerator for CounterfactualGenerator {
    fn generate(&self, n: usize) -> Result<Vec<PredictionInput>> {
        self.generate_for(&self.seeds, &self.goal, n)
    }
}

#[cfg(test)]
#[path = "counterfactual_tests.rs"]
mod tests;
