//! Background sample generation for attribution baselines.
//!
//! Every strategy implements [`BackgroundGenerator`]:
//!
//! - [`RandomGenerator`]: uniform sampling without replacement from seeds
//! - [`KMeansGenerator`]: k-means centroids of numeric seeds
//! - [`StreamingGenerator`]: bounded queue of recent observations padded with
//!   draws from an online Gaussian estimate
//! - [`CounterfactualGenerator`]: points whose model output is close to a goal,
//!   found through an external counterfactual search
//!
//! [`BackgroundGenerator`]: crate::traits::BackgroundGenerator

mod counterfactual;
mod kmeans;
mod random;
mod streaming;

pub use counterfactual::{CounterfactualConfig, CounterfactualGenerator, SeedStrategy};
pub use kmeans::KMeansGenerator;
pub use random::RandomGenerator;
pub use streaming::{QueueState, ReplacementType, StreamingConfig, StreamingGenerator};

use crate::error::{Result, TrustError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Mutex, MutexGuard};

/// Seeded RNG, or an entropy-seeded one when no seed is given.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Locks a mutex, reporting poisoning as an error.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| TrustError::Other(format!("{what} lock poisoned")))
}
