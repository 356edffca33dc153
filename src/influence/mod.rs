//! Influence maximization under the Independent Cascade model

pub mod baseline;
pub mod cascade;
pub mod celf;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use baseline::{compare_strategies, top_out_degree_seeds, top_pagerank_seeds, StrategyResult};
pub use cascade::{DiffusionSimulator, SimulationParams};
pub use celf::{celf, CelfResult};

/// Cooperative cancellation flag shared between a caller and running
/// simulations. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Monte Carlo estimate of the expected number of activated nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadEstimate {
    pub mean: f64,
    /// Sample standard deviation of the per-trial cascade sizes
    pub std_dev: f64,
    pub trials: usize,
    /// Half-width of the 95% normal confidence interval of the mean
    pub ci95_half_width: f64,
}

impl SpreadEstimate {
    /// Estimate for a seed set that activates nobody
    pub fn zero(trials: usize) -> Self {
        Self {
            trials,
            ..Default::default()
        }
    }

    pub fn ci95(&self) -> (f64, f64) {
        (self.mean - self.ci95_half_width, self.mean + self.ci95_half_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn confidence_interval_is_symmetric() {
        let estimate = SpreadEstimate {
            mean: 10.0,
            std_dev: 2.0,
            trials: 4,
            ci95_half_width: 1.5,
        };
        assert_eq!(estimate.ci95(), (8.5, 11.5));
    }
}
